//! Daily CSV report: one row per aligned date, benchmarks as extra columns.

use crate::domain::error::SimError;
use crate::ports::report_port::{ReportPort, RunReport};
use std::io::Write;

pub struct CsvReport;

fn csv_err(e: csv::Error) -> SimError {
    SimError::Io(e.into())
}

impl ReportPort for CsvReport {
    fn write(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<(), SimError> {
        let records = &report.result.records;
        for b in report.benchmarks {
            if b.values.len() != records.len() {
                return Err(SimError::Data {
                    reason: format!(
                        "benchmark '{}' has {} values for {} days",
                        b.label,
                        b.values.len(),
                        records.len()
                    ),
                });
            }
        }

        let mut wtr = csv::Writer::from_writer(out);

        let mut header = vec![
            "date".to_string(),
            "value".to_string(),
            "return".to_string(),
            "regime".to_string(),
            "signal_above".to_string(),
            "tilt".to_string(),
            "tax".to_string(),
        ];
        header.extend(report.benchmarks.iter().map(|b| b.label.clone()));
        wtr.write_record(&header).map_err(csv_err)?;

        for (i, r) in records.iter().enumerate() {
            let mut row = vec![
                r.date.format("%Y-%m-%d").to_string(),
                format!("{:.6}", r.value),
                format!("{:.8}", r.portfolio_return),
                r.regime.label().to_string(),
                r.signal_above.to_string(),
                match r.tilt_active {
                    Some(true) => "yes".to_string(),
                    Some(false) => "no".to_string(),
                    None => String::new(),
                },
                format!("{:.6}", r.tax),
            ];
            row.extend(report.benchmarks.iter().map(|b| format!("{:.6}", b.values[i])));
            wtr.write_record(&row).map_err(csv_err)?;
        }

        wtr.flush()?;
        Ok(())
    }
}
