//! Plain-text console report.
//!
//! Renders the run summary, a calendar-year return table and any benchmarks.
//! Overlap and sweep results have their own renderers.

use crate::domain::benchmark::BenchmarkResult;
use crate::domain::error::SimError;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::overlap::OverlapReport;
use crate::domain::simulation::DailyRecord;
use crate::domain::sweep::SweepOutcome;
use crate::ports::report_port::{ReportPort, RunReport};
use chrono::Datelike;
use std::collections::BTreeMap;
use std::io::Write;

pub struct TextReport;

pub struct YearlyReturn {
    pub year: i32,
    pub return_pct: f64,
}

/// Calendar-year returns. Each year is measured from the last value of the
/// previous year (the first year from the first value).
pub fn yearly_returns(records: &[DailyRecord]) -> Vec<YearlyReturn> {
    let mut year_end: BTreeMap<i32, f64> = BTreeMap::new();
    for r in records {
        year_end.insert(r.date.year(), r.value);
    }

    let mut prev = match records.first() {
        Some(r) => r.value,
        None => return Vec::new(),
    };
    let mut out = Vec::with_capacity(year_end.len());
    for (year, end) in year_end {
        let return_pct = if prev > 0.0 { (end / prev - 1.0) * 100.0 } else { 0.0 };
        out.push(YearlyReturn { year, return_pct });
        prev = end;
    }
    out
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn metrics_lines(out: &mut String, m: &PerformanceMetrics) {
    out.push_str(&format!("Final Value:      {:.2}\n", m.final_value));
    out.push_str(&format!("Total Return:     {}\n", pct(m.total_return)));
    out.push_str(&format!("Annualized:       {}\n", pct(m.annualized_return)));
    match m.annualized_volatility {
        Some(v) => {
            out.push_str(&format!("Volatility:       {}\n", pct(v)));
        }
        None => {
            out.push_str("Volatility:       n/a\n");
        }
    }
    out.push_str(&format!("Max Drawdown:     {}\n", pct(m.max_drawdown)));
    out.push_str(&format!("Years:            {:.2} ({})\n", m.years, m.convention));
}

pub fn render_summary(report: &RunReport<'_>) -> String {
    let strategy = report.strategy;
    let summary = &report.result.summary;
    let mut out = String::new();

    out.push_str(&format!("=== {} ===\n", strategy.name));
    out.push_str(&format!(
        "Period:           {} to {} ({} trading days)\n",
        summary.start_date, summary.end_date, summary.trading_days
    ));
    out.push_str(&format!("Switch Rule:      {}\n", strategy.switch_rule));
    out.push_str(&format!("Direction:        {}\n", strategy.returns.direction));
    out.push_str(&format!("Tax Rate:         {}\n", pct(strategy.tax_rate)));
    out.push('\n');
    metrics_lines(&mut out, &summary.metrics);

    out.push_str("\n=== Regime Distribution ===\n");
    for share in &summary.regime_distribution {
        out.push_str(&format!(
            "  {:<22} {:>6} days  {:>6.1}%\n",
            share.regime.label(), share.days, share.percent
        ));
    }
    out.push_str(&format!(
        "Signal above MA:  {:.1}%  (below {:.1}%)\n",
        summary.signal_above_percent, 100.0 - summary.signal_above_percent
    ));
    if let Some(tilt) = summary.tilt_percent {
        out.push_str(&format!(
            "Tilt held:        {:.1}%  (without {:.1}%)\n",
            tilt, 100.0 - tilt
        ));
    }
    out.push_str(&format!(
        "Switches:         {} ({} taxed, {:.2} tax paid)\n",
        summary.switches, summary.taxed_switches, summary.tax_paid
    ));

    let years = yearly_returns(&report.result.records);
    if !years.is_empty() {
        out.push_str("\n=== Yearly Returns ===\n");
        for y in &years {
            out.push_str(&format!("  {}  {:>8.2}%\n", y.year, y.return_pct));
        }
    }

    if !report.benchmarks.is_empty() {
        out.push('\n');
        out.push_str(&render_benchmarks(report.benchmarks));
    }
    out
}

pub fn render_benchmarks(results: &[BenchmarkResult]) -> String {
    let mut out = String::new();
    let width = results.iter().map(|r| r.label.len()).max().unwrap_or(0).max(9);
    out.push_str("=== Benchmarks ===\n");
    out.push_str(&format!(
        "  {:<width$}  {:>12}  {:>10}  {:>10}  {:>10}\n",
        "Benchmark", "Final", "Annual", "Vol", "Max DD"
    ));
    for r in results {
        let vol = r
            .metrics
            .annualized_volatility
            .map(pct)
            .unwrap_or_else(|| "n/a".to_string());
        out.push_str(&format!(
            "  {:<width$}  {:>12.2}  {:>10}  {:>10}  {:>10}\n",
            r.label,
            r.metrics.final_value,
            pct(r.metrics.annualized_return),
            vol,
            pct(r.metrics.max_drawdown)
        ));
    }
    out
}

pub fn render_overlap(report: &OverlapReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== MA Regime Overlap ({}-day MA) ===\n", report.ma_window));

    let width = report.symbols.iter().map(|s| s.len()).max().unwrap_or(0).max(8);
    out.push_str(&format!("  {:<width$}", ""));
    for s in &report.symbols {
        out.push_str(&format!("  {:>width$}", s));
    }
    out.push('\n');
    for (i, row) in report.matrix.iter().enumerate() {
        out.push_str(&format!("  {:<width$}", report.symbols[i]));
        for cell in row {
            match cell {
                Some(v) => {
                    out.push_str(&format!("  {:>width$}", format!("{:.1}%", v * 100.0)));
                }
                None => {
                    out.push_str(&format!("  {:>width$}", "-"));
                }
            }
        }
        out.push('\n');
    }

    out.push_str("\n=== Per-Asset Regimes ===\n");
    for (symbol, info) in report.symbols.iter().zip(&report.assets) {
        match info {
            Some(a) => {
                out.push_str(&format!(
                    "  {:<width$}  {} to {}  {:>6} days  above {:>5.1}%  below {:>5.1}%\n",
                    a.symbol, a.start_date, a.end_date, a.days, a.above_percent, a.below_percent
                ));
            }
            None => {
                out.push_str(&format!("  {:<width$}  not enough history\n", symbol));
            }
        }
    }

    let Some(common) = &report.common else {
        out.push_str("\nNo common period with a defined MA for every asset.\n");
        return out;
    };
    out.push_str(&format!(
        "\n=== Common Period: {} to {} ({} days) ===\n",
        common.start_date, common.end_date, common.days
    ));
    out.push_str(&format!("  All same regime:     {:>6.1}%\n", common.all_same_percent));
    out.push_str(&format!("  All below MA:        {:>6.1}%\n", common.all_below_percent));
    for (k, symbol) in report.symbols.iter().enumerate() {
        out.push_str(&format!(
            "  {:<width$}  differs from the rest {:>5.1}%, only one above {:>5.1}%\n",
            symbol, common.odd_one_out_percent[k], common.only_above_percent[k]
        ));
    }

    if let Some(cond) = &common.conditional {
        out.push_str(&format!(
            "\n=== Given {} below MA ({} days, {:.1}% of period) ===\n",
            cond.reference, cond.days_below, cond.share_of_days_percent
        ));
        for (symbol, p) in &cond.also_below_percent {
            out.push_str(&format!("  {:<width$}  also below {:>5.1}%\n", symbol, p));
        }
        out.push_str(&format!("  All below:           {:>6.1}%\n", cond.all_below_percent));
    }
    out
}

pub fn render_sweep(outcomes: &[SweepOutcome]) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Parameter Sweep ({} runs) ===\n", outcomes.len()));
    out.push_str(&format!(
        "  {:>6}  {:>8}  {:>6}  {:>12}  {:>10}  {:>10}  {:>8}\n",
        "MA", "Leverage", "Tax", "Final", "Annual", "Max DD", "Switches"
    ));
    for o in outcomes {
        let p = &o.point;
        match &o.result {
            Ok(s) => {
                out.push_str(&format!(
                    "  {:>6}  {:>8.2}  {:>6}  {:>12.2}  {:>10}  {:>10}  {:>8}\n",
                    p.ma_window,
                    p.risk_leverage,
                    pct(p.tax_rate),
                    s.metrics.final_value,
                    pct(s.metrics.annualized_return),
                    pct(s.metrics.max_drawdown),
                    s.switches
                ));
            }
            Err(e) => {
                out.push_str(&format!(
                    "  {:>6}  {:>8.2}  {:>6}  error: {}\n",
                    p.ma_window, p.risk_leverage, pct(p.tax_rate), e
                ));
            }
        }
    }
    out
}

impl ReportPort for TextReport {
    fn write(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<(), SimError> {
        out.write_all(render_summary(report).as_bytes())?;
        Ok(())
    }
}
