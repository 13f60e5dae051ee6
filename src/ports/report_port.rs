//! Report generation port trait.

use crate::domain::benchmark::BenchmarkResult;
use crate::domain::error::SimError;
use crate::domain::simulation::SimulationResult;
use crate::domain::strategy::Strategy;
use std::io::Write;

/// Everything a report about one simulation run can show.
pub struct RunReport<'a> {
    pub strategy: &'a Strategy,
    pub result: &'a SimulationResult,
    /// Benchmarks computed over the same aligned frame.
    pub benchmarks: &'a [BenchmarkResult],
}

/// Port for writing simulation reports.
pub trait ReportPort {
    fn write(&self, report: &RunReport<'_>, out: &mut dyn Write) -> Result<(), SimError>;
}
