//! Parameter sweep: independent simulation runs executed in parallel.
//!
//! Each run owns its own frame and state; parallelism is across runs only.

use crate::domain::dataset::RoleSeries;
use crate::domain::error::SimError;
use crate::domain::frame::align;
use crate::domain::simulation::{simulate, Summary};
use crate::domain::strategy::Strategy;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub ma_window: usize,
    pub risk_leverage: f64,
    pub tax_rate: f64,
}

#[derive(Debug)]
pub struct SweepOutcome {
    pub point: SweepPoint,
    pub result: Result<Summary, SimError>,
}

/// Cartesian product of the parameter lists, windows outermost.
pub fn grid(ma_windows: &[usize], leverages: &[f64], tax_rates: &[f64]) -> Vec<SweepPoint> {
    let mut points = Vec::with_capacity(ma_windows.len() * leverages.len() * tax_rates.len());
    for &ma_window in ma_windows {
        for &risk_leverage in leverages {
            for &tax_rate in tax_rates {
                points.push(SweepPoint {
                    ma_window,
                    risk_leverage,
                    tax_rate,
                });
            }
        }
    }
    points
}

/// Run `strategy` once per point. Outcomes keep the order of `points`.
pub fn run_sweep(data: &RoleSeries, strategy: &Strategy, points: &[SweepPoint]) -> Vec<SweepOutcome> {
    let inputs = data.inputs();
    let total = points.len();
    let done = AtomicUsize::new(0);

    points
        .par_iter()
        .map(|point| {
            let frame = align(&inputs, point.ma_window);
            let run = strategy
                .with_risk_leverage(point.risk_leverage)
                .with_tax_rate(point.tax_rate);
            let result = simulate(&frame, &run).map(|r| r.summary);

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % (total / 10).max(1) == 0 || finished == total {
                info!("Sweep progress: {}/{} runs", finished, total);
            }

            SweepOutcome {
                point: *point,
                result,
            }
        })
        .collect()
}
