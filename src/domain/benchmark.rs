//! Buy-and-hold benchmarks: constant allocations compounded daily.

use crate::domain::allocation::{Allocation, Direction, ReturnContext, Sleeve};
use crate::domain::error::SimError;
use crate::domain::frame::{AlignedFrame, AssetRole};
use crate::domain::metrics::{PerformanceMetrics, YearConvention};

#[derive(Debug, Clone, PartialEq)]
pub struct Benchmark {
    pub label: String,
    pub allocation: Allocation,
    pub direction: Direction,
}

impl Benchmark {
    pub fn hold(label: impl Into<String>, role: AssetRole, leverage: f64) -> Self {
        Benchmark {
            label: label.into(),
            allocation: Allocation::single(Sleeve::asset(role, 1.0, leverage)),
            direction: Direction::Long,
        }
    }

    /// 50/50 blend of risk and hedge, both at `leverage`.
    pub fn blend(label: impl Into<String>, leverage: f64) -> Self {
        Benchmark {
            label: label.into(),
            allocation: Allocation {
                sleeves: vec![
                    Sleeve::asset(AssetRole::Risk, 0.5, leverage),
                    Sleeve::asset(AssetRole::Hedge, 0.5, leverage),
                ],
            },
            direction: Direction::Long,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub label: String,
    pub values: Vec<f64>,
    pub metrics: PerformanceMetrics,
}

/// Compound `benchmark` over `frame` from `baseline`. Row 0 is the baseline.
pub fn run_benchmark(
    frame: &AlignedFrame,
    benchmark: &Benchmark,
    cash_return: f64,
    baseline: f64,
    convention: YearConvention,
) -> Result<BenchmarkResult, SimError> {
    for role in benchmark.allocation.roles() {
        if !frame.has(role) {
            return Err(SimError::Data {
                reason: format!("benchmark '{}' needs a {role} column", benchmark.label),
            });
        }
    }
    if frame.len() < 2 {
        return Err(SimError::InsufficientData {
            rows: frame.len(),
            minimum: 2,
        });
    }

    let ctx = ReturnContext {
        direction: benchmark.direction,
        cash_return,
    };
    let mut values = Vec::with_capacity(frame.len());
    values.push(baseline);
    for i in 1..frame.len() {
        let prev = values[i - 1];
        values.push(prev * (1.0 + benchmark.allocation.daily_return(frame, i, &ctx)));
    }

    let metrics = PerformanceMetrics::compute(&frame.dates, &values, convention)?;
    Ok(BenchmarkResult {
        label: benchmark.label.clone(),
        values,
        metrics,
    })
}

/// Each asset at each leverage, plus a 50/50 risk/hedge blend when a hedge is
/// present.
pub fn leverage_ladder(frame: &AlignedFrame, leverages: &[f64]) -> Vec<Benchmark> {
    let mut out = Vec::new();
    for role in [AssetRole::Risk, AssetRole::Hedge] {
        let Some(col) = frame.column(role) else {
            continue;
        };
        for &lev in leverages {
            out.push(Benchmark::hold(ladder_label(&col.symbol, lev), role, lev));
        }
    }
    if let (Some(risk), Some(hedge)) = (frame.column(AssetRole::Risk), frame.column(AssetRole::Hedge)) {
        let name = format!("{}/{} 50/50", risk.symbol, hedge.symbol);
        for &lev in leverages {
            out.push(Benchmark::blend(ladder_label(&name, lev), lev));
        }
    }
    out
}

fn ladder_label(name: &str, leverage: f64) -> String {
    if leverage == 1.0 {
        name.to_string()
    } else {
        format!("{name} {leverage}x")
    }
}

/// Plain buy-and-hold of the risk asset and its leveraged, directed variant.
pub fn strategy_benchmarks(frame: &AlignedFrame, leverage: f64, direction: Direction) -> Vec<Benchmark> {
    let symbol = frame
        .column(AssetRole::Risk)
        .map(|c| c.symbol.clone())
        .unwrap_or_else(|| "risk".to_string());
    let leveraged = Benchmark {
        label: format!("{symbol} buy & hold {direction} {leverage}x"),
        allocation: Allocation::single(Sleeve::asset(AssetRole::Risk, 1.0, leverage)),
        direction,
    };
    vec![
        Benchmark::hold(format!("{symbol} buy & hold"), AssetRole::Risk, 1.0),
        leveraged,
    ]
}
