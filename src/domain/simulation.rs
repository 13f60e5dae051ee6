//! Regime-switching simulation loop.
//!
//! One sequential pass over an [`AlignedFrame`]. On day `i` the next regime is
//! decided from the flags at the close of `i` (and `i-1`), but day `i`'s return
//! is earned under the regime decided at the close of `i-1`. The next regime is
//! adopted only after the day is booked.

use crate::domain::error::SimError;
use crate::domain::frame::{AlignedFrame, AssetRole};
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::regime::{Classifier, Regime, SignalFlags};
use crate::domain::strategy::Strategy;
use chrono::NaiveDate;

/// Accumulator owned by one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub value: f64,
    /// Regime that will earn the next day's return.
    pub current_regime: Regime,
    /// Regime that earned the last booked return.
    pub applied_regime: Regime,
    /// Value recorded at the last switch (tax cost basis).
    pub cost_basis: f64,
    pub last_switch_index: Option<usize>,
    pub switches: usize,
    pub taxed_switches: usize,
    pub tax_paid: f64,
}

impl PortfolioState {
    pub fn new(baseline: f64) -> Self {
        PortfolioState {
            value: baseline,
            current_regime: Regime::Initial,
            applied_regime: Regime::Initial,
            cost_basis: baseline,
            last_switch_index: None,
            switches: 0,
            taxed_switches: 0,
            tax_paid: 0.0,
        }
    }

    /// Book day `index`'s return under `current_regime` and settle tax if the
    /// regime differs from the one that earned yesterday. Returns the tax paid.
    ///
    /// Leaving `Initial` opens the position: no tax and the basis stays put.
    pub fn book_day(&mut self, index: usize, portfolio_return: f64, tax_rate: f64) -> f64 {
        let regime = self.current_regime;
        let mut value = self.value * (1.0 + portfolio_return);
        let mut tax = 0.0;

        if regime != self.applied_regime && self.applied_regime != Regime::Initial {
            let gain = value - self.cost_basis;
            if gain > 0.0 {
                tax = gain * tax_rate;
                value -= tax;
                self.taxed_switches += 1;
                self.tax_paid += tax;
            }
            self.cost_basis = value;
            self.last_switch_index = Some(index);
            self.switches += 1;
        }

        self.applied_regime = regime;
        self.value = value;
        tax
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub value: f64,
    pub portfolio_return: f64,
    /// Regime that earned this day's return.
    pub regime: Regime,
    /// Whether the tilt sleeve was held; `None` without a tilt overlay and on day 0.
    pub tilt_active: Option<bool>,
    pub signal_above: bool,
    pub tax: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeShare {
    pub regime: Regime,
    pub days: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub metrics: PerformanceMetrics,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trading_days: usize,
    pub regime_distribution: Vec<RegimeShare>,
    pub signal_above_percent: f64,
    /// Percent of days holding the tilt sleeve, when configured.
    pub tilt_percent: Option<f64>,
    pub switches: usize,
    pub taxed_switches: usize,
    pub tax_paid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub records: Vec<DailyRecord>,
    pub state: PortfolioState,
    pub summary: Summary,
}

impl SimulationResult {
    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }

    pub fn regimes(&self) -> Vec<Regime> {
        self.records.iter().map(|r| r.regime).collect()
    }
}

fn signal_flags(frame: &AlignedFrame, classifier: Classifier, i: usize) -> SignalFlags {
    let primary = frame.above_ma(AssetRole::Signal, i).unwrap_or(false);
    match classifier {
        Classifier::Single => SignalFlags::single(primary),
        Classifier::Pair => SignalFlags::pair(
            primary,
            frame.above_ma(AssetRole::SecondarySignal, i).unwrap_or(false),
        ),
    }
}

fn check_frame(frame: &AlignedFrame, strategy: &Strategy) -> Result<(), SimError> {
    for role in strategy.required_roles() {
        if !frame.has(role) {
            return Err(SimError::Data {
                reason: format!("aligned frame has no {role} column"),
            });
        }
    }
    if frame.len() < 2 {
        return Err(SimError::InsufficientData {
            rows: frame.len(),
            minimum: 2,
        });
    }
    Ok(())
}

/// Run `strategy` over `frame`.
pub fn simulate(frame: &AlignedFrame, strategy: &Strategy) -> Result<SimulationResult, SimError> {
    check_frame(frame, strategy)?;

    let n = frame.len();
    let mut state = PortfolioState::new(strategy.baseline);
    let mut records = Vec::with_capacity(n);

    records.push(DailyRecord {
        date: frame.dates[0],
        value: state.value,
        portfolio_return: 0.0,
        regime: Regime::Initial,
        tilt_active: None,
        signal_above: frame.above_ma(AssetRole::Signal, 0).unwrap_or(false),
        tax: 0.0,
    });

    for i in 1..n {
        let today = signal_flags(frame, strategy.classifier, i);
        let yesterday = signal_flags(frame, strategy.classifier, i - 1);
        let new_regime = strategy.switch_rule.next_regime(
            strategy.classifier,
            today,
            yesterday,
            state.current_regime,
        );

        let base = strategy
            .allocations
            .daily_return(state.current_regime, frame, i, &strategy.returns);

        let (portfolio_return, tilt_active) = match &strategy.tilt {
            Some(tilt) => {
                let active = frame.above_ma(AssetRole::Tilt, i - 1).unwrap_or(false);
                let tilt_return = frame.ret(AssetRole::Tilt, i).unwrap_or(0.0);
                (tilt.blend(base, tilt_return, active), Some(active))
            }
            None => (base, None),
        };

        let regime = state.current_regime;
        let tax = state.book_day(i, portfolio_return, strategy.tax_rate);

        records.push(DailyRecord {
            date: frame.dates[i],
            value: state.value,
            portfolio_return,
            regime,
            tilt_active,
            signal_above: today.primary,
            tax,
        });

        state.current_regime = new_regime;
    }

    let summary = summarize(&records, &state, strategy)?;
    Ok(SimulationResult {
        records,
        state,
        summary,
    })
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Share of days per regime, largest first.
pub fn regime_distribution(regimes: &[Regime]) -> Vec<RegimeShare> {
    let mut counts: std::collections::BTreeMap<Regime, usize> = std::collections::BTreeMap::new();
    for r in regimes {
        *counts.entry(*r).or_insert(0) += 1;
    }
    let mut shares: Vec<RegimeShare> = counts
        .into_iter()
        .map(|(regime, days)| RegimeShare {
            regime,
            days,
            percent: percent(days, regimes.len()),
        })
        .collect();
    shares.sort_by(|a, b| b.days.cmp(&a.days).then(a.regime.cmp(&b.regime)));
    shares
}

fn summarize(
    records: &[DailyRecord],
    state: &PortfolioState,
    strategy: &Strategy,
) -> Result<Summary, SimError> {
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let values: Vec<f64> = records.iter().map(|r| r.value).collect();
    let metrics = PerformanceMetrics::compute(&dates, &values, strategy.year_convention)?;

    let regimes: Vec<Regime> = records.iter().map(|r| r.regime).collect();
    let above = records.iter().filter(|r| r.signal_above).count();
    let tilt_percent = strategy.tilt.map(|_| {
        let held = records.iter().filter(|r| r.tilt_active == Some(true)).count();
        percent(held, records.len())
    });

    Ok(Summary {
        metrics,
        start_date: dates[0],
        end_date: dates[dates.len() - 1],
        trading_days: records.len(),
        regime_distribution: regime_distribution(&regimes),
        signal_above_percent: percent(above, records.len()),
        tilt_percent,
        switches: state.switches,
        taxed_switches: state.taxed_switches,
        tax_paid: state.tax_paid,
    })
}
