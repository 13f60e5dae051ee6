//! Aligned multi-asset frame.
//!
//! Each input series gets its moving average computed on its own history, then
//! the series are intersected by date. Daily returns are taken between
//! consecutive aligned dates. Rows without a full moving-average window for every
//! asset, and the first aligned date (which has no return), are discarded.

use crate::domain::moving_average::simple_moving_average;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The part an instrument plays in a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetRole {
    Risk,
    Signal,
    SecondarySignal,
    Hedge,
    Tilt,
}

impl AssetRole {
    pub const ALL: [AssetRole; 5] = [
        AssetRole::Risk,
        AssetRole::Signal,
        AssetRole::SecondarySignal,
        AssetRole::Hedge,
        AssetRole::Tilt,
    ];

    /// Config key under `[assets]`.
    pub fn config_key(&self) -> &'static str {
        match self {
            AssetRole::Risk => "risk",
            AssetRole::Signal => "signal",
            AssetRole::SecondarySignal => "secondary_signal",
            AssetRole::Hedge => "hedge",
            AssetRole::Tilt => "tilt",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetColumns {
    pub symbol: String,
    pub close: Vec<f64>,
    pub ma: Vec<f64>,
    pub ret: Vec<f64>,
}

impl AssetColumns {
    /// Close strictly above its moving average.
    pub fn above_ma(&self, i: usize) -> bool {
        self.close[i] > self.ma[i]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFrame {
    pub ma_window: usize,
    pub dates: Vec<NaiveDate>,
    pub columns: BTreeMap<AssetRole, AssetColumns>,
}

impl AlignedFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn has(&self, role: AssetRole) -> bool {
        self.columns.contains_key(&role)
    }

    pub fn column(&self, role: AssetRole) -> Option<&AssetColumns> {
        self.columns.get(&role)
    }

    pub fn ret(&self, role: AssetRole, i: usize) -> Option<f64> {
        self.columns.get(&role).map(|c| c.ret[i])
    }

    pub fn above_ma(&self, role: AssetRole, i: usize) -> Option<bool> {
        self.columns.get(&role).map(|c| c.above_ma(i))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

struct Prepared<'a> {
    role: AssetRole,
    series: &'a PriceSeries,
    by_date: HashMap<NaiveDate, (f64, Option<f64>)>,
}

/// Align `inputs` on their common dates with a `window`-day moving average.
///
/// An empty input list, or inputs with no overlapping history long enough to
/// fill the window, yield an empty frame.
pub fn align(inputs: &[(AssetRole, &PriceSeries)], window: usize) -> AlignedFrame {
    let prepared: Vec<Prepared<'_>> = inputs
        .iter()
        .map(|&(role, series)| {
            let ma = simple_moving_average(series, window);
            let by_date = series
                .points
                .iter()
                .zip(ma.iter())
                .map(|(p, m)| (p.date, (p.close, m.value)))
                .collect();
            Prepared {
                role,
                series,
                by_date,
            }
        })
        .collect();

    let mut frame = AlignedFrame {
        ma_window: window,
        dates: Vec::new(),
        columns: prepared
            .iter()
            .map(|p| {
                (
                    p.role,
                    AssetColumns {
                        symbol: p.series.symbol.clone(),
                        close: Vec::new(),
                        ma: Vec::new(),
                        ret: Vec::new(),
                    },
                )
            })
            .collect(),
    };

    let Some(anchor) = prepared.first() else {
        return frame;
    };

    let common: Vec<NaiveDate> = anchor
        .series
        .points
        .iter()
        .map(|p| p.date)
        .filter(|d| prepared.iter().all(|p| p.by_date.contains_key(d)))
        .collect();

    let mut prev_close: Vec<Option<f64>> = vec![None; prepared.len()];

    for date in common {
        let mut row: Vec<(f64, Option<f64>, Option<f64>)> = Vec::with_capacity(prepared.len());
        for (k, p) in prepared.iter().enumerate() {
            let (close, ma) = p.by_date[&date];
            let ret = prev_close[k].map(|prev| close / prev - 1.0);
            prev_close[k] = Some(close);
            row.push((close, ma, ret));
        }

        let complete = row.iter().all(|(_, ma, ret)| ma.is_some() && ret.is_some());
        if !complete {
            continue;
        }

        frame.dates.push(date);
        for (p, (close, ma, ret)) in prepared.iter().zip(row) {
            if let Some(col) = frame.columns.get_mut(&p.role) {
                col.close.push(close);
                col.ma.push(ma.unwrap_or_default());
                col.ret.push(ret.unwrap_or_default());
            }
        }
    }

    frame
}
