//! Cross-asset moving-average regime overlap.
//!
//! For a set of instruments, how often do their above/below-MA states agree?

use crate::domain::moving_average::simple_moving_average;
use crate::domain::price::PriceSeries;
use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRegimeInfo {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub above_percent: f64,
    pub below_percent: f64,
}

/// Statistics over the dates on which every asset has a defined state.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonPeriodStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: usize,
    pub all_same_percent: f64,
    /// Per asset: the others agree and this one differs.
    pub odd_one_out_percent: Vec<f64>,
    pub all_below_percent: f64,
    /// Per asset: the others are below and this one is above.
    pub only_above_percent: Vec<f64>,
    pub conditional: Option<ConditionalBelow>,
}

/// Probabilities conditional on the first asset being below its MA.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBelow {
    pub reference: String,
    pub days_below: usize,
    pub share_of_days_percent: f64,
    /// Per other asset (in input order, reference excluded).
    pub also_below_percent: Vec<(String, f64)>,
    pub all_below_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlapReport {
    pub ma_window: usize,
    pub symbols: Vec<String>,
    /// `matrix[i][j]`: share (0..1) of common days with equal state; `None`
    /// when the pair never overlaps.
    pub matrix: Vec<Vec<Option<f64>>>,
    pub assets: Vec<Option<AssetRegimeInfo>>,
    pub common: Option<CommonPeriodStats>,
}

type Flags = BTreeMap<NaiveDate, bool>;

fn above_flags(series: &PriceSeries, window: usize) -> Flags {
    series
        .points
        .iter()
        .zip(simple_moving_average(series, window))
        .filter_map(|(p, m)| m.value.map(|ma| (p.date, p.close > ma)))
        .collect()
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

fn agreement(a: &Flags, b: &Flags) -> Option<f64> {
    let mut common = 0usize;
    let mut same = 0usize;
    for (date, fa) in a {
        if let Some(fb) = b.get(date) {
            common += 1;
            if fa == fb {
                same += 1;
            }
        }
    }
    if common == 0 {
        None
    } else {
        Some(same as f64 / common as f64)
    }
}

fn asset_info(symbol: &str, flags: &Flags) -> Option<AssetRegimeInfo> {
    let (&start_date, _) = flags.first_key_value()?;
    let (&end_date, _) = flags.last_key_value()?;
    let days = flags.len();
    let above = flags.values().filter(|&&f| f).count();
    Some(AssetRegimeInfo {
        symbol: symbol.to_string(),
        start_date,
        end_date,
        days,
        above_percent: percent(above, days),
        below_percent: percent(days - above, days),
    })
}

fn common_stats(symbols: &[String], flags: &[Flags]) -> Option<CommonPeriodStats> {
    let first = flags.first()?;
    let rows: Vec<(NaiveDate, Vec<bool>)> = first
        .keys()
        .filter_map(|date| {
            let row: Option<Vec<bool>> = flags.iter().map(|f| f.get(date).copied()).collect();
            row.map(|r| (*date, r))
        })
        .collect();
    if rows.is_empty() {
        return None;
    }

    let n_assets = flags.len();
    let total = rows.len();
    let all_same = rows
        .iter()
        .filter(|(_, r)| r.iter().all(|&f| f == r[0]))
        .count();
    let all_below = rows.iter().filter(|(_, r)| r.iter().all(|&f| !f)).count();

    let mut odd_one_out = vec![0usize; n_assets];
    let mut only_above = vec![0usize; n_assets];
    for (_, r) in &rows {
        for k in 0..n_assets {
            let mut others = r.iter().enumerate().filter(|&(j, _)| j != k).map(|(_, &f)| f);
            let Some(first_other) = others.next() else {
                continue;
            };
            if others.all(|f| f == first_other) {
                if r[k] != first_other {
                    odd_one_out[k] += 1;
                }
                if r[k] && !first_other {
                    only_above[k] += 1;
                }
            }
        }
    }

    let ref_below: Vec<&Vec<bool>> = rows.iter().map(|(_, r)| r).filter(|r| !r[0]).collect();
    let conditional = if ref_below.is_empty() {
        None
    } else {
        let days_below = ref_below.len();
        let also_below_percent = (1..n_assets)
            .map(|j| {
                let both = ref_below.iter().filter(|r| !r[j]).count();
                (symbols[j].clone(), percent(both, days_below))
            })
            .collect();
        let all = ref_below.iter().filter(|r| r.iter().all(|&f| !f)).count();
        Some(ConditionalBelow {
            reference: symbols[0].clone(),
            days_below,
            share_of_days_percent: percent(days_below, total),
            also_below_percent,
            all_below_percent: percent(all, days_below),
        })
    };

    Some(CommonPeriodStats {
        start_date: rows[0].0,
        end_date: rows[total - 1].0,
        days: total,
        all_same_percent: percent(all_same, total),
        odd_one_out_percent: odd_one_out.into_iter().map(|c| percent(c, total)).collect(),
        all_below_percent: percent(all_below, total),
        only_above_percent: only_above.into_iter().map(|c| percent(c, total)).collect(),
        conditional,
    })
}

/// Analyse MA regime overlap across `series` with a `window`-day MA.
pub fn analyze(series: &[PriceSeries], window: usize) -> OverlapReport {
    let symbols: Vec<String> = series.iter().map(|s| s.symbol.clone()).collect();
    let flags: Vec<Flags> = series.iter().map(|s| above_flags(s, window)).collect();

    let matrix = (0..flags.len())
        .map(|i| {
            (0..flags.len())
                .map(|j| {
                    if i == j {
                        Some(1.0)
                    } else {
                        agreement(&flags[i], &flags[j])
                    }
                })
                .collect()
        })
        .collect();

    let assets = symbols
        .iter()
        .zip(flags.iter())
        .map(|(s, f)| asset_info(s, f))
        .collect();

    OverlapReport {
        ma_window: window,
        common: common_stats(&symbols, &flags),
        symbols,
        matrix,
        assets,
    }
}
