#![allow(dead_code)]

use chrono::NaiveDate;
use regimesim::domain::allocation::{AllocationTable, PositionSense, ReturnContext};
use regimesim::domain::error::SimError;
use regimesim::domain::frame::{AlignedFrame, AssetColumns, AssetRole};
use regimesim::domain::metrics::YearConvention;
use regimesim::domain::price::PriceSeries;
use regimesim::domain::regime::{Classifier, SwitchRule};
use regimesim::domain::strategy::Strategy;
use regimesim::ports::price_port::PriceSource;
use std::collections::{BTreeMap, HashMap};

pub struct MockPriceSource {
    pub data: HashMap<String, PriceSeries>,
    pub errors: HashMap<String, String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, series: PriceSeries) -> Self {
        self.data.insert(series.symbol.clone(), series);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_closes(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceSeries, SimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|s| s.between(start_date, end_date))
            .unwrap_or_else(|| PriceSeries::from_observations(symbol, Vec::new())))
    }

    fn list_symbols(&self) -> Result<Vec<String>, SimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

pub fn day(i: usize) -> NaiveDate {
    start_date() + chrono::Duration::days(i as i64)
}

/// Series with one close per consecutive calendar day from `start_date()`.
pub fn series_from_closes(symbol: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::from_observations(
        symbol,
        closes.iter().enumerate().map(|(i, &c)| (day(i), Some(c))),
    )
}

/// Closes compounding at `daily` for `n` days from 100.
pub fn growth_series(symbol: &str, n: usize, daily: f64) -> PriceSeries {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 * (1.0 + daily).powi(i as i32)).collect();
    series_from_closes(symbol, &closes)
}

/// Frame with a risk column earning `risk_returns[i]` and a signal column whose
/// above-MA flag on row `i` is `signal_above[i]`.
pub fn frame_from_flags(risk_returns: &[f64], signal_above: &[bool]) -> AlignedFrame {
    assert_eq!(risk_returns.len(), signal_above.len());
    let n = risk_returns.len();

    let mut risk_close = Vec::with_capacity(n);
    let mut close = 100.0;
    for r in risk_returns {
        close *= 1.0 + r;
        risk_close.push(close);
    }

    let mut columns = BTreeMap::new();
    columns.insert(
        AssetRole::Risk,
        AssetColumns {
            symbol: "RISK".into(),
            close: risk_close.clone(),
            ma: risk_close,
            ret: risk_returns.to_vec(),
        },
    );
    columns.insert(
        AssetRole::Signal,
        AssetColumns {
            symbol: "SIG".into(),
            close: signal_above.iter().map(|&a| if a { 2.0 } else { 1.0 }).collect(),
            ma: vec![1.5; n],
            ret: vec![0.0; n],
        },
    );

    AlignedFrame {
        ma_window: 1,
        dates: (0..n).map(day).collect(),
        columns,
    }
}

/// Long the risk asset while the signal is above its MA, flat otherwise.
pub fn switch_strategy(rule: SwitchRule, tax_rate: f64) -> Strategy {
    Strategy {
        name: "Signal switch".into(),
        classifier: Classifier::Single,
        switch_rule: rule,
        allocations: AllocationTable::signal_switch(PositionSense::Over, 1.0),
        tilt: None,
        tax_rate,
        baseline: 100.0,
        returns: ReturnContext {
            cash_return: 0.0,
            ..ReturnContext::default()
        },
        year_convention: YearConvention::TradingDays,
    }
}
