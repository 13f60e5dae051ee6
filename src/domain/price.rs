//! Daily closing price series.

use chrono::NaiveDate;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Closing prices for one symbol, strictly increasing by date.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw observations. Missing closes (`None`), non-finite
    /// and non-positive values are dropped; later observations for the same date
    /// replace earlier ones; the result is sorted by date.
    pub fn from_observations<I>(symbol: impl Into<String>, observations: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        let by_date: BTreeMap<NaiveDate, f64> = observations
            .into_iter()
            .filter_map(|(date, close)| match close {
                Some(c) if c.is_finite() && c > 0.0 => Some((date, c)),
                _ => None,
            })
            .collect();

        PriceSeries {
            symbol: symbol.into(),
            points: by_date
                .into_iter()
                .map(|(date, close)| PricePoint { date, close })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// Keep only points within `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        PriceSeries {
            symbol: self.symbol.clone(),
            points: self
                .points
                .iter()
                .filter(|p| p.date >= start && p.date <= end)
                .copied()
                .collect(),
        }
    }

    /// Simple daily returns between consecutive points. Index 0 is `None`.
    pub fn daily_returns(&self) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.points.len());
        for (i, p) in self.points.iter().enumerate() {
            if i == 0 {
                out.push(None);
            } else {
                out.push(Some(p.close / self.points[i - 1].close - 1.0));
            }
        }
        out
    }
}
