//! Trailing simple moving average over closing prices.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: the first (n-1) points have no value.

use crate::domain::price::{PricePoint, PriceSeries};
use chrono::NaiveDate;

pub const DEFAULT_MA_WINDOW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Mean of the window, summed as offsets from its first close so a flat
/// window averages to exactly that close.
fn window_mean(points: &[PricePoint]) -> f64 {
    let base = points[0].close;
    let offset: f64 = points.iter().map(|p| p.close - base).sum();
    base + offset / points.len() as f64
}

/// Rolling mean over `window` closes, aligned to the input points.
pub fn simple_moving_average(series: &PriceSeries, window: usize) -> Vec<MaPoint> {
    let mut out = Vec::with_capacity(series.len());
    if window == 0 {
        return series
            .points
            .iter()
            .map(|p| MaPoint {
                date: p.date,
                value: None,
            })
            .collect();
    }

    for (i, p) in series.points.iter().enumerate() {
        let value = if i + 1 >= window {
            Some(window_mean(&series.points[i + 1 - window..=i]))
        } else {
            None
        };
        out.push(MaPoint {
            date: p.date,
            value,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(prices: &[f64]) -> PriceSeries {
        PriceSeries::from_observations(
            "TEST",
            prices.iter().enumerate().map(|(i, &c)| {
                (
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    Some(c),
                )
            }),
        )
    }

    #[test]
    fn warmup_has_no_value() {
        let ma = simple_moving_average(&series(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(ma[0].value, None);
        assert_eq!(ma[1].value, None);
        assert!(ma[2].value.is_some());
        assert!(ma[3].value.is_some());
    }

    #[test]
    fn flat_series_average_equals_close() {
        for close in [0.3, 1.1, 33.33, 1234.56] {
            let ma = simple_moving_average(&series(&vec![close; 3000]), 200);
            assert!(ma[199..].iter().all(|m| m.value == Some(close)), "close {close}");
        }
    }

    #[test]
    fn rolling_values() {
        let ma = simple_moving_average(&series(&[10.0, 20.0, 30.0, 40.0, 50.0]), 3);
        assert!((ma[2].value.unwrap() - 20.0).abs() < 1e-12);
        assert!((ma[3].value.unwrap() - 30.0).abs() < 1e-12);
        assert!((ma[4].value.unwrap() - 40.0).abs() < 1e-12);
    }

    #[test]
    fn window_one_is_the_close() {
        let ma = simple_moving_average(&series(&[5.0, 7.0]), 1);
        assert_eq!(ma[0].value, Some(5.0));
        assert_eq!(ma[1].value, Some(7.0));
    }

    #[test]
    fn window_longer_than_series() {
        let ma = simple_moving_average(&series(&[1.0, 2.0]), 200);
        assert!(ma.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn zero_window_yields_nothing() {
        let ma = simple_moving_average(&series(&[1.0, 2.0]), 0);
        assert!(ma.iter().all(|p| p.value.is_none()));
    }
}
