//! Performance metrics over a value series.
//!
//! All functions are pure and re-runnable. Inputs too short to define a metric
//! fail with an error instead of producing NaN or infinity.

use crate::domain::error::SimError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const CALENDAR_DAYS_PER_YEAR: f64 = 365.25;

/// How elapsed years are counted when annualizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearConvention {
    /// (last date - first date) in days / 365.25
    #[default]
    CalendarDays,
    /// number of observations / 252
    TradingDays,
}

impl FromStr for YearConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "calendar" | "calendar_days" => Ok(YearConvention::CalendarDays),
            "trading" | "trading_days" => Ok(YearConvention::TradingDays),
            other => Err(format!("expected calendar or trading, got '{other}'")),
        }
    }
}

impl fmt::Display for YearConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearConvention::CalendarDays => f.write_str("calendar days / 365.25"),
            YearConvention::TradingDays => f.write_str("trading days / 252"),
        }
    }
}

fn require_points(len: usize, minimum: usize) -> Result<(), SimError> {
    if len < minimum {
        return Err(SimError::InsufficientData { rows: len, minimum });
    }
    Ok(())
}

pub fn elapsed_years(dates: &[NaiveDate], convention: YearConvention) -> Result<f64, SimError> {
    require_points(dates.len(), 2)?;
    let years = match convention {
        YearConvention::CalendarDays => {
            let days = (dates[dates.len() - 1] - dates[0]).num_days();
            days as f64 / CALENDAR_DAYS_PER_YEAR
        }
        YearConvention::TradingDays => dates.len() as f64 / TRADING_DAYS_PER_YEAR,
    };
    if years <= 0.0 || !years.is_finite() {
        return Err(SimError::DegeneratePeriod {
            reason: format!("{years} elapsed years"),
        });
    }
    Ok(years)
}

pub fn total_return(values: &[f64]) -> Result<f64, SimError> {
    require_points(values.len(), 2)?;
    let first = values[0];
    if first <= 0.0 {
        return Err(SimError::DegeneratePeriod {
            reason: format!("starting value {first} is not positive"),
        });
    }
    Ok(values[values.len() - 1] / first - 1.0)
}

/// Geometric annual rate equivalent to `total` over `years`.
///
/// A wiped-out portfolio (total return <= -100%) annualizes to -100%.
pub fn annualize(total: f64, years: f64) -> Result<f64, SimError> {
    if years <= 0.0 || !years.is_finite() {
        return Err(SimError::DegeneratePeriod {
            reason: format!("{years} elapsed years"),
        });
    }
    let growth = 1.0 + total;
    if growth <= 0.0 {
        return Ok(-1.0);
    }
    Ok(growth.powf(1.0 / years) - 1.0)
}

pub fn annualized_return(
    values: &[f64],
    dates: &[NaiveDate],
    convention: YearConvention,
) -> Result<f64, SimError> {
    let total = total_return(values)?;
    let years = elapsed_years(dates, convention)?;
    annualize(total, years)
}

/// Simple returns between consecutive values.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

/// Sample standard deviation of daily returns, scaled by sqrt(252).
pub fn annualized_volatility(returns: &[f64]) -> Result<f64, SimError> {
    require_points(returns.len(), 2)?;
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Ok(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Deepest peak-to-trough decline, as a non-positive fraction.
pub fn max_drawdown(values: &[f64]) -> Result<f64, SimError> {
    require_points(values.len(), 1)?;
    let mut peak = values[0];
    let mut worst = 0.0_f64;
    for &v in values {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < worst {
                worst = dd;
            }
        }
    }
    Ok(worst)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    /// `None` with fewer than two daily returns.
    pub annualized_volatility: Option<f64>,
    pub max_drawdown: f64,
    pub years: f64,
    pub convention: YearConvention,
}

impl PerformanceMetrics {
    pub fn compute(
        dates: &[NaiveDate],
        values: &[f64],
        convention: YearConvention,
    ) -> Result<Self, SimError> {
        if dates.len() != values.len() {
            return Err(SimError::Data {
                reason: format!(
                    "{} dates for {} values",
                    dates.len(),
                    values.len()
                ),
            });
        }
        let total = total_return(values)?;
        let years = elapsed_years(dates, convention)?;
        let annualized = annualize(total, years)?;
        let returns = daily_returns(values);

        Ok(PerformanceMetrics {
            final_value: values[values.len() - 1],
            total_return: total,
            annualized_return: annualized,
            annualized_volatility: annualized_volatility(&returns).ok(),
            max_drawdown: max_drawdown(values)?,
            years,
            convention,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn total_return_basic() {
        assert_relative_eq!(total_return(&[100.0, 110.0]).unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(total_return(&[100.0, 90.0]).unwrap(), -0.10, epsilon = 1e-12);
    }

    #[test]
    fn single_point_fails() {
        assert!(matches!(
            total_return(&[100.0]),
            Err(SimError::InsufficientData { rows: 1, minimum: 2 })
        ));
        assert!(elapsed_years(&dates(1), YearConvention::CalendarDays).is_err());
        assert!(PerformanceMetrics::compute(&dates(1), &[100.0], YearConvention::TradingDays).is_err());
    }

    #[test]
    fn empty_drawdown_fails() {
        assert!(max_drawdown(&[]).is_err());
    }

    #[test]
    fn calendar_years() {
        let d = vec![
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
        ];
        assert_relative_eq!(
            elapsed_years(&d, YearConvention::CalendarDays).unwrap(),
            366.0 / 365.25,
            epsilon = 1e-12
        );
    }

    #[test]
    fn trading_years_count_observations() {
        assert_relative_eq!(
            elapsed_years(&dates(504), YearConvention::TradingDays).unwrap(),
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn annualize_round_trip() {
        let total = 0.75;
        let years = 3.5;
        let annual = annualize(total, years).unwrap();
        assert_relative_eq!((1.0 + annual).powf(years) - 1.0, total, epsilon = 1e-12);
    }

    #[test]
    fn annualize_zero_years_fails() {
        assert!(matches!(
            annualize(0.1, 0.0),
            Err(SimError::DegeneratePeriod { .. })
        ));
    }

    #[test]
    fn annualize_wipeout() {
        assert_eq!(annualize(-1.5, 2.0).unwrap(), -1.0);
    }

    #[test]
    fn flat_series_zero_annualized() {
        let values = vec![100.0; 253];
        let m = PerformanceMetrics::compute(&dates(253), &values, YearConvention::TradingDays).unwrap();
        assert_relative_eq!(m.annualized_return, 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.annualized_volatility.unwrap(), 0.0, epsilon = 1e-12);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn volatility_sample_stddev() {
        // mean 0.005, deviations 0.005, -0.015, 0.015, -0.005
        let returns = [0.01, -0.01, 0.02, 0.0];
        let var = (0.005f64.powi(2) + 0.015f64.powi(2) + 0.015f64.powi(2) + 0.005f64.powi(2)) / 3.0;
        assert_relative_eq!(
            annualized_volatility(&returns).unwrap(),
            var.sqrt() * 252f64.sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn volatility_needs_two_returns() {
        assert!(annualized_volatility(&[0.01]).is_err());
        let m = PerformanceMetrics::compute(&dates(2), &[100.0, 101.0], YearConvention::TradingDays).unwrap();
        assert_eq!(m.annualized_volatility, None);
    }

    #[test]
    fn drawdown_from_running_peak() {
        let values = [100.0, 110.0, 90.0, 95.0, 80.0, 100.0];
        assert_relative_eq!(
            max_drawdown(&values).unwrap(),
            (80.0 - 110.0) / 110.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn drawdown_monotonic_rise_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn mismatched_lengths_fail() {
        assert!(PerformanceMetrics::compute(&dates(3), &[1.0, 2.0], YearConvention::CalendarDays).is_err());
    }

    #[test]
    fn convention_parse() {
        assert_eq!("trading".parse::<YearConvention>().unwrap(), YearConvention::TradingDays);
        assert_eq!("Calendar".parse::<YearConvention>().unwrap(), YearConvention::CalendarDays);
        assert!("lunar".parse::<YearConvention>().is_err());
    }
}
