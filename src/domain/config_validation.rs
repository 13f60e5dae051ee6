//! Configuration reading and validation.
//!
//! Every value is parsed into its typed form here, before any price data is
//! touched. `validate_run_config` runs the same readers and discards the
//! results.

use crate::domain::allocation::{
    AllocationTable, Direction, PositionSense, ReturnContext, TiltOverlay, DEFAULT_CASH_RETURN,
};
use crate::domain::allocation_parser;
use crate::domain::dataset::AssetSelection;
use crate::domain::error::SimError;
use crate::domain::frame::AssetRole;
use crate::domain::metrics::YearConvention;
use crate::domain::moving_average::DEFAULT_MA_WINDOW;
use crate::domain::regime::{Classifier, Regime, SwitchRule};
use crate::domain::strategy::{Strategy, DEFAULT_BASELINE};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_TAX_RATE: f64 = 0.25;
pub const DEFAULT_TILT_WEIGHT: f64 = 0.1;
pub const DEFAULT_TILT_LEVERAGE: f64 = 2.0;
pub const DEFAULT_HEDGE_LEVERAGE: f64 = 1.0;

/// Data selection and output settings shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub data_path: Option<PathBuf>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assets: AssetSelection,
    pub ma_window: usize,
    pub output: Option<PathBuf>,
    pub benchmarks: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepSettings {
    pub ma_windows: Vec<usize>,
    pub leverages: Vec<f64>,
    pub tax_rates: Vec<f64>,
}

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), SimError> {
    let settings = read_run_settings(config)?;
    let strategy = read_strategy(config, &settings.assets)?;
    read_sweep_settings(config, &settings, &strategy)?;
    Ok(())
}

pub fn read_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, SimError> {
    let (start_date, end_date) = read_dates(config)?;
    Ok(RunSettings {
        data_path: config.get_string("data", "path").map(PathBuf::from),
        start_date,
        end_date,
        assets: read_assets(config)?,
        ma_window: read_ma_window(config)?,
        output: config.get_string("report", "output").map(PathBuf::from),
        benchmarks: config.get_bool("report", "benchmarks", true),
    })
}

fn read_dates(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), SimError> {
    let start_date = parse_date(config, "start_date")?.unwrap_or(NaiveDate::MIN);
    let end_date = parse_date(config, "end_date")?.unwrap_or(NaiveDate::MAX);

    if start_date >= end_date {
        return Err(SimError::invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok((start_date, end_date))
}

fn parse_date(config: &dyn ConfigPort, field: &str) -> Result<Option<NaiveDate>, SimError> {
    match config.get_string("data", field) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                SimError::invalid(
                    "data",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn read_assets(config: &dyn ConfigPort) -> Result<AssetSelection, SimError> {
    let mut assets = AssetSelection::new();
    for role in AssetRole::ALL {
        if let Some(symbol) = config.get_string("assets", role.config_key()) {
            assets.set(role, symbol);
        }
    }
    for role in [AssetRole::Risk, AssetRole::Signal] {
        if assets.symbol(role).is_none() {
            return Err(SimError::missing("assets", role.config_key()));
        }
    }
    Ok(assets)
}

fn read_ma_window(config: &dyn ConfigPort) -> Result<usize, SimError> {
    let window = read_parsed(config, "simulation", "ma_window", DEFAULT_MA_WINDOW)?;
    if window < 1 {
        return Err(SimError::invalid("simulation", "ma_window", "ma_window must be at least 1"));
    }
    Ok(window)
}

/// Parse `[section] key` with `FromStr`, or return `default` when absent.
fn read_parsed<T>(config: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, SimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| SimError::invalid(section, key, format!("'{}': {}", raw, e))),
    }
}

fn read_f64_in(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
    valid: impl Fn(f64) -> bool,
    expectation: &str,
) -> Result<f64, SimError> {
    let value: f64 = read_parsed(config, section, key, default)?;
    if !value.is_finite() || !valid(value) {
        return Err(SimError::invalid(section, key, format!("{} must be {}", key, expectation)));
    }
    Ok(value)
}

/// Comma-separated list, or `default` when absent. Empty lists are rejected.
fn read_list<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Vec<T>,
) -> Result<Vec<T>, SimError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<T>()
                .map_err(|e| SimError::invalid(section, key, format!("'{}': {}", s, e)))
        })
        .collect::<Result<Vec<T>, SimError>>()?;
    if items.is_empty() {
        return Err(SimError::invalid(section, key, "list must not be empty"));
    }
    Ok(items)
}

pub fn read_strategy(config: &dyn ConfigPort, assets: &AssetSelection) -> Result<Strategy, SimError> {
    let classifier = if assets.symbol(AssetRole::SecondarySignal).is_some() {
        Classifier::Pair
    } else {
        Classifier::Single
    };
    let default_rule = match classifier {
        Classifier::Single => SwitchRule::LagOne,
        Classifier::Pair => SwitchRule::Confirmed,
    };

    let switch_rule = read_parsed(config, "simulation", "switch_rule", default_rule)?;
    let position = read_parsed(config, "simulation", "position", PositionSense::Over)?;
    let direction = read_parsed(config, "simulation", "direction", Direction::Long)?;
    let year_convention =
        read_parsed(config, "simulation", "annualization", YearConvention::default())?;

    let tax_rate = read_f64_in(
        config,
        "simulation",
        "tax_rate",
        DEFAULT_TAX_RATE,
        |v| (0.0..=1.0).contains(&v),
        "between 0 and 1",
    )?;
    let baseline = read_f64_in(
        config,
        "simulation",
        "baseline",
        DEFAULT_BASELINE,
        |v| v > 0.0,
        "positive",
    )?;
    let cash_return = read_f64_in(
        config,
        "simulation",
        "cash_return",
        DEFAULT_CASH_RETURN,
        |_| true,
        "a finite number",
    )?;
    let risk_leverage = match config.get_string("simulation", "risk_leverage") {
        Some(_) => Some(read_f64_in(
            config,
            "simulation",
            "risk_leverage",
            1.0,
            |v| v > 0.0,
            "positive",
        )?),
        None => None,
    };

    let allocations = read_allocations(config, classifier, position, risk_leverage, assets)?;
    let tilt = read_tilt(config, assets)?;

    let strategy = Strategy {
        name: config
            .get_string("simulation", "name")
            .unwrap_or_else(|| "Regime switch".to_string()),
        classifier,
        switch_rule,
        allocations,
        tilt,
        tax_rate,
        baseline,
        returns: ReturnContext {
            direction,
            cash_return,
        },
        year_convention,
    };

    for role in strategy.required_roles() {
        if assets.symbol(role).is_none() {
            return Err(SimError::missing("assets", role.config_key()));
        }
    }
    Ok(strategy)
}

fn read_allocations(
    config: &dyn ConfigPort,
    classifier: Classifier,
    position: PositionSense,
    risk_leverage: Option<f64>,
    assets: &AssetSelection,
) -> Result<AllocationTable, SimError> {
    if classifier == Classifier::Pair && config.get_string("simulation", "position").is_some() {
        return Err(SimError::invalid(
            "simulation",
            "position",
            "position applies to a single signal; set [allocation] formulas for a pair",
        ));
    }

    let mut table = match (classifier, assets.symbol(AssetRole::Hedge)) {
        (Classifier::Single, Some(_)) => AllocationTable::risk_or_hedge(
            position,
            risk_leverage.unwrap_or(1.0),
            DEFAULT_HEDGE_LEVERAGE,
        ),
        _ => AllocationTable::default_for(classifier, position, risk_leverage.unwrap_or(1.0)),
    };
    if classifier == Classifier::Pair {
        if let Some(lev) = risk_leverage {
            table = table.with_risk_leverage(lev);
        }
    }

    for key in config.section_keys("allocation") {
        let regime = Regime::from_str(&key).map_err(|e| SimError::invalid("allocation", &key, e))?;
        if !classifier.regimes().contains(&regime) {
            let expected: Vec<&str> = classifier.regimes().iter().map(|r| r.label()).collect();
            return Err(SimError::invalid(
                "allocation",
                &key,
                format!("expected one of {}", expected.join(", ")),
            ));
        }
        let formula = config.get_string("allocation", &key).unwrap_or_default();
        let allocation = allocation_parser::parse(&formula).map_err(|source| {
            SimError::AllocationParse {
                regime: key.clone(),
                formula: formula.clone(),
                source,
            }
        })?;
        table.insert(regime, allocation);
    }
    Ok(table)
}

fn read_tilt(config: &dyn ConfigPort, assets: &AssetSelection) -> Result<Option<TiltOverlay>, SimError> {
    let configured = !config.section_keys("tilt").is_empty();
    if assets.symbol(AssetRole::Tilt).is_none() {
        if configured {
            return Err(SimError::missing("assets", AssetRole::Tilt.config_key()));
        }
        return Ok(None);
    }

    let weight = read_f64_in(
        config,
        "tilt",
        "weight",
        DEFAULT_TILT_WEIGHT,
        |v| v > 0.0 && v <= 1.0,
        "in (0, 1]",
    )?;
    let leverage = read_f64_in(
        config,
        "tilt",
        "leverage",
        DEFAULT_TILT_LEVERAGE,
        |v| v > 0.0,
        "positive",
    )?;
    Ok(Some(TiltOverlay { weight, leverage }))
}

pub fn read_sweep_settings(
    config: &dyn ConfigPort,
    settings: &RunSettings,
    strategy: &Strategy,
) -> Result<SweepSettings, SimError> {
    let ma_windows: Vec<usize> = read_list(config, "sweep", "ma_windows", vec![settings.ma_window])?;
    if ma_windows.contains(&0) {
        return Err(SimError::invalid("sweep", "ma_windows", "windows must be at least 1"));
    }

    let leverages: Vec<f64> = read_list(config, "sweep", "leverages", vec![strategy.risk_leverage()])?;
    if leverages.iter().any(|l| !l.is_finite() || *l <= 0.0) {
        return Err(SimError::invalid("sweep", "leverages", "leverages must be positive"));
    }

    let tax_rates: Vec<f64> = read_list(config, "sweep", "tax_rates", vec![strategy.tax_rate])?;
    if tax_rates.iter().any(|t| !(0.0..=1.0).contains(t)) {
        return Err(SimError::invalid("sweep", "tax_rates", "tax rates must be between 0 and 1"));
    }

    Ok(SweepSettings {
        ma_windows,
        leverages,
        tax_rates,
    })
}
