//! Asset selection and price loading for a run.
//!
//! Maps each asset role to a symbol and fetches every distinct symbol once
//! through a [`PriceSource`].

use crate::domain::error::SimError;
use crate::domain::frame::AssetRole;
use crate::domain::price::PriceSeries;
use crate::ports::price_port::PriceSource;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetSelection {
    symbols: BTreeMap<AssetRole, String>,
}

impl AssetSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, role: AssetRole, symbol: impl Into<String>) -> Self {
        self.set(role, symbol);
        self
    }

    pub fn set(&mut self, role: AssetRole, symbol: impl Into<String>) {
        self.symbols.insert(role, symbol.into());
    }

    pub fn symbol(&self, role: AssetRole) -> Option<&str> {
        self.symbols.get(&role).map(String::as_str)
    }

    pub fn roles(&self) -> impl Iterator<Item = AssetRole> + '_ {
        self.symbols.keys().copied()
    }
}

/// Fetched series keyed by role. Roles sharing a symbol hold equal copies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleSeries {
    pub series: BTreeMap<AssetRole, PriceSeries>,
}

impl RoleSeries {
    pub fn get(&self, role: AssetRole) -> Option<&PriceSeries> {
        self.series.get(&role)
    }

    /// Borrowed `(role, series)` pairs in role order, ready for alignment.
    pub fn inputs(&self) -> Vec<(AssetRole, &PriceSeries)> {
        self.series.iter().map(|(r, s)| (*r, s)).collect()
    }
}

/// Fetch the series for `roles`. Every role must have a symbol and every
/// symbol must return at least one price.
pub fn load_role_series(
    source: &dyn PriceSource,
    selection: &AssetSelection,
    roles: &[AssetRole],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<RoleSeries, SimError> {
    let mut cache: HashMap<String, PriceSeries> = HashMap::new();
    let mut out = RoleSeries::default();

    for &role in roles {
        let symbol = selection
            .symbol(role)
            .ok_or_else(|| SimError::missing("assets", role.config_key()))?;

        if !cache.contains_key(symbol) {
            let series = source.fetch_closes(symbol, start_date, end_date)?;
            if series.is_empty() {
                return Err(SimError::NoData {
                    symbol: symbol.to_string(),
                });
            }
            info!(
                "Loaded {} prices for {} ({} to {})",
                series.len(),
                symbol,
                series.first_date().unwrap_or(start_date),
                series.last_date().unwrap_or(end_date),
            );
            cache.insert(symbol.to_string(), series);
        } else {
            debug!("Reusing {} for role {}", symbol, role);
        }

        if let Some(series) = cache.get(symbol) {
            out.series.insert(role, series.clone());
        }
    }

    Ok(out)
}
