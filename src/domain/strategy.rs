//! Strategy definition: classifier, switch rule, allocations and accounting
//! parameters for one simulation run.

use crate::domain::allocation::{AllocationTable, Exposure, ReturnContext, TiltOverlay};
use crate::domain::frame::AssetRole;
use crate::domain::metrics::YearConvention;
use crate::domain::regime::{Classifier, SwitchRule};

pub const DEFAULT_BASELINE: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub classifier: Classifier,
    pub switch_rule: SwitchRule,
    pub allocations: AllocationTable,
    pub tilt: Option<TiltOverlay>,
    pub tax_rate: f64,
    pub baseline: f64,
    pub returns: ReturnContext,
    pub year_convention: YearConvention,
}

impl Strategy {
    /// Asset roles the aligned frame must contain.
    pub fn required_roles(&self) -> Vec<AssetRole> {
        let mut roles = vec![AssetRole::Risk, AssetRole::Signal];
        if self.classifier == Classifier::Pair {
            roles.push(AssetRole::SecondarySignal);
        }
        if self.tilt.is_some() {
            roles.push(AssetRole::Tilt);
        }
        roles.extend(self.allocations.roles());
        roles.sort();
        roles.dedup();
        roles
    }

    /// Leverage of the first risk sleeve in regime order, 1.0 when no regime
    /// holds the risk asset.
    pub fn risk_leverage(&self) -> f64 {
        self.allocations
            .iter()
            .flat_map(|(_, a)| a.sleeves.iter())
            .find(|s| s.exposure == Exposure::Asset(AssetRole::Risk))
            .map(|s| s.leverage)
            .unwrap_or(1.0)
    }

    /// Copy with every risk sleeve set to `leverage`.
    pub fn with_risk_leverage(&self, leverage: f64) -> Self {
        Strategy {
            allocations: self.allocations.with_risk_leverage(leverage),
            ..self.clone()
        }
    }

    pub fn with_tax_rate(&self, tax_rate: f64) -> Self {
        Strategy {
            tax_rate,
            ..self.clone()
        }
    }
}
