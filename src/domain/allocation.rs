//! Regime -> return formula table.
//!
//! An [`Allocation`] is a list of weighted, leveraged sleeves. Each sleeve earns
//! either an asset's daily return (sign-flipped for a short risk leg, then
//! multiplied by the leverage) or a fixed daily cash rate. Weights are not
//! required to sum to 1.

use crate::domain::frame::{AlignedFrame, AssetRole};
use crate::domain::regime::{Classifier, Regime};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Constant daily cash return (0.012%).
pub const DEFAULT_CASH_RETURN: f64 = 0.00012;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Long,
    Short,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(format!("expected long or short, got '{other}'")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("long"),
            Direction::Short => f.write_str("short"),
        }
    }
}

/// Whether the risk asset is held while the signal is over or under its MA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSense {
    Over,
    Under,
}

impl FromStr for PositionSense {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "over" => Ok(PositionSense::Over),
            "under" => Ok(PositionSense::Under),
            other => Err(format!("expected over or under, got '{other}'")),
        }
    }
}

impl fmt::Display for PositionSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSense::Over => f.write_str("over"),
            PositionSense::Under => f.write_str("under"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exposure {
    Asset(AssetRole),
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sleeve {
    pub exposure: Exposure,
    pub weight: f64,
    pub leverage: f64,
}

impl Sleeve {
    pub fn asset(role: AssetRole, weight: f64, leverage: f64) -> Self {
        Sleeve {
            exposure: Exposure::Asset(role),
            weight,
            leverage,
        }
    }

    pub fn cash(weight: f64) -> Self {
        Sleeve {
            exposure: Exposure::Cash,
            weight,
            leverage: 1.0,
        }
    }
}

/// Inputs a formula needs besides the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnContext {
    pub direction: Direction,
    pub cash_return: f64,
}

impl Default for ReturnContext {
    fn default() -> Self {
        ReturnContext {
            direction: Direction::Long,
            cash_return: DEFAULT_CASH_RETURN,
        }
    }
}

/// Daily return of `role` on row `i`, with the risk leg's direction applied.
pub fn directed_return(frame: &AlignedFrame, role: AssetRole, i: usize, direction: Direction) -> f64 {
    let raw = frame.ret(role, i).unwrap_or(0.0);
    match (role, direction) {
        (AssetRole::Risk, Direction::Short) => -raw,
        _ => raw,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Allocation {
    pub sleeves: Vec<Sleeve>,
}

impl Allocation {
    /// No exposure: earns 0.
    pub fn flat() -> Self {
        Allocation { sleeves: vec![] }
    }

    pub fn single(sleeve: Sleeve) -> Self {
        Allocation {
            sleeves: vec![sleeve],
        }
    }

    pub fn is_flat(&self) -> bool {
        self.sleeves.is_empty()
    }

    pub fn gross_exposure(&self) -> f64 {
        self.sleeves
            .iter()
            .map(|s| match s.exposure {
                Exposure::Asset(_) => s.weight * s.leverage,
                Exposure::Cash => 0.0,
            })
            .sum()
    }

    pub fn roles(&self) -> impl Iterator<Item = AssetRole> + '_ {
        self.sleeves.iter().filter_map(|s| match s.exposure {
            Exposure::Asset(role) => Some(role),
            Exposure::Cash => None,
        })
    }

    pub fn daily_return(&self, frame: &AlignedFrame, i: usize, ctx: &ReturnContext) -> f64 {
        self.sleeves
            .iter()
            .map(|s| match s.exposure {
                Exposure::Asset(role) => {
                    s.weight * directed_return(frame, role, i, ctx.direction) * s.leverage
                }
                Exposure::Cash => s.weight * ctx.cash_return,
            })
            .sum()
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sleeves.is_empty() {
            return f.write_str("flat");
        }
        for (k, s) in self.sleeves.iter().enumerate() {
            if k > 0 {
                f.write_str(" + ")?;
            }
            match s.exposure {
                Exposure::Asset(role) => {
                    write!(f, "{}*{}", s.weight, role)?;
                    if s.leverage != 1.0 {
                        write!(f, "@{}", s.leverage)?;
                    }
                }
                Exposure::Cash => write!(f, "{}*cash", s.weight)?,
            }
        }
        Ok(())
    }
}

/// Regime -> allocation lookup. Regimes without an entry (including
/// `Initial`) are flat.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AllocationTable {
    entries: BTreeMap<Regime, Allocation>,
}

impl AllocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, regime: Regime, allocation: Allocation) -> Self {
        self.insert(regime, allocation);
        self
    }

    pub fn insert(&mut self, regime: Regime, allocation: Allocation) {
        self.entries.insert(regime, allocation);
    }

    pub fn get(&self, regime: Regime) -> Option<&Allocation> {
        self.entries.get(&regime)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Regime, &Allocation)> {
        self.entries.iter()
    }

    pub fn daily_return(&self, regime: Regime, frame: &AlignedFrame, i: usize, ctx: &ReturnContext) -> f64 {
        match regime {
            Regime::Initial => 0.0,
            r => self
                .entries
                .get(&r)
                .map(|a| a.daily_return(frame, i, ctx))
                .unwrap_or(0.0),
        }
    }

    /// Copy with every risk sleeve set to `leverage`.
    pub fn with_risk_leverage(&self, leverage: f64) -> Self {
        let mut table = self.clone();
        for allocation in table.entries.values_mut() {
            for sleeve in &mut allocation.sleeves {
                if sleeve.exposure == Exposure::Asset(AssetRole::Risk) {
                    sleeve.leverage = leverage;
                }
            }
        }
        table
    }

    /// Every asset role some regime allocates to.
    pub fn roles(&self) -> Vec<AssetRole> {
        let mut roles: Vec<AssetRole> = self.entries.values().flat_map(|a| a.roles()).collect();
        roles.sort();
        roles.dedup();
        roles
    }

    /// Hold the risk asset (at `leverage`) in one single-signal regime, flat in the other.
    pub fn signal_switch(sense: PositionSense, leverage: f64) -> Self {
        let risk = Allocation::single(Sleeve::asset(AssetRole::Risk, 1.0, leverage));
        match sense {
            PositionSense::Over => Self::new()
                .with(Regime::Above, risk)
                .with(Regime::Below, Allocation::flat()),
            PositionSense::Under => Self::new()
                .with(Regime::Above, Allocation::flat())
                .with(Regime::Below, risk),
        }
    }

    /// Hold the risk asset on the `sense` side of the MA and the hedge on the other.
    pub fn risk_or_hedge(sense: PositionSense, risk_leverage: f64, hedge_leverage: f64) -> Self {
        let risk = Allocation::single(Sleeve::asset(AssetRole::Risk, 1.0, risk_leverage));
        let hedge = Allocation::single(Sleeve::asset(AssetRole::Hedge, 1.0, hedge_leverage));
        match sense {
            PositionSense::Over => Self::new()
                .with(Regime::Above, risk)
                .with(Regime::Below, hedge),
            PositionSense::Under => Self::new()
                .with(Regime::Above, hedge)
                .with(Regime::Below, risk),
        }
    }

    /// Four-way rotation between a leveraged risk leg, a leveraged hedge leg and cash.
    pub fn four_way_rotation() -> Self {
        Self::new()
            .with(
                Regime::BothAbove,
                Allocation {
                    sleeves: vec![
                        Sleeve::asset(AssetRole::Risk, 0.9, 3.0),
                        Sleeve::asset(AssetRole::Hedge, 0.2, 3.0),
                    ],
                },
            )
            .with(
                Regime::PrimaryAboveOnly,
                Allocation::single(Sleeve::asset(AssetRole::Risk, 1.1, 3.0)),
            )
            .with(
                Regime::SecondaryAboveOnly,
                Allocation {
                    sleeves: vec![
                        Sleeve::asset(AssetRole::Hedge, 0.5, 2.0),
                        Sleeve::cash(0.5),
                    ],
                },
            )
            .with(Regime::BothBelow, Allocation::single(Sleeve::cash(1.0)))
    }

    /// Default table for a classifier when none is configured.
    pub fn default_for(classifier: Classifier, sense: PositionSense, risk_leverage: f64) -> Self {
        match classifier {
            Classifier::Single => Self::signal_switch(sense, risk_leverage),
            Classifier::Pair => Self::four_way_rotation(),
        }
    }
}

/// A sleeve of an extra asset blended into every regime while that asset is
/// above its own moving average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TiltOverlay {
    pub weight: f64,
    pub leverage: f64,
}

impl TiltOverlay {
    /// `(1 - alloc) * base + alloc * tilt_return * leverage`, `alloc` being the
    /// weight when `active` and 0 otherwise.
    pub fn blend(&self, base: f64, tilt_return: f64, active: bool) -> f64 {
        let alloc = if active { self.weight } else { 0.0 };
        (1.0 - alloc) * base + alloc * tilt_return * self.leverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::align;
    use crate::domain::price::PriceSeries;
    use chrono::NaiveDate;

    fn frame_with(risk: &[f64], hedge: &[f64]) -> AlignedFrame {
        let d = |i: usize| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64);
        let r = PriceSeries::from_observations("R", risk.iter().enumerate().map(|(i, &c)| (d(i), Some(c))));
        let h = PriceSeries::from_observations("H", hedge.iter().enumerate().map(|(i, &c)| (d(i), Some(c))));
        align(&[(AssetRole::Risk, &r), (AssetRole::Hedge, &h)], 1)
    }

    #[test]
    fn leveraged_weighted_sleeves() {
        // risk +1%, hedge +2%
        let frame = frame_with(&[100.0, 101.0], &[50.0, 51.0]);
        let alloc = Allocation {
            sleeves: vec![
                Sleeve::asset(AssetRole::Risk, 0.9, 3.0),
                Sleeve::asset(AssetRole::Hedge, 0.2, 3.0),
            ],
        };
        let r = alloc.daily_return(&frame, 0, &ReturnContext::default());
        assert!((r - (0.9 * 0.01 * 3.0 + 0.2 * 0.02 * 3.0)).abs() < 1e-12);
    }

    #[test]
    fn cash_sleeve_uses_fixed_rate() {
        let frame = frame_with(&[100.0, 150.0], &[50.0, 10.0]);
        let alloc = Allocation {
            sleeves: vec![Sleeve::asset(AssetRole::Hedge, 0.5, 2.0), Sleeve::cash(0.5)],
        };
        let ctx = ReturnContext {
            direction: Direction::Long,
            cash_return: 0.001,
        };
        let r = alloc.daily_return(&frame, 0, &ctx);
        assert!((r - (0.5 * -0.8 * 2.0 + 0.5 * 0.001)).abs() < 1e-12);
    }

    #[test]
    fn short_negates_risk_before_leverage() {
        let frame = frame_with(&[100.0, 102.0], &[50.0, 51.0]);
        let ctx = ReturnContext {
            direction: Direction::Short,
            cash_return: 0.0,
        };
        let risk = Allocation::single(Sleeve::asset(AssetRole::Risk, 1.0, 2.0));
        assert!((risk.daily_return(&frame, 0, &ctx) - (-0.04)).abs() < 1e-12);
        // the hedge leg is not affected by direction
        let hedge = Allocation::single(Sleeve::asset(AssetRole::Hedge, 1.0, 1.0));
        assert!((hedge.daily_return(&frame, 0, &ctx) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn initial_and_missing_regimes_are_flat() {
        let frame = frame_with(&[100.0, 110.0], &[50.0, 55.0]);
        let table = AllocationTable::signal_switch(PositionSense::Over, 1.0);
        let ctx = ReturnContext::default();
        assert_eq!(table.daily_return(Regime::Initial, &frame, 0, &ctx), 0.0);
        assert_eq!(table.daily_return(Regime::Below, &frame, 0, &ctx), 0.0);
        assert_eq!(table.daily_return(Regime::BothAbove, &frame, 0, &ctx), 0.0);
        assert!((table.daily_return(Regime::Above, &frame, 0, &ctx) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn under_sense_holds_risk_below() {
        let table = AllocationTable::signal_switch(PositionSense::Under, 3.0);
        assert!(table.get(Regime::Above).unwrap().is_flat());
        assert!((table.get(Regime::Below).unwrap().gross_exposure() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn four_way_rotation_exposures() {
        let table = AllocationTable::four_way_rotation();
        assert!((table.get(Regime::BothAbove).unwrap().gross_exposure() - 3.3).abs() < 1e-12);
        assert!((table.get(Regime::PrimaryAboveOnly).unwrap().gross_exposure() - 3.3).abs() < 1e-12);
        assert_eq!(table.get(Regime::BothBelow).unwrap().gross_exposure(), 0.0);
        assert_eq!(table.roles(), vec![AssetRole::Risk, AssetRole::Hedge]);
    }

    #[test]
    fn tilt_blend() {
        let tilt = TiltOverlay {
            weight: 0.1,
            leverage: 2.0,
        };
        assert!((tilt.blend(0.01, 0.05, true) - (0.9 * 0.01 + 0.1 * 0.1)).abs() < 1e-12);
        assert!((tilt.blend(0.01, 0.05, false) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn display_formula() {
        let alloc = Allocation {
            sleeves: vec![Sleeve::asset(AssetRole::Hedge, 0.5, 2.0), Sleeve::cash(0.5)],
        };
        assert_eq!(alloc.to_string(), "0.5*hedge@2 + 0.5*cash");
        assert_eq!(Allocation::flat().to_string(), "flat");
    }

    #[test]
    fn enum_parsing() {
        assert_eq!("Short".parse::<Direction>().unwrap(), Direction::Short);
        assert_eq!("over".parse::<PositionSense>().unwrap(), PositionSense::Over);
        assert!("sideways".parse::<Direction>().is_err());
        assert!("above".parse::<PositionSense>().is_err());
    }
}
