//! Market regimes derived from price vs. moving-average comparisons.
//!
//! A classifier maps the above/below-MA flags of one or two signal assets to a
//! [`Regime`]; a [`SwitchRule`] decides when the next regime is adopted.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Regime {
    /// Before the first decision. Earns nothing.
    Initial,
    /// Single signal above its MA.
    Above,
    /// Single signal at or below its MA.
    Below,
    BothAbove,
    PrimaryAboveOnly,
    SecondaryAboveOnly,
    BothBelow,
}

impl Regime {
    pub const SINGLE: [Regime; 2] = [Regime::Above, Regime::Below];
    pub const PAIR: [Regime; 4] = [
        Regime::BothAbove,
        Regime::PrimaryAboveOnly,
        Regime::SecondaryAboveOnly,
        Regime::BothBelow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Regime::Initial => "initial",
            Regime::Above => "above",
            Regime::Below => "below",
            Regime::BothAbove => "both_above",
            Regime::PrimaryAboveOnly => "primary_above_only",
            Regime::SecondaryAboveOnly => "secondary_above_only",
            Regime::BothBelow => "both_below",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initial" => Ok(Regime::Initial),
            "above" => Ok(Regime::Above),
            "below" => Ok(Regime::Below),
            "both_above" => Ok(Regime::BothAbove),
            "primary_above_only" => Ok(Regime::PrimaryAboveOnly),
            "secondary_above_only" => Ok(Regime::SecondaryAboveOnly),
            "both_below" => Ok(Regime::BothBelow),
            other => Err(format!("unknown regime '{other}'")),
        }
    }
}

/// Above-MA flags of the tracked signal assets on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalFlags {
    pub primary: bool,
    pub secondary: Option<bool>,
}

impl SignalFlags {
    pub fn single(primary: bool) -> Self {
        SignalFlags {
            primary,
            secondary: None,
        }
    }

    pub fn pair(primary: bool, secondary: bool) -> Self {
        SignalFlags {
            primary,
            secondary: Some(secondary),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    /// One signal asset: `Above` / `Below`.
    Single,
    /// Two signal assets: the four-way split.
    Pair,
}

impl Classifier {
    pub fn classify(&self, flags: SignalFlags) -> Regime {
        match (self, flags.secondary) {
            (Classifier::Pair, Some(secondary)) => match (flags.primary, secondary) {
                (true, true) => Regime::BothAbove,
                (true, false) => Regime::PrimaryAboveOnly,
                (false, true) => Regime::SecondaryAboveOnly,
                (false, false) => Regime::BothBelow,
            },
            _ => {
                if flags.primary {
                    Regime::Above
                } else {
                    Regime::Below
                }
            }
        }
    }

    pub fn regimes(&self) -> &'static [Regime] {
        match self {
            Classifier::Single => &Regime::SINGLE,
            Classifier::Pair => &Regime::PAIR,
        }
    }
}

/// When a newly classified regime is adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRule {
    /// Adopt the classification of the latest close every day.
    LagOne,
    /// Adopt a new classification only when today's flags equal yesterday's.
    Confirmed,
}

impl SwitchRule {
    /// Regime to adopt after today's close.
    pub fn next_regime(
        &self,
        classifier: Classifier,
        today: SignalFlags,
        yesterday: SignalFlags,
        current: Regime,
    ) -> Regime {
        match self {
            SwitchRule::LagOne => classifier.classify(today),
            SwitchRule::Confirmed => {
                if today == yesterday {
                    classifier.classify(today)
                } else {
                    current
                }
            }
        }
    }
}

impl FromStr for SwitchRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lag_one" | "lag-one" => Ok(SwitchRule::LagOne),
            "confirmed" => Ok(SwitchRule::Confirmed),
            other => Err(format!("expected lag_one or confirmed, got '{other}'")),
        }
    }
}

impl fmt::Display for SwitchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchRule::LagOne => f.write_str("lag_one"),
            SwitchRule::Confirmed => f.write_str("confirmed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_classification() {
        let c = Classifier::Pair;
        assert_eq!(c.classify(SignalFlags::pair(true, true)), Regime::BothAbove);
        assert_eq!(c.classify(SignalFlags::pair(true, false)), Regime::PrimaryAboveOnly);
        assert_eq!(c.classify(SignalFlags::pair(false, true)), Regime::SecondaryAboveOnly);
        assert_eq!(c.classify(SignalFlags::pair(false, false)), Regime::BothBelow);
    }

    #[test]
    fn single_classification() {
        let c = Classifier::Single;
        assert_eq!(c.classify(SignalFlags::single(true)), Regime::Above);
        assert_eq!(c.classify(SignalFlags::single(false)), Regime::Below);
    }

    #[test]
    fn confirmed_holds_on_disagreement() {
        let rule = SwitchRule::Confirmed;
        let next = rule.next_regime(
            Classifier::Pair,
            SignalFlags::pair(true, false),
            SignalFlags::pair(false, false),
            Regime::BothBelow,
        );
        assert_eq!(next, Regime::BothBelow);
    }

    #[test]
    fn confirmed_switches_on_agreement() {
        let rule = SwitchRule::Confirmed;
        let flags = SignalFlags::pair(true, false);
        let next = rule.next_regime(Classifier::Pair, flags, flags, Regime::BothBelow);
        assert_eq!(next, Regime::PrimaryAboveOnly);
    }

    #[test]
    fn confirmed_needs_both_flags_stable() {
        let next = SwitchRule::Confirmed.next_regime(
            Classifier::Pair,
            SignalFlags::pair(true, true),
            SignalFlags::pair(true, false),
            Regime::PrimaryAboveOnly,
        );
        assert_eq!(next, Regime::PrimaryAboveOnly);
    }

    #[test]
    fn lag_one_follows_today() {
        let next = SwitchRule::LagOne.next_regime(
            Classifier::Single,
            SignalFlags::single(true),
            SignalFlags::single(false),
            Regime::Below,
        );
        assert_eq!(next, Regime::Above);
    }

    #[test]
    fn regime_labels_round_trip() {
        for r in Regime::SINGLE.iter().chain(Regime::PAIR.iter()) {
            assert_eq!(r.label().parse::<Regime>().unwrap(), *r);
        }
        assert!("sideways".parse::<Regime>().is_err());
    }

    #[test]
    fn switch_rule_parse() {
        assert_eq!("confirmed".parse::<SwitchRule>().unwrap(), SwitchRule::Confirmed);
        assert_eq!("LAG_ONE".parse::<SwitchRule>().unwrap(), SwitchRule::LagOne);
        assert!("eventually".parse::<SwitchRule>().is_err());
    }
}
