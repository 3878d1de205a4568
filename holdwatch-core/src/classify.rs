//! Classifier: one matched pair of positions in, one change entry out.
//!
//! Rules, in priority order:
//! 1. only current → NEW
//! 2. only previous → CLOSED
//! 3. no share change → UNCHANGED
//! 4. `share_delta / previous_shares >= threshold` → INCREASED
//! 5. `share_delta / previous_shares <= -threshold` → DECREASED
//! 6. otherwise → UNCHANGED
//!
//! Shares decide the category; market value moves with prices between
//! periods and is reported alongside for display only.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{ChangeCategory, ChangeEntry, PercentChange, Position};
use crate::error::ContractViolation;
use crate::identity::IdentityKey;

/// Minimum relative share change that counts as a move.
///
/// A fraction of previous shares: 0.05 is 5%. Inclusive at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: f64 = 0.05;

    pub fn new(value: f64) -> Result<Self, ContractViolation> {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractViolation::InvalidThreshold { value });
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = ContractViolation;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> f64 {
        t.0
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0 * 100.0)
    }
}

/// Category for a position held in both periods.
pub fn categorize(
    previous_shares: i64,
    current_shares: i64,
    threshold: Threshold,
) -> ChangeCategory {
    if current_shares == previous_shares {
        return ChangeCategory::Unchanged;
    }
    match PercentChange::between(previous_shares, current_shares) {
        PercentChange::Ratio(r) if r >= threshold.value() => ChangeCategory::Increased,
        PercentChange::Ratio(r) if r <= -threshold.value() => ChangeCategory::Decreased,
        PercentChange::Ratio(_) => ChangeCategory::Unchanged,
        // Zero base cannot occur inside a validated snapshot.
        PercentChange::New => ChangeCategory::Increased,
        PercentChange::Closed => ChangeCategory::Decreased,
    }
}

/// Classifies matched pairs for one comparison run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classifier {
    threshold: Threshold,
    previous_total: i64,
    current_total: i64,
}

impl Classifier {
    /// `previous_total` / `current_total` are the snapshot totals used for weights.
    pub fn new(threshold: Threshold, previous_total: i64, current_total: i64) -> Self {
        Self {
            threshold,
            previous_total,
            current_total,
        }
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn classify(
        &self,
        key: &IdentityKey,
        previous: Option<&Position>,
        current: Option<&Position>,
    ) -> Result<ChangeEntry, ContractViolation> {
        let (category, percent_change) = match (previous, current) {
            (None, None) => return Err(ContractViolation::EmptyPair),
            (None, Some(_)) => (ChangeCategory::New, PercentChange::New),
            (Some(_), None) => (ChangeCategory::Closed, PercentChange::Closed),
            (Some(p), Some(c)) => (
                categorize(p.shares, c.shares, self.threshold),
                PercentChange::between(p.shares, c.shares),
            ),
        };

        // Prefer the current filing's descriptive fields.
        let latest = current.or(previous).ok_or(ContractViolation::EmptyPair)?;
        let previous_shares = previous.map_or(0, |p| p.shares);
        let current_shares = current.map_or(0, |c| c.shares);
        let previous_value = previous.map_or(0, |p| p.market_value);
        let current_value = current.map_or(0, |c| c.market_value);

        let value_percent_change = match category {
            ChangeCategory::New => PercentChange::New,
            ChangeCategory::Closed => PercentChange::Closed,
            _ => PercentChange::between(previous_value, current_value),
        };

        Ok(ChangeEntry {
            category,
            identity_key: key.clone(),
            display_name: latest.name.trim().to_string(),
            identifier: current
                .and_then(|c| c.identifier.clone())
                .or_else(|| previous.and_then(|p| p.identifier.clone())),
            security_class: current
                .and_then(|c| c.security_class.clone())
                .or_else(|| previous.and_then(|p| p.security_class.clone())),
            previous_shares,
            current_shares,
            previous_value,
            current_value,
            share_delta: current_shares - previous_shares,
            value_delta: current_value - previous_value,
            percent_change,
            value_percent_change,
            previous_weight: weight(previous_value, self.previous_total),
            current_weight: weight(current_value, self.current_total),
        })
    }
}

fn weight(value: i64, total: i64) -> f64 {
    if total == 0 {
        0.0
    } else {
        value as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentifierScheme, IdentityResolver};

    fn key_of(p: &Position) -> IdentityKey {
        IdentityResolver::new(IdentifierScheme::Cusip)
            .resolve(p)
            .unwrap()
    }

    fn msft(shares: i64, value: i64) -> Position {
        Position::new("Microsoft Corp", shares, value).with_identifier("594918104")
    }

    fn t(v: f64) -> Threshold {
        Threshold::new(v).unwrap()
    }

    #[test]
    fn threshold_rejects_bad_values() {
        assert!(Threshold::new(-0.01).is_err());
        assert!(Threshold::new(f64::NAN).is_err());
        assert!(Threshold::new(f64::INFINITY).is_err());
        assert_eq!(Threshold::new(0.0).unwrap().value(), 0.0);
        assert_eq!(Threshold::default().value(), 0.05);
    }

    #[test]
    fn threshold_deserializes_with_validation() {
        let ok: Threshold = serde_json::from_str("0.1").unwrap();
        assert_eq!(ok.value(), 0.1);
        assert!(serde_json::from_str::<Threshold>("-1.0").is_err());
    }

    #[test]
    fn boundary_is_inclusive() {
        assert_eq!(categorize(1_000, 1_050, t(0.05)), ChangeCategory::Increased);
        assert_eq!(categorize(1_000, 1_049, t(0.05)), ChangeCategory::Unchanged);
        assert_eq!(categorize(1_000, 950, t(0.05)), ChangeCategory::Decreased);
        assert_eq!(categorize(1_000, 951, t(0.05)), ChangeCategory::Unchanged);
    }

    #[test]
    fn zero_threshold_counts_every_move() {
        assert_eq!(categorize(1_000, 1_001, t(0.0)), ChangeCategory::Increased);
        assert_eq!(categorize(1_000, 999, t(0.0)), ChangeCategory::Decreased);
        assert_eq!(categorize(1_000, 1_000, t(0.0)), ChangeCategory::Unchanged);
    }

    #[test]
    fn new_position() {
        let c = msft(200, 80);
        let e = Classifier::new(t(0.05), 0, 80)
            .classify(&key_of(&c), None, Some(&c))
            .unwrap();
        assert_eq!(e.category, ChangeCategory::New);
        assert_eq!(e.previous_shares, 0);
        assert_eq!(e.share_delta, 200);
        assert_eq!(e.percent_change, PercentChange::New);
        assert_eq!(e.previous_weight, 0.0);
        assert_eq!(e.current_weight, 1.0);
    }

    #[test]
    fn closed_position() {
        let p = msft(500, 50);
        let e = Classifier::new(t(0.05), 100, 0)
            .classify(&key_of(&p), Some(&p), None)
            .unwrap();
        assert_eq!(e.category, ChangeCategory::Closed);
        assert_eq!(e.current_shares, 0);
        assert_eq!(e.current_value, 0);
        assert_eq!(e.value_delta, -50);
        assert_eq!(e.percent_change, PercentChange::Closed);
        assert_eq!(e.percent_change.as_ratio(), Some(-1.0));
        assert_eq!(e.previous_weight, 0.5);
        assert_eq!(e.current_weight, 0.0);
    }

    #[test]
    fn value_move_does_not_change_category() {
        // Shares flat, price doubled.
        let p = msft(1_000, 300);
        let c = msft(1_000, 600);
        let e = Classifier::new(t(0.05), 300, 600)
            .classify(&key_of(&c), Some(&p), Some(&c))
            .unwrap();
        assert_eq!(e.category, ChangeCategory::Unchanged);
        assert_eq!(e.value_percent_change, PercentChange::Ratio(1.0));
    }

    #[test]
    fn zero_value_base_uses_new_marker() {
        let p = msft(1_000, 0);
        let c = msft(1_100, 10);
        let e = Classifier::new(t(0.05), 0, 10)
            .classify(&key_of(&c), Some(&p), Some(&c))
            .unwrap();
        assert_eq!(e.category, ChangeCategory::Increased);
        assert_eq!(e.value_percent_change, PercentChange::New);
    }

    #[test]
    fn current_name_wins_for_display() {
        let p = Position::new("MICROSOFT CORP", 10, 1).with_identifier("594918104");
        let c = Position::new(" Microsoft Corporation ", 10, 1).with_identifier("594918104");
        let e = Classifier::new(t(0.05), 1, 1)
            .classify(&key_of(&c), Some(&p), Some(&c))
            .unwrap();
        assert_eq!(e.display_name, "Microsoft Corporation");
    }

    #[test]
    fn threshold_displays_as_rounded_percent() {
        assert_eq!(Threshold::default().to_string(), "5.0%");
        assert_eq!(t(0.125).to_string(), "12.5%");
        assert_eq!(t(0.0).to_string(), "0.0%");
    }

    #[test]
    fn empty_pair_is_a_contract_violation() {
        let key = key_of(&msft(1, 1));
        assert_eq!(
            Classifier::new(t(0.05), 0, 0).classify(&key, None, None),
            Err(ContractViolation::EmptyPair)
        );
    }
}
