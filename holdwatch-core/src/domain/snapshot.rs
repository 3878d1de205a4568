use chrono::{Datelike, NaiveDate};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::domain::Position;
use crate::error::DataQualityFault;
use crate::identity::{IdentifierScheme, IdentityKey, IdentityResolver};

/// All positions reported for one filing period.
///
/// Built once from source data and never mutated afterwards. Positions are
/// keyed by resolved identity and kept in key order, so iteration and derived
/// sums do not depend on the order the source listed them in.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    period_end: NaiveDate,
    manager: Option<String>,
    accession: Option<String>,
    scheme: IdentifierScheme,
    positions: BTreeMap<IdentityKey, Position>,
}

impl Snapshot {
    /// Validate `positions` and resolve their identities.
    ///
    /// Fails on the first position that breaks an invariant, or when two
    /// positions resolve to the same identity.
    pub fn new(
        period_end: NaiveDate,
        positions: Vec<Position>,
        resolver: &IdentityResolver,
    ) -> Result<Self, DataQualityFault> {
        if !is_quarter_end(period_end) {
            return Err(DataQualityFault::MisalignedPeriod { period: period_end });
        }

        let mut keyed = BTreeMap::new();
        let mut total: i64 = 0;
        for position in positions {
            position.validate(period_end)?;
            total = total
                .checked_add(position.market_value)
                .ok_or(DataQualityFault::ValueOverflow { period: period_end })?;
            let key = resolver.resolve(&position).map_err(|u| {
                DataQualityFault::UnresolvableIdentity {
                    period: period_end,
                    name: u.name,
                }
            })?;
            match keyed.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
                Entry::Occupied(existing) => {
                    return Err(DataQualityFault::DuplicateIdentity {
                        period: period_end,
                        key: existing.key().to_string(),
                        first: existing.get().name.clone(),
                        second: position.name,
                    });
                }
            }
        }

        Ok(Self {
            period_end,
            manager: None,
            accession: None,
            scheme: resolver.scheme(),
            positions: keyed,
        })
    }

    /// A snapshot with no positions.
    pub fn empty(
        period_end: NaiveDate,
        resolver: &IdentityResolver,
    ) -> Result<Self, DataQualityFault> {
        Self::new(period_end, Vec::new(), resolver)
    }

    /// Attach filer metadata carried for display only.
    pub fn with_metadata(mut self, manager: Option<String>, accession: Option<String>) -> Self {
        self.manager = manager;
        self.accession = accession;
        self
    }

    pub fn period_end(&self) -> NaiveDate {
        self.period_end
    }

    pub fn manager(&self) -> Option<&str> {
        self.manager.as_deref()
    }

    pub fn accession(&self) -> Option<&str> {
        self.accession.as_deref()
    }

    pub fn scheme(&self) -> IdentifierScheme {
        self.scheme
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&Position> {
        self.positions.get(key)
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.positions.contains_key(key)
    }

    /// Positions in identity-key order.
    pub fn positions(&self) -> impl Iterator<Item = (&IdentityKey, &Position)> {
        self.positions.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.positions.keys()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Sum of market values, recomputed on every call.
    ///
    /// Construction rejects snapshots whose sum would overflow.
    pub fn total_value(&self) -> i64 {
        self.positions.values().map(|p| p.market_value).sum()
    }
}

/// Mar 31, Jun 30, Sep 30 or Dec 31.
pub fn is_quarter_end(date: NaiveDate) -> bool {
    matches!((date.month(), date.day()), (3, 31) | (6, 30) | (9, 30) | (12, 31))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q2() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(IdentifierScheme::Cusip)
    }

    #[test]
    fn total_value_is_derived() {
        let snap = Snapshot::new(
            q2(),
            vec![
                Position::new("Apple Inc", 10, 2_000).with_identifier("037833100"),
                Position::new("Microsoft", 5, 2_500).with_identifier("594918104"),
            ],
            &resolver(),
        )
        .unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.total_value(), 4_500);
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = Position::new("Apple Inc", 10, 2_000).with_identifier("037833100");
        let b = Position::new("Microsoft", 5, 2_500).with_identifier("594918104");
        let s1 = Snapshot::new(q2(), vec![a.clone(), b.clone()], &resolver()).unwrap();
        let s2 = Snapshot::new(q2(), vec![b, a], &resolver()).unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn duplicate_identity_names_both_positions() {
        let err = Snapshot::new(
            q2(),
            vec![
                Position::new("Acme Corp.", 10, 100),
                Position::new("ACME CORP", 20, 200),
            ],
            &resolver(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            DataQualityFault::DuplicateIdentity {
                period: q2(),
                key: "name:acme corp".into(),
                first: "Acme Corp.".into(),
                second: "ACME CORP".into(),
            }
        );
    }

    #[test]
    fn misaligned_period_is_rejected() {
        let mid = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
        assert_eq!(
            Snapshot::empty(mid, &resolver()),
            Err(DataQualityFault::MisalignedPeriod { period: mid })
        );
    }

    #[test]
    fn quarter_ends() {
        for (m, d) in [(3, 31), (6, 30), (9, 30), (12, 31)] {
            assert!(is_quarter_end(NaiveDate::from_ymd_opt(2024, m, d).unwrap()));
        }
        assert!(!is_quarter_end(NaiveDate::from_ymd_opt(2024, 6, 29).unwrap()));
    }

    #[test]
    fn invalid_position_aborts_construction() {
        let err = Snapshot::new(q2(), vec![Position::new("Gone", 0, 0)], &resolver());
        assert!(matches!(err, Err(DataQualityFault::ZeroShares { .. })));
    }

    #[test]
    fn overflowing_total_value_is_rejected() {
        let half = i64::MAX / 2 + 1;
        let err = Snapshot::new(
            q2(),
            vec![Position::new("Alpha", 1, half), Position::new("Beta", 1, half)],
            &resolver(),
        );
        assert_eq!(err, Err(DataQualityFault::ValueOverflow { period: q2() }));

        let at_limit = Snapshot::new(
            q2(),
            vec![
                Position::new("Alpha", 1, i64::MAX - 1),
                Position::new("Beta", 1, 1),
            ],
            &resolver(),
        )
        .unwrap();
        assert_eq!(at_limit.total_value(), i64::MAX);
    }

    #[test]
    fn unresolvable_position_names_the_period() {
        let err = Snapshot::new(q2(), vec![Position::new("!!!", 1, 1)], &resolver());
        assert_eq!(
            err,
            Err(DataQualityFault::UnresolvableIdentity {
                period: q2(),
                name: "!!!".into()
            })
        );
    }
}
