//! Ranker: total presentation order over change entries.
//!
//! Keys, in order:
//! 1. category precedence (NEW, CLOSED, INCREASED, DECREASED, UNCHANGED)
//! 2. absolute `value_delta`, largest first
//! 3. `display_name`, ascending
//! 4. `identity_key`, ascending (unique, so no two entries ever tie)

use std::cmp::Ordering;

use crate::domain::ChangeEntry;

pub fn rank_order(a: &ChangeEntry, b: &ChangeEntry) -> Ordering {
    a.category
        .precedence()
        .cmp(&b.category.precedence())
        .then_with(|| b.value_delta.unsigned_abs().cmp(&a.value_delta.unsigned_abs()))
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.identity_key.cmp(&b.identity_key))
}

/// Sort entries into presentation order in place.
pub fn rank(entries: &mut [ChangeEntry]) {
    entries.sort_by(rank_order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classifier, Threshold};
    use crate::domain::{ChangeCategory, Position};
    use crate::identity::IdentityResolver;

    fn entry(
        name: &str,
        previous: Option<(i64, i64)>,
        current: Option<(i64, i64)>,
    ) -> ChangeEntry {
        let p = previous.map(|(s, v)| Position::new(name, s, v));
        let c = current.map(|(s, v)| Position::new(name, s, v));
        let key = IdentityResolver::default()
            .resolve(c.as_ref().or(p.as_ref()).unwrap())
            .unwrap();
        Classifier::new(Threshold::default(), 1, 1)
            .classify(&key, p.as_ref(), c.as_ref())
            .unwrap()
    }

    #[test]
    fn category_precedence_beats_magnitude() {
        let mut entries = vec![
            entry("Decreased Co", Some((100, 4_000_000)), Some((50, 2_000_000))),
            entry("New Co", None, Some((100, 10_000_000))),
            entry("Closed Co", Some((100, 1_000_000)), None),
            entry("Increased Co", Some((100, 5_000_000)), Some((200, 10_000_000))),
        ];
        rank(&mut entries);
        let order: Vec<ChangeCategory> = entries.iter().map(|e| e.category).collect();
        assert_eq!(
            order,
            vec![
                ChangeCategory::New,
                ChangeCategory::Closed,
                ChangeCategory::Increased,
                ChangeCategory::Decreased,
            ]
        );
    }

    #[test]
    fn bigger_dollar_moves_first_within_category() {
        let mut entries = vec![
            entry("Small", None, Some((10, 1_000))),
            entry("Large", None, Some((10, 9_000))),
            entry("Medium", None, Some((10, 5_000))),
        ];
        rank(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Large", "Medium", "Small"]);
    }

    #[test]
    fn magnitude_ignores_sign() {
        let mut entries = vec![
            entry("Down small", Some((100, 1_000)), Some((50, 500))),
            entry("Down big", Some((100, 9_000)), Some((50, 1_000))),
        ];
        rank(&mut entries);
        assert_eq!(entries[0].display_name, "Down big");
    }

    #[test]
    fn equal_moves_fall_back_to_name() {
        let mut entries = vec![
            entry("Zeta", None, Some((10, 1_000))),
            entry("Alpha", None, Some((10, 1_000))),
            entry("Mu", None, Some((10, 1_000))),
        ];
        rank(&mut entries);
        let names: Vec<&str> = entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Mu", "Zeta"]);
    }

    #[test]
    fn identical_names_fall_back_to_identity_key() {
        let a = Position::new("Acme", 10, 1_000).with_identifier("037833100");
        let b = Position::new("Acme", 10, 1_000).with_identifier("594918104");
        let resolver = IdentityResolver::default();
        let classifier = Classifier::new(Threshold::default(), 0, 2_000);
        let ea = classifier
            .classify(&resolver.resolve(&a).unwrap(), None, Some(&a))
            .unwrap();
        let eb = classifier
            .classify(&resolver.resolve(&b).unwrap(), None, Some(&b))
            .unwrap();

        let mut forward = vec![ea.clone(), eb.clone()];
        let mut backward = vec![eb, ea];
        rank(&mut forward);
        rank(&mut backward);
        assert_eq!(forward, backward);
        assert_eq!(forward[0].identity_key.as_str(), "id:03783310");
    }
}
