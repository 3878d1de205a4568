//! Property tests for message rendering.
//!
//! 1. Split pieces never exceed the limit and lose no text
//! 2. Every rendered thread message fits the limit, whatever the portfolio

use chrono::NaiveDate;
use proptest::prelude::*;

use holdwatch_core::{compare, ComparisonConfig, IdentityResolver, Position, Snapshot};
use holdwatch_runner::{render_thread, split_message, RenderOptions, TickerMap};

fn arb_text() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-zA-Z0-9 $%é]{0,120}", 0..20).prop_map(|lines| lines.join("\n"))
}

fn arb_book() -> impl Strategy<Value = Vec<(String, i64, i64)>> {
    let name = "[A-Z][a-z]{2,40}( [A-Z][a-z]{1,20}){0,3}";
    prop::collection::btree_map(name, (1i64..5_000_000, 0i64..9_000_000_000), 0..30)
        .prop_map(|m| m.into_iter().map(|(n, (s, v))| (n, s, v)).collect())
}

fn snapshot(period: NaiveDate, book: &[(String, i64, i64)]) -> Snapshot {
    let positions = book
        .iter()
        .map(|(name, shares, value)| Position::new(name.clone(), *shares, *value))
        .collect();
    Snapshot::new(period, positions, &IdentityResolver::default()).unwrap()
}

proptest! {
    #[test]
    fn split_respects_limit_and_keeps_text(text in arb_text(), max in 40usize..300) {
        let pieces = split_message(&text, max);
        for p in &pieces {
            prop_assert!(p.chars().count() <= max);
        }
        let squash = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
        prop_assert_eq!(squash(&pieces.concat()), squash(&text));
    }

    #[test]
    fn thread_messages_fit(
        prev in arb_book(),
        curr in arb_book(),
        max in 40usize..300,
        top_n in 1usize..8,
    ) {
        let q2 = NaiveDate::from_ymd_opt(2025, 6, 30).unwrap();
        let q3 = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
        let (p, c) = (snapshot(q2, &prev), snapshot(q3, &curr));
        let changes = compare(&p, &c, ComparisonConfig::default()).unwrap();
        let opts = RenderOptions {
            manager: Some("Atreides Management".into()),
            top_n,
            max_message_chars: max,
        };
        let messages = render_thread(&changes, &TickerMap::new(), &opts);
        prop_assert!(!messages.is_empty());
        for m in &messages {
            prop_assert!(m.chars().count() <= max);
            prop_assert!(!m.is_empty());
        }
    }
}
