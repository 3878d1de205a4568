use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::Threshold;
use crate::identity::IdentityKey;
use crate::rank::rank;

/// Change category, declared in presentation precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeCategory {
    New,
    Closed,
    Increased,
    Decreased,
    Unchanged,
}

impl ChangeCategory {
    pub const ALL: [ChangeCategory; 5] = [
        ChangeCategory::New,
        ChangeCategory::Closed,
        ChangeCategory::Increased,
        ChangeCategory::Decreased,
        ChangeCategory::Unchanged,
    ];

    /// Lower sorts first: new and closed positions are the most newsworthy.
    pub fn precedence(self) -> u8 {
        match self {
            ChangeCategory::New => 0,
            ChangeCategory::Closed => 1,
            ChangeCategory::Increased => 2,
            ChangeCategory::Decreased => 3,
            ChangeCategory::Unchanged => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChangeCategory::New => "new",
            ChangeCategory::Closed => "closed",
            ChangeCategory::Increased => "increased",
            ChangeCategory::Decreased => "decreased",
            ChangeCategory::Unchanged => "unchanged",
        }
    }

    /// Bought into: new or added to.
    pub fn is_buy(self) -> bool {
        matches!(self, ChangeCategory::New | ChangeCategory::Increased)
    }

    /// Sold out of: closed or trimmed.
    pub fn is_sell(self) -> bool {
        matches!(self, ChangeCategory::Closed | ChangeCategory::Decreased)
    }
}

impl fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Relative change over a previous base.
///
/// A zero base never divides: it yields [`PercentChange::New`]. A full exit is
/// [`PercentChange::Closed`] rather than a bare −100%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ratio", rename_all = "snake_case")]
pub enum PercentChange {
    New,
    Closed,
    Ratio(f64),
}

impl PercentChange {
    /// `(current - previous) / previous`, guarded against a zero base.
    pub fn between(previous: i64, current: i64) -> Self {
        match (previous, current) {
            (0, 0) => PercentChange::Ratio(0.0),
            (0, _) => PercentChange::New,
            (p, c) => PercentChange::Ratio((c - p) as f64 / p as f64),
        }
    }

    /// Numeric ratio where one exists; `Closed` is −1.0, `New` has none.
    pub fn as_ratio(self) -> Option<f64> {
        match self {
            PercentChange::New => None,
            PercentChange::Closed => Some(-1.0),
            PercentChange::Ratio(r) => Some(r),
        }
    }
}

impl fmt::Display for PercentChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PercentChange::New => f.write_str("new"),
            PercentChange::Closed => f.write_str("closed"),
            PercentChange::Ratio(r) => write!(f, "{:+.1}%", r * 100.0),
        }
    }
}

/// Classified difference for one security between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub category: ChangeCategory,
    pub identity_key: IdentityKey,
    pub display_name: String,
    pub identifier: Option<String>,
    pub security_class: Option<String>,

    pub previous_shares: i64,
    pub current_shares: i64,
    pub previous_value: i64,
    pub current_value: i64,
    pub share_delta: i64,
    pub value_delta: i64,

    /// Share-based; authoritative for the category.
    pub percent_change: PercentChange,
    /// Value-based; display only.
    pub value_percent_change: PercentChange,

    /// Fractions of each snapshot's total value.
    pub previous_weight: f64,
    pub current_weight: f64,
}

impl ChangeEntry {
    /// Change in portfolio weight, in fraction points.
    pub fn weight_change(&self) -> f64 {
        self.current_weight - self.previous_weight
    }

    pub fn is_held(&self) -> bool {
        self.current_shares > 0
    }
}

/// Number of entries in each category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub new: usize,
    pub closed: usize,
    pub increased: usize,
    pub decreased: usize,
    pub unchanged: usize,
}

impl CategoryCounts {
    pub fn get(&self, category: ChangeCategory) -> usize {
        match category {
            ChangeCategory::New => self.new,
            ChangeCategory::Closed => self.closed,
            ChangeCategory::Increased => self.increased,
            ChangeCategory::Decreased => self.decreased,
            ChangeCategory::Unchanged => self.unchanged,
        }
    }
}

/// Ordered, classified difference between two snapshots.
///
/// Built by the comparator or read back from JSON. Either way the entries are
/// ranked and `total_percent_change` is derived from the two totals; a
/// serialized value for it is ignored on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChangeSetRecord")]
pub struct ChangeSet {
    period_previous: NaiveDate,
    period_current: NaiveDate,
    threshold: Threshold,
    previous_total_value: i64,
    current_total_value: i64,
    total_percent_change: PercentChange,
    entries: Vec<ChangeEntry>,
}

/// Wire shape of a [`ChangeSet`] before ranking.
#[derive(Deserialize)]
struct ChangeSetRecord {
    period_previous: NaiveDate,
    period_current: NaiveDate,
    threshold: Threshold,
    previous_total_value: i64,
    current_total_value: i64,
    entries: Vec<ChangeEntry>,
}

impl From<ChangeSetRecord> for ChangeSet {
    fn from(r: ChangeSetRecord) -> Self {
        let mut entries = r.entries;
        rank(&mut entries);
        ChangeSet::new(
            r.period_previous,
            r.period_current,
            r.threshold,
            r.previous_total_value,
            r.current_total_value,
            entries,
        )
    }
}

impl ChangeSet {
    pub(crate) fn new(
        period_previous: NaiveDate,
        period_current: NaiveDate,
        threshold: Threshold,
        previous_total_value: i64,
        current_total_value: i64,
        entries: Vec<ChangeEntry>,
    ) -> Self {
        Self {
            period_previous,
            period_current,
            threshold,
            previous_total_value,
            current_total_value,
            total_percent_change: PercentChange::between(
                previous_total_value,
                current_total_value,
            ),
            entries,
        }
    }

    pub fn period_previous(&self) -> NaiveDate {
        self.period_previous
    }

    pub fn period_current(&self) -> NaiveDate {
        self.period_current
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn previous_total_value(&self) -> i64 {
        self.previous_total_value
    }

    pub fn current_total_value(&self) -> i64 {
        self.current_total_value
    }

    pub fn total_value_delta(&self) -> i64 {
        self.current_total_value - self.previous_total_value
    }

    pub fn total_percent_change(&self) -> PercentChange {
        self.total_percent_change
    }

    /// Ranked entries.
    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&ChangeEntry> {
        self.entries.iter().find(|e| &e.identity_key == key)
    }

    /// Entries of one category, in ranked order.
    pub fn in_category(&self, category: ChangeCategory) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter().filter(move |e| e.category == category)
    }

    pub fn counts(&self) -> CategoryCounts {
        let mut counts = CategoryCounts::default();
        for entry in &self.entries {
            match entry.category {
                ChangeCategory::New => counts.new += 1,
                ChangeCategory::Closed => counts.closed += 1,
                ChangeCategory::Increased => counts.increased += 1,
                ChangeCategory::Decreased => counts.decreased += 1,
                ChangeCategory::Unchanged => counts.unchanged += 1,
            }
        }
        counts
    }

    /// Number of entries that are not UNCHANGED.
    pub fn change_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category != ChangeCategory::Unchanged)
            .count()
    }

    pub fn has_changes(&self) -> bool {
        self.change_count() > 0
    }

    /// New and increased positions, largest weight gain first.
    pub fn top_buys(&self, n: usize) -> Vec<&ChangeEntry> {
        self.top_by(n, |e| e.category.is_buy(), |e| e.weight_change())
    }

    /// Closed and decreased positions, largest weight loss first.
    pub fn top_sells(&self, n: usize) -> Vec<&ChangeEntry> {
        self.top_by(n, |e| e.category.is_sell(), |e| -e.weight_change())
    }

    /// Positions still held, largest current weight first.
    pub fn top_holdings(&self, n: usize) -> Vec<&ChangeEntry> {
        self.top_by(n, ChangeEntry::is_held, |e| e.current_weight)
    }

    fn top_by(
        &self,
        n: usize,
        keep: impl Fn(&ChangeEntry) -> bool,
        score: impl Fn(&ChangeEntry) -> f64,
    ) -> Vec<&ChangeEntry> {
        let mut picked: Vec<&ChangeEntry> = self.entries.iter().filter(|e| keep(e)).collect();
        picked.sort_by(|a, b| {
            score(b)
                .total_cmp(&score(a))
                .then_with(|| a.display_name.cmp(&b.display_name))
                .then_with(|| a.identity_key.cmp(&b.identity_key))
        });
        picked.truncate(n);
        picked
    }

    /// BLAKE3 digest over every field, in entry order.
    ///
    /// Two runs that produce the same digest produced byte-identical output.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.period_previous.to_string().as_bytes());
        hasher.update(self.period_current.to_string().as_bytes());
        hasher.update(&self.threshold.value().to_bits().to_le_bytes());
        hasher.update(&self.previous_total_value.to_le_bytes());
        hasher.update(&self.current_total_value.to_le_bytes());
        hash_percent(&mut hasher, self.total_percent_change);
        for e in &self.entries {
            hasher.update(e.category.label().as_bytes());
            hasher.update(e.identity_key.as_str().as_bytes());
            hasher.update(&[0]);
            hasher.update(e.display_name.as_bytes());
            hasher.update(&[0]);
            for n in [
                e.previous_shares,
                e.current_shares,
                e.previous_value,
                e.current_value,
                e.share_delta,
                e.value_delta,
            ] {
                hasher.update(&n.to_le_bytes());
            }
            hash_percent(&mut hasher, e.percent_change);
            hash_percent(&mut hasher, e.value_percent_change);
            hasher.update(&e.previous_weight.to_bits().to_le_bytes());
            hasher.update(&e.current_weight.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

fn hash_percent(hasher: &mut blake3::Hasher, pct: PercentChange) {
    match pct {
        PercentChange::New => hasher.update(b"N"),
        PercentChange::Closed => hasher.update(b"C"),
        PercentChange::Ratio(r) => hasher.update(&r.to_bits().to_le_bytes()),
    };
}
