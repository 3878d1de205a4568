//! Comparator: full diff between two snapshots.
//!
//! 1. Both snapshots are already keyed by resolved identity (collisions were
//!    rejected when they were built).
//! 2. Walk the union of identity keys.
//! 3. Classify each key's (previous, current) pair.
//! 4. Aggregate totals.
//! 5. Rank.
//!
//! Inputs are borrowed immutably and the output depends only on their
//! contents, never on the order positions were listed in.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::classify::{Classifier, Threshold};
use crate::domain::{ChangeSet, Snapshot};
use crate::error::{CompareError, ContractViolation};
use crate::identity::{IdentifierScheme, IdentityKey, IdentityResolver};
use crate::rank::rank;

/// Everything a comparison run is parameterized by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonConfig {
    #[serde(default)]
    pub threshold: Threshold,
    #[serde(default)]
    pub identifier_scheme: IdentifierScheme,
}

impl ComparisonConfig {
    pub fn new(threshold: Threshold, identifier_scheme: IdentifierScheme) -> Self {
        Self {
            threshold,
            identifier_scheme,
        }
    }

    /// Resolver to build snapshots with for this run.
    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(self.identifier_scheme)
    }
}

/// Compares snapshot pairs under one configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    config: ComparisonConfig,
}

impl Comparator {
    pub fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn compare(
        &self,
        previous: &Snapshot,
        current: &Snapshot,
    ) -> Result<ChangeSet, CompareError> {
        if current.period_end() <= previous.period_end() {
            return Err(ContractViolation::PeriodOrder {
                previous: previous.period_end(),
                current: current.period_end(),
            }
            .into());
        }
        let expected = self.config.identifier_scheme;
        for found in [previous.scheme(), current.scheme()] {
            if found != expected {
                return Err(ContractViolation::SchemeMismatch { expected, found }.into());
            }
        }

        let previous_total = previous.total_value();
        let current_total = current.total_value();
        let classifier = Classifier::new(self.config.threshold, previous_total, current_total);

        let keys: BTreeSet<&IdentityKey> = previous.keys().chain(current.keys()).collect();
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            entries.push(classifier.classify(key, previous.get(key), current.get(key))?);
        }
        rank(&mut entries);

        Ok(ChangeSet::new(
            previous.period_end(),
            current.period_end(),
            self.config.threshold,
            previous_total,
            current_total,
            entries,
        ))
    }
}

/// One-shot comparison with an explicit configuration.
pub fn compare(
    previous: &Snapshot,
    current: &Snapshot,
    config: ComparisonConfig,
) -> Result<ChangeSet, CompareError> {
    Comparator::new(config).compare(previous, current)
}
