//! Holdwatch Core: the holdings comparison engine.
//!
//! Given the positions a manager reported for two consecutive quarters, this
//! crate decides which securities are the same, classifies every one of them
//! and ranks the result for presentation:
//! - Domain types (positions, snapshots, change entries, change sets)
//! - Identity resolver with identifier and name fallback paths
//! - Threshold classifier
//! - Comparator and ranker
//!
//! Everything here is pure and synchronous; I/O lives in `holdwatch-runner`.

pub mod classify;
pub mod compare;
pub mod domain;
pub mod error;
pub mod identity;
pub mod presentation;
pub mod rank;

pub use classify::{categorize, Classifier, Threshold};
pub use compare::{compare, Comparator, ComparisonConfig};
pub use domain::{
    CategoryCounts, ChangeCategory, ChangeEntry, ChangeSet, PercentChange, Position, Snapshot,
};
pub use error::{CompareError, ContractViolation, DataQualityFault};
pub use identity::{IdentifierScheme, IdentityKey, IdentityResolver};
pub use presentation::PresentationMode;
pub use rank::{rank, rank_order};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: comparisons of independent snapshot pairs can run
    /// on separate threads with no coordination.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<Position>();
        require_sync::<Position>();
        require_send::<Snapshot>();
        require_sync::<Snapshot>();
        require_send::<ChangeEntry>();
        require_sync::<ChangeEntry>();
        require_send::<ChangeSet>();
        require_sync::<ChangeSet>();
        require_send::<Comparator>();
        require_sync::<Comparator>();
        require_send::<IdentityResolver>();
        require_sync::<IdentityResolver>();
        require_send::<CompareError>();
        require_sync::<CompareError>();
    }

    #[test]
    fn default_config_uses_five_percent_and_cusips() {
        let config = ComparisonConfig::default();
        assert_eq!(config.threshold.value(), 0.05);
        assert_eq!(config.identifier_scheme, IdentifierScheme::Cusip);
    }
}
