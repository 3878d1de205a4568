//! Error taxonomy for the comparison engine.
//!
//! Two families, both fatal to a single comparison run:
//! - [`DataQualityFault`]: an input snapshot violates the data model.
//! - [`ContractViolation`]: the caller broke an API precondition.

use chrono::NaiveDate;
use thiserror::Error;

use crate::identity::IdentifierScheme;

/// An input snapshot violates the data model invariants.
///
/// Every variant names the offending snapshot by its period end so that a
/// caller comparing two filings can tell which side was bad.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataQualityFault {
    #[error(
        "snapshot {period}: '{first}' and '{second}' both resolve to identity '{key}'"
    )]
    DuplicateIdentity {
        period: NaiveDate,
        key: String,
        first: String,
        second: String,
    },

    #[error("snapshot {period}: position '{name}' has neither a usable identifier nor a name")]
    UnresolvableIdentity { period: NaiveDate, name: String },

    #[error("snapshot {period}: position '{name}' reports negative shares ({shares})")]
    NegativeShares {
        period: NaiveDate,
        name: String,
        shares: i64,
    },

    #[error("snapshot {period}: position '{name}' reports zero shares")]
    ZeroShares { period: NaiveDate, name: String },

    #[error("snapshot {period}: position '{name}' reports negative market value ({value})")]
    NegativeValue {
        period: NaiveDate,
        name: String,
        value: i64,
    },

    #[error("snapshot period {period} is not a calendar quarter end")]
    MisalignedPeriod { period: NaiveDate },

    #[error("snapshot {period}: total market value overflows")]
    ValueOverflow { period: NaiveDate },

    #[error("snapshot {period}: summed rows for '{name}' overflow")]
    RowSumOverflow { period: NaiveDate, name: String },
}

/// The caller broke a precondition of the comparison API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("classifier invoked with neither a previous nor a current position")]
    EmptyPair,

    #[error("current period {current} is not after previous period {previous}")]
    PeriodOrder {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("snapshot resolved with {found:?} identifiers, comparison expects {expected:?}")]
    SchemeMismatch {
        expected: IdentifierScheme,
        found: IdentifierScheme,
    },

    #[error("threshold must be a finite fraction >= 0, got {value}")]
    InvalidThreshold { value: f64 },
}

/// Any error a comparison run can end with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    #[error("data quality fault: {0}")]
    DataQuality(#[from] DataQualityFault),

    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),
}
