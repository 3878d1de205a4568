use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DataQualityFault;

/// One security holding as reported for a filing period.
///
/// `shares` and `market_value` are signed so that a bad source value can be
/// diagnosed instead of rejected at parse time. `market_value` is in whole
/// US dollars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub identifier: Option<String>,
    pub name: String,
    pub shares: i64,
    pub market_value: i64,
    #[serde(default)]
    pub security_class: Option<String>,
}

impl Position {
    pub fn new(name: impl Into<String>, shares: i64, market_value: i64) -> Self {
        Self {
            identifier: None,
            name: name.into(),
            shares,
            market_value,
            security_class: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.security_class = Some(class.into());
        self
    }

    /// Check the per-position invariants for a snapshot ending on `period`.
    pub fn validate(&self, period: NaiveDate) -> Result<(), DataQualityFault> {
        if self.shares < 0 {
            return Err(DataQualityFault::NegativeShares {
                period,
                name: self.name.clone(),
                shares: self.shares,
            });
        }
        if self.shares == 0 {
            return Err(DataQualityFault::ZeroShares {
                period,
                name: self.name.clone(),
            });
        }
        if self.market_value < 0 {
            return Err(DataQualityFault::NegativeValue {
                period,
                name: self.name.clone(),
                value: self.market_value,
            });
        }
        Ok(())
    }
}
