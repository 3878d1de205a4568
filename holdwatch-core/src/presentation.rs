//! Presentation modes a caller may request for a change set.
//!
//! The mode only selects how much of the ranked change set the publish side
//! renders; it never changes how the comparison is computed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresentationMode {
    /// A sequence of messages: header, holdings, then one section per category.
    #[default]
    FullThread,
    /// One message with the headline figures and the top buy and sell.
    SingleSummary,
    /// Local text report only; nothing is published.
    SummaryOnly,
}

impl PresentationMode {
    pub fn publishes(self) -> bool {
        !matches!(self, PresentationMode::SummaryOnly)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PresentationMode::FullThread => "full-thread",
            PresentationMode::SingleSummary => "single-summary",
            PresentationMode::SummaryOnly => "summary-only",
        }
    }
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresentationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "full-thread" => Ok(PresentationMode::FullThread),
            "single-summary" => Ok(PresentationMode::SingleSummary),
            "summary-only" => Ok(PresentationMode::SummaryOnly),
            other => Err(format!(
                "unknown presentation mode '{other}' (full-thread, single-summary, summary-only)"
            )),
        }
    }
}
