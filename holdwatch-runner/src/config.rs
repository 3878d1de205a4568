//! Run configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. CLI flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use holdwatch_core::{ComparisonConfig, PresentationMode};

/// Shortest message limit the renderer can still lay a line out in.
pub const MIN_MESSAGE_CHARS: usize = 40;

/// Errors from loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldwatchConfig {
    pub comparison: ComparisonConfig,
    pub presentation: PresentationConfig,
    pub tickers: TickerConfig,
}

/// How change sets are rendered and published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub mode: PresentationMode,
    /// Hard limit per published message, in characters.
    pub max_message_chars: usize,
    /// Entries shown per section.
    pub top_n: usize,
    /// Display name of the filer used in headers.
    pub manager: Option<String>,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            mode: PresentationMode::default(),
            max_message_chars: 280,
            top_n: 5,
            manager: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerConfig {
    /// CSV with `cusip,ticker` columns. Relative paths resolve against the
    /// directory of the config file.
    pub map_file: Option<PathBuf>,
}

impl HoldwatchConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(map), Some(base)) = (config.tickers.map_file.as_ref(), path.parent()) {
            if map.is_relative() {
                config.tickers.map_file = Some(base.join(map));
            }
        }
        Ok(config)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.presentation;
        if p.max_message_chars < MIN_MESSAGE_CHARS {
            return Err(ConfigError::Invalid(format!(
                "presentation.max_message_chars must be at least {MIN_MESSAGE_CHARS}, got {}",
                p.max_message_chars
            )));
        }
        if p.top_n == 0 {
            return Err(ConfigError::Invalid(
                "presentation.top_n must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holdwatch_core::IdentifierScheme;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = HoldwatchConfig::from_toml("").unwrap();
        assert_eq!(config, HoldwatchConfig::default());
        assert_eq!(config.comparison.threshold.value(), 0.05);
        assert_eq!(config.presentation.max_message_chars, 280);
        assert_eq!(config.presentation.top_n, 5);
        assert_eq!(config.presentation.mode, PresentationMode::FullThread);
    }

    #[test]
    fn full_file_parses() {
        let config = HoldwatchConfig::from_toml(
            r#"
            [comparison]
            threshold = 0.1
            identifier_scheme = "isin"

            [presentation]
            mode = "single-summary"
            max_message_chars = 500
            top_n = 3
            manager = "Atreides Management"

            [tickers]
            map_file = "/etc/holdwatch/tickers.csv"
            "#,
        )
        .unwrap();
        assert_eq!(config.comparison.threshold.value(), 0.1);
        assert_eq!(config.comparison.identifier_scheme, IdentifierScheme::Isin);
        assert_eq!(config.presentation.mode, PresentationMode::SingleSummary);
        assert_eq!(config.presentation.max_message_chars, 500);
        assert_eq!(config.presentation.top_n, 3);
        assert_eq!(
            config.presentation.manager.as_deref(),
            Some("Atreides Management")
        );
        assert_eq!(
            config.tickers.map_file,
            Some(PathBuf::from("/etc/holdwatch/tickers.csv"))
        );
    }

    #[test]
    fn negative_threshold_is_a_parse_error() {
        let err = HoldwatchConfig::from_toml("[comparison]\nthreshold = -0.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = HoldwatchConfig::from_toml("[presentation]\nmode = \"carrier-pigeon\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn tiny_message_limit_is_rejected() {
        let err =
            HoldwatchConfig::from_toml("[presentation]\nmax_message_chars = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let err = HoldwatchConfig::from_toml("[presentation]\ntop_n = 0\n").unwrap_err();
        assert!(err.to_string().contains("top_n"));
    }

    #[test]
    fn relative_map_file_resolves_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holdwatch.toml");
        std::fs::write(&path, "[tickers]\nmap_file = \"tickers.csv\"\n").unwrap();
        let config = HoldwatchConfig::from_file(&path).unwrap();
        assert_eq!(config.tickers.map_file, Some(dir.path().join("tickers.csv")));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = HoldwatchConfig::from_file(Path::new("/nonexistent/holdwatch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/holdwatch.toml"));
    }
}
