//! Snapshot loading from local filing extracts.
//!
//! A [`SnapshotSource`] yields a [`RawSnapshot`]: the period end plus the
//! positions exactly as listed. Turning that into a core [`Snapshot`] is where
//! validation and identity resolution happen. Two formats are supported:
//! - JSON documents with the period and filer metadata inline
//! - CSV info tables, with the period taken from the caller or from a
//!   `YYYY-MM-DD` date in the file name
//!
//! Optional row consolidation runs before the core sees the positions.
//! 13F info tables split one holding across other-manager rows, and the
//! core treats any two rows resolving to one identity as a fault.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use holdwatch_core::identity::{normalize_identifier, normalize_name};
use holdwatch_core::{DataQualityFault, IdentityResolver, Position, Snapshot};

/// Errors from the loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("no period end for {path}: pass one explicitly or put a YYYY-MM-DD date in the file name")]
    MissingPeriod { path: PathBuf },

    #[error("unsupported snapshot format: {path} (expected .json or .csv)")]
    UnsupportedFormat { path: PathBuf },

    #[error("two snapshot files in {dir} report period {period}")]
    DuplicatePeriod { dir: PathBuf, period: NaiveDate },

    #[error(transparent)]
    DataQuality(#[from] DataQualityFault),
}

/// Options controlling how snapshot files are read.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Sum rows sharing identifier, name and class before resolution.
    pub consolidate_rows: bool,
    /// Period end for CSV files; overrides any date in the file name.
    pub period_end: Option<NaiveDate>,
}

/// Positions for one period, as listed in the source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSnapshot {
    pub period_end: NaiveDate,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub accession: Option<String>,
    #[serde(default)]
    pub positions: Vec<Position>,
}

impl RawSnapshot {
    /// Validate and resolve into a core snapshot.
    pub fn into_snapshot(
        self,
        resolver: &IdentityResolver,
        opts: &LoadOptions,
    ) -> Result<Snapshot, LoadError> {
        let listed = self.positions.len();
        let positions = if opts.consolidate_rows {
            consolidate_rows(self.period_end, self.positions)?
        } else {
            self.positions
        };
        if positions.len() < listed {
            warn!(
                period = %self.period_end,
                rows = listed,
                positions = positions.len(),
                "consolidated split rows"
            );
        }

        let snapshot = Snapshot::new(self.period_end, positions, resolver)?
            .with_metadata(self.manager, self.accession);
        let by_name = snapshot.keys().filter(|k| k.is_name_fallback()).count();
        if by_name > 0 {
            warn!(
                period = %snapshot.period_end(),
                count = by_name,
                "positions matched by name instead of identifier"
            );
        }
        Ok(snapshot)
    }
}

/// Anything that can produce the raw positions for one period.
pub trait SnapshotSource {
    /// Human-readable origin, for logs and error context.
    fn describe(&self) -> String;

    fn load(&self) -> Result<RawSnapshot, LoadError>;
}

// ─── JSON ───────────────────────────────────────────────────────────

/// `{ period_end, manager?, accession?, positions: [...] }`
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RawSnapshot, LoadError> {
        let content = read(&self.path)?;
        serde_json::from_str(&content).map_err(|source| LoadError::Json {
            path: self.path.clone(),
            source,
        })
    }
}

// ─── CSV ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CsvRow {
    identifier: Option<String>,
    name: String,
    security_class: Option<String>,
    shares: i64,
    market_value: i64,
}

impl From<CsvRow> for Position {
    fn from(row: CsvRow) -> Self {
        Position {
            identifier: row.identifier,
            name: row.name,
            shares: row.shares,
            market_value: row.market_value,
            security_class: row.security_class,
        }
    }
}

/// Header: `identifier,name,security_class,shares,market_value`.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    period_end: Option<NaiveDate>,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            period_end: None,
        }
    }

    pub fn with_period(mut self, period_end: NaiveDate) -> Self {
        self.period_end = Some(period_end);
        self
    }
}

impl SnapshotSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RawSnapshot, LoadError> {
        let period_end = self
            .period_end
            .or_else(|| period_from_file_name(&self.path))
            .ok_or_else(|| LoadError::MissingPeriod {
                path: self.path.clone(),
            })?;

        let csv_err = |source| LoadError::Csv {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(csv_err)?;
        let mut positions = Vec::new();
        for row in reader.deserialize::<CsvRow>() {
            positions.push(Position::from(row.map_err(csv_err)?));
        }

        Ok(RawSnapshot {
            period_end,
            manager: None,
            accession: None,
            positions,
        })
    }
}

/// First `YYYY-MM-DD` date embedded in the file stem.
pub fn period_from_file_name(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    (0..stem.len())
        .filter(|&i| stem.is_char_boundary(i) && stem.is_char_boundary(i + 10))
        .filter_map(|i| stem.get(i..i + 10))
        .find_map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

// ─── Dispatch ───────────────────────────────────────────────────────

/// Pick a source from the file extension.
pub fn source_for_path(
    path: &Path,
    opts: &LoadOptions,
) -> Result<Box<dyn SnapshotSource>, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => Ok(Box::new(JsonFileSource::new(path))),
        Some("csv") => {
            let source = CsvFileSource::new(path);
            Ok(Box::new(match opts.period_end {
                Some(period) => source.with_period(period),
                None => source,
            }))
        }
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Load, validate and resolve one snapshot file.
pub fn load_snapshot(
    path: &Path,
    resolver: &IdentityResolver,
    opts: &LoadOptions,
) -> Result<Snapshot, LoadError> {
    let source = source_for_path(path, opts)?;
    let raw = source.load()?;
    debug!(
        source = %source.describe(),
        period = %raw.period_end,
        rows = raw.positions.len(),
        "loaded snapshot"
    );
    raw.into_snapshot(resolver, opts)
}

/// Every `.json` / `.csv` snapshot in `dir`, sorted by period end.
///
/// Periods come from the files themselves, so `opts.period_end` is ignored.
pub fn load_directory(
    dir: &Path,
    resolver: &IdentityResolver,
    opts: &LoadOptions,
) -> Result<Vec<Snapshot>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let supported = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("csv"));
        if path.is_file() && supported {
            paths.push(path);
        }
    }
    paths.sort();

    let file_opts = LoadOptions {
        period_end: None,
        ..opts.clone()
    };
    let mut snapshots = Vec::with_capacity(paths.len());
    for path in &paths {
        snapshots.push(load_snapshot(path, resolver, &file_opts)?);
    }
    snapshots.sort_by_key(Snapshot::period_end);
    if let Some(pair) = snapshots
        .windows(2)
        .find(|w| w[0].period_end() == w[1].period_end())
    {
        return Err(LoadError::DuplicatePeriod {
            dir: dir.to_path_buf(),
            period: pair[0].period_end(),
        });
    }

    info!(dir = %dir.display(), snapshots = snapshots.len(), "loaded snapshot directory");
    Ok(snapshots)
}

/// Sum rows that share identifier, name and class, keeping first-seen order.
///
/// Fails when a summed share count or market value overflows.
pub fn consolidate_rows(
    period: NaiveDate,
    positions: Vec<Position>,
) -> Result<Vec<Position>, DataQualityFault> {
    let mut index: HashMap<(Option<String>, String, Option<String>), usize> = HashMap::new();
    let mut merged: Vec<Position> = Vec::with_capacity(positions.len());
    for position in positions {
        let key = (
            position
                .identifier
                .as_deref()
                .map(normalize_identifier)
                .filter(|c| !c.is_empty()),
            normalize_name(&position.name),
            position
                .security_class
                .as_deref()
                .map(normalize_name)
                .filter(|c| !c.is_empty()),
        );
        match index.get(&key) {
            Some(&i) => {
                let target = &mut merged[i];
                let overflow = || DataQualityFault::RowSumOverflow {
                    period,
                    name: position.name.clone(),
                };
                target.shares = target.shares.checked_add(position.shares).ok_or_else(overflow)?;
                target.market_value = target
                    .market_value
                    .checked_add(position.market_value)
                    .ok_or_else(overflow)?;
            }
            None => {
                index.insert(key, merged.len());
                merged.push(position);
            }
        }
    }
    Ok(merged)
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn period_is_found_anywhere_in_the_stem() {
        assert_eq!(
            period_from_file_name(Path::new("/data/atreides_2025-09-30.csv")),
            Some(date(2025, 9, 30))
        );
        assert_eq!(
            period_from_file_name(Path::new("2025-06-30-infotable.csv")),
            Some(date(2025, 6, 30))
        );
        assert_eq!(period_from_file_name(Path::new("infotable.csv")), None);
        assert_eq!(period_from_file_name(Path::new("2025-13-45.csv")), None);
    }

    #[test]
    fn extension_selects_source() {
        let opts = LoadOptions::default();
        assert!(source_for_path(Path::new("a.json"), &opts).is_ok());
        assert!(source_for_path(Path::new("a.CSV"), &opts).is_ok());
        assert!(matches!(
            source_for_path(Path::new("a.xml"), &opts),
            Err(LoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn consolidation_sums_split_rows() {
        let rows = vec![
            Position::new("Apple Inc", 100, 1_000).with_identifier("037833100"),
            Position::new("Microsoft Corp", 50, 500).with_identifier("594918104"),
            Position::new("APPLE INC", 40, 400).with_identifier(" 037833100 "),
        ];
        let merged = consolidate_rows(date(2025, 9, 30), rows).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "Apple Inc");
        assert_eq!(merged[0].shares, 140);
        assert_eq!(merged[0].market_value, 1_400);
        assert_eq!(merged[1].shares, 50);
    }

    #[test]
    fn consolidation_keeps_classes_apart() {
        let rows = vec![
            Position::new("Apple Inc", 100, 1_000).with_identifier("037833100"),
            Position::new("Apple Inc", 10, 50)
                .with_identifier("037833100")
                .with_class("CALL"),
        ];
        assert_eq!(consolidate_rows(date(2025, 9, 30), rows).unwrap().len(), 2);
    }

    #[test]
    fn consolidation_overflow_is_a_fault() {
        let rows = vec![
            Position::new("Apple Inc", 100, i64::MAX - 10).with_identifier("037833100"),
            Position::new("Apple Inc", 40, 11).with_identifier("037833100"),
        ];
        assert_eq!(
            consolidate_rows(date(2025, 9, 30), rows),
            Err(DataQualityFault::RowSumOverflow {
                period: date(2025, 9, 30),
                name: "Apple Inc".into(),
            })
        );

        let raw = RawSnapshot {
            period_end: date(2025, 9, 30),
            manager: None,
            accession: None,
            positions: vec![
                Position::new("Apple Inc", i64::MAX, 1).with_identifier("037833100"),
                Position::new("Apple Inc", 1, 1).with_identifier("037833100"),
            ],
        };
        let opts = LoadOptions {
            consolidate_rows: true,
            ..LoadOptions::default()
        };
        assert!(matches!(
            raw.into_snapshot(&IdentityResolver::default(), &opts),
            Err(LoadError::DataQuality(DataQualityFault::RowSumOverflow { .. }))
        ));
    }

    #[test]
    fn split_rows_without_consolidation_are_a_fault() {
        let raw = RawSnapshot {
            period_end: date(2025, 9, 30),
            manager: None,
            accession: None,
            positions: vec![
                Position::new("Apple Inc", 100, 1_000).with_identifier("037833100"),
                Position::new("Apple Inc", 40, 400).with_identifier("037833100"),
            ],
        };
        let resolver = IdentityResolver::default();
        assert!(matches!(
            raw.clone().into_snapshot(&resolver, &LoadOptions::default()),
            Err(LoadError::DataQuality(DataQualityFault::DuplicateIdentity { .. }))
        ));

        let opts = LoadOptions {
            consolidate_rows: true,
            ..LoadOptions::default()
        };
        let snapshot = raw.into_snapshot(&resolver, &opts).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.total_value(), 1_400);
    }

    #[test]
    fn json_document_parses_with_optional_fields() {
        let raw: RawSnapshot = serde_json::from_str(
            r#"{
                "period_end": "2025-09-30",
                "manager": "Atreides Management",
                "positions": [
                    { "identifier": "037833100", "name": "Apple Inc", "shares": 10, "market_value": 2500 },
                    { "name": "Private Co", "shares": 5, "market_value": 100, "security_class": "COM" }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(raw.period_end, date(2025, 9, 30));
        assert_eq!(raw.manager.as_deref(), Some("Atreides Management"));
        assert_eq!(raw.accession, None);
        assert_eq!(raw.positions.len(), 2);
        assert_eq!(raw.positions[1].identifier, None);
    }
}
