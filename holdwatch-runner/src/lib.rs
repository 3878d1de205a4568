//! Holdwatch Runner: everything around the comparison engine.
//!
//! This crate builds on `holdwatch-core` to provide:
//! - TOML configuration
//! - Snapshot loading from JSON and CSV filing extracts
//! - Ticker lookup and message rendering (thread, single, summary)
//! - Publishers (dry run, outbox directory)
//! - JSON / CSV exports and artifact directories
//! - Batch comparison over a filing history

pub mod batch;
pub mod config;
pub mod export;
pub mod publish;
pub mod render;
pub mod source;

pub use batch::compare_consecutive;
pub use config::{ConfigError, HoldwatchConfig, PresentationConfig, TickerConfig};
pub use export::{export_csv, export_json, import_json, load_artifacts, save_artifacts};
pub use publish::{DryRunPublisher, OutboxPublisher, PublishError, Publisher};
pub use render::{
    render_messages, render_single, render_summary, render_thread, split_message, RenderOptions,
    TickerMap,
};
pub use source::{
    consolidate_rows, load_directory, load_snapshot, source_for_path, CsvFileSource,
    JsonFileSource, LoadError, LoadOptions, RawSnapshot, SnapshotSource,
};
