//! Holdwatch CLI: quarter-over-quarter 13F holdings comparison.
//!
//! Commands:
//! - `compare`: diff two snapshot files, print a summary, publish messages
//! - `history`: diff every consecutive pair in a directory of snapshots
//! - `inspect`: load one snapshot and list its resolved positions

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use holdwatch_core::{
    Comparator, ComparisonConfig, IdentifierScheme, PresentationMode, Threshold,
};
use holdwatch_runner::render::{format_money, format_weight, quarter_label};
use holdwatch_runner::{
    compare_consecutive, load_directory, load_snapshot, render_messages, render_summary,
    save_artifacts, DryRunPublisher, HoldwatchConfig, LoadOptions, OutboxPublisher, Publisher,
    RenderOptions, TickerMap,
};

#[derive(Parser)]
#[command(
    name = "holdwatch",
    about = "Holdwatch: compare 13F holdings between two quarters"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two snapshot files and publish the result.
    Compare {
        /// Snapshot for the earlier quarter (.json or .csv).
        #[arg(long)]
        previous: PathBuf,

        /// Snapshot for the later quarter (.json or .csv).
        #[arg(long)]
        current: PathBuf,

        /// Period end for a CSV `--previous` without a date in its name.
        #[arg(long)]
        previous_period: Option<NaiveDate>,

        /// Period end for a CSV `--current` without a date in its name.
        #[arg(long)]
        current_period: Option<NaiveDate>,

        /// Relative share change that counts as a move (0.05 = 5%).
        #[arg(long)]
        threshold: Option<f64>,

        /// Identifier scheme: cusip, isin, any.
        #[arg(long)]
        scheme: Option<IdentifierScheme>,

        /// Presentation: full-thread, single-summary, summary-only.
        #[arg(long)]
        mode: Option<PresentationMode>,

        /// TOML config file. Flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// CSV with `cusip,ticker` columns.
        #[arg(long)]
        tickers: Option<PathBuf>,

        /// Write messages to this directory instead of printing them.
        #[arg(long)]
        outbox: Option<PathBuf>,

        /// Save change_set.json, changes.csv and messages.txt here.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Sum rows that share identifier, name and class.
        #[arg(long, default_value_t = false)]
        consolidate: bool,
    },
    /// Compare every consecutive quarter in a directory of snapshots.
    History {
        /// Directory of .json / .csv snapshot files.
        #[arg(long)]
        dir: PathBuf,

        /// Relative share change that counts as a move (0.05 = 5%).
        #[arg(long)]
        threshold: Option<f64>,

        /// TOML config file. Flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Compare pairs on all cores.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Sum rows that share identifier, name and class.
        #[arg(long, default_value_t = false)]
        consolidate: bool,
    },
    /// Load one snapshot and list its positions with resolved identity keys.
    Inspect {
        /// Snapshot file (.json or .csv).
        #[arg(long)]
        file: PathBuf,

        /// Period end for a CSV without a date in its name.
        #[arg(long)]
        period: Option<NaiveDate>,

        /// Identifier scheme: cusip, isin, any.
        #[arg(long)]
        scheme: Option<IdentifierScheme>,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Compare {
            previous,
            current,
            previous_period,
            current_period,
            threshold,
            scheme,
            mode,
            config,
            tickers,
            outbox,
            output_dir,
            consolidate,
        } => run_compare(CompareArgs {
            previous,
            current,
            previous_period,
            current_period,
            threshold,
            scheme,
            mode,
            config,
            tickers,
            outbox,
            output_dir,
            consolidate,
        }),
        Commands::History {
            dir,
            threshold,
            config,
            parallel,
            consolidate,
        } => run_history(&dir, threshold, config.as_deref(), parallel, consolidate),
        Commands::Inspect {
            file,
            period,
            scheme,
        } => run_inspect(&file, period, scheme),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file (or defaults) with command-line overrides applied.
fn load_config(
    path: Option<&Path>,
    threshold: Option<f64>,
    scheme: Option<IdentifierScheme>,
    mode: Option<PresentationMode>,
) -> Result<HoldwatchConfig> {
    let mut config = match path {
        Some(p) => HoldwatchConfig::from_file(p)?,
        None => HoldwatchConfig::default(),
    };
    if let Some(t) = threshold {
        config.comparison.threshold = Threshold::new(t)?;
    }
    if let Some(s) = scheme {
        config.comparison.identifier_scheme = s;
    }
    if let Some(m) = mode {
        config.presentation.mode = m;
    }
    Ok(config)
}

struct CompareArgs {
    previous: PathBuf,
    current: PathBuf,
    previous_period: Option<NaiveDate>,
    current_period: Option<NaiveDate>,
    threshold: Option<f64>,
    scheme: Option<IdentifierScheme>,
    mode: Option<PresentationMode>,
    config: Option<PathBuf>,
    tickers: Option<PathBuf>,
    outbox: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    consolidate: bool,
}

fn run_compare(args: CompareArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.threshold, args.scheme, args.mode)?;
    let comparison: ComparisonConfig = config.comparison;
    let resolver = comparison.resolver();

    let load = |path: &Path, period: Option<NaiveDate>| {
        let opts = LoadOptions {
            consolidate_rows: args.consolidate,
            period_end: period,
        };
        load_snapshot(path, &resolver, &opts)
            .with_context(|| format!("failed to load snapshot {}", path.display()))
    };
    let previous = load(&args.previous, args.previous_period)?;
    let current = load(&args.current, args.current_period)?;
    info!(
        previous = %previous.period_end(),
        previous_positions = previous.len(),
        current = %current.period_end(),
        current_positions = current.len(),
        "loaded snapshots"
    );

    let changes = Comparator::new(comparison).compare(&previous, &current)?;
    info!(
        entries = changes.len(),
        changes = changes.change_count(),
        fingerprint = %changes.fingerprint(),
        "compared snapshots"
    );

    let tickers_path = args.tickers.or_else(|| config.tickers.map_file.clone());
    let tickers = match tickers_path {
        Some(p) => TickerMap::from_csv_path(&p)
            .with_context(|| format!("failed to load ticker map {}", p.display()))?,
        None => TickerMap::new(),
    };

    let mut render_opts = RenderOptions::from(&config.presentation);
    if render_opts.manager.is_none() {
        render_opts.manager = current.manager().map(str::to_string);
    }
    let mode = config.presentation.mode;
    let messages = render_messages(&changes, mode, &tickers, &render_opts);

    if let Some(dir) = &args.output_dir {
        let run_dir = save_artifacts(&changes, &messages, dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    if !changes.has_changes() {
        info!("no significant changes, nothing to publish");
        return Ok(());
    }

    println!("{}", render_summary(&changes, 10));

    if !mode.publishes() {
        return Ok(());
    }

    let max = config.presentation.max_message_chars;
    let ids = match &args.outbox {
        Some(dir) => {
            OutboxPublisher::new(dir, changes.period_current().to_string(), max).publish(&messages)?
        }
        None => DryRunPublisher::stdout(max).publish(&messages)?,
    };
    info!(mode = %mode, messages = ids.len(), "published");
    Ok(())
}

fn run_history(
    dir: &Path,
    threshold: Option<f64>,
    config_path: Option<&Path>,
    parallel: bool,
    consolidate: bool,
) -> Result<()> {
    let config = load_config(config_path, threshold, None, None)?;
    let opts = LoadOptions {
        consolidate_rows: consolidate,
        period_end: None,
    };
    let snapshots = load_directory(dir, &config.comparison.resolver(), &opts)?;
    if snapshots.len() < 2 {
        warn!(found = snapshots.len(), "need at least two snapshots to compare");
        return Ok(());
    }

    let results = compare_consecutive(&snapshots, config.comparison, parallel)?;
    println!(
        "{:<9} {:<9} {:>10} {:>9} {:>4} {:>4} {:>4} {:>4} {:>4}",
        "from", "to", "value", "change", "new", "cls", "inc", "dec", "unch"
    );
    for cs in &results {
        let c = cs.counts();
        println!(
            "{:<9} {:<9} {:>10} {:>9} {:>4} {:>4} {:>4} {:>4} {:>4}",
            quarter_label(cs.period_previous()),
            quarter_label(cs.period_current()),
            format_money(cs.current_total_value()),
            cs.total_percent_change().to_string(),
            c.new,
            c.closed,
            c.increased,
            c.decreased,
            c.unchanged
        );
    }
    Ok(())
}

fn run_inspect(
    file: &Path,
    period: Option<NaiveDate>,
    scheme: Option<IdentifierScheme>,
) -> Result<()> {
    let config = load_config(None, None, scheme, None)?;
    let opts = LoadOptions {
        consolidate_rows: false,
        period_end: period,
    };
    let snapshot = load_snapshot(file, &config.comparison.resolver(), &opts)
        .with_context(|| format!("failed to load snapshot {}", file.display()))?;

    println!(
        "{} ({}): {} positions, {}",
        snapshot.period_end(),
        quarter_label(snapshot.period_end()),
        snapshot.len(),
        format_money(snapshot.total_value())
    );
    if let Some(m) = snapshot.manager() {
        println!("Manager: {m}");
    }
    let total = snapshot.total_value();
    for (key, p) in snapshot.positions() {
        let weight = if total == 0 {
            0.0
        } else {
            p.market_value as f64 / total as f64
        };
        println!(
            "  {:<32} {:<36} {:>14} {:>10} {:>6}",
            key.as_str(),
            p.name,
            p.shares,
            format_money(p.market_value),
            format_weight(weight)
        );
    }
    Ok(())
}
