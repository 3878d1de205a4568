//! Rendering a change set into publishable text.
//!
//! - [`TickerMap`]: display symbols for identifiers
//! - [`render_thread`]: header, top holdings, then one section per category
//! - [`render_single`]: one message with the headline numbers
//! - [`render_summary`]: plain text report for a terminal
//! - [`split_message`]: enforces the per-message character limit
//!
//! Rendering reads the ranked change set as-is. It never reorders entries
//! within a category; the holdings and buy/sell lists use the weight-based
//! views on [`ChangeSet`].

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use holdwatch_core::identity::normalize_identifier;
use holdwatch_core::{ChangeCategory, ChangeEntry, ChangeSet, PresentationMode};

use crate::config::PresentationConfig;
use crate::source::LoadError;

// ─── Tickers ────────────────────────────────────────────────────────

/// Identifier → ticker lookup.
///
/// Keys are stored normalized. Lookups try the full identifier first, then
/// its 8-character CUSIP issue prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerMap {
    tickers: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TickerRow {
    cusip: String,
    ticker: String,
}

impl TickerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a `cusip,ticker` CSV.
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadError> {
        let csv_err = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_err)?;
        Self::from_csv_reader(reader).map_err(csv_err)
    }

    pub fn from_csv_reader<R: std::io::Read>(
        mut reader: csv::Reader<R>,
    ) -> Result<Self, csv::Error> {
        let mut map = Self::new();
        for row in reader.deserialize::<TickerRow>() {
            let row = row?;
            map.insert(&row.cusip, &row.ticker);
        }
        Ok(map)
    }

    pub fn insert(&mut self, identifier: &str, ticker: &str) {
        let key = normalize_identifier(identifier);
        let ticker = ticker.trim().trim_start_matches('$').to_ascii_uppercase();
        if !key.is_empty() && !ticker.is_empty() {
            self.tickers.insert(key, ticker);
        }
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn lookup(&self, identifier: &str) -> Option<&str> {
        let code = normalize_identifier(identifier);
        if let Some(t) = self.tickers.get(&code) {
            return Some(t);
        }
        code.get(..8)
            .and_then(|prefix| self.tickers.get(prefix))
            .map(String::as_str)
    }

    /// `$TICKER`, else `$` + the first word of the issuer name.
    pub fn symbol(&self, entry: &ChangeEntry) -> String {
        if let Some(t) = entry.identifier.as_deref().and_then(|id| self.lookup(id)) {
            return format!("${t}");
        }
        match entry.display_name.split_whitespace().next() {
            Some(word) => format!("${}", word.to_uppercase()),
            None => "$?".to_string(),
        }
    }
}

// ─── Formatting helpers ─────────────────────────────────────────────

/// `$1.23B`, `$45.6M`, `$7.8K`, `$950`.
pub fn format_money(dollars: i64) -> String {
    let sign = if dollars < 0 { "-" } else { "" };
    let abs = dollars.unsigned_abs() as f64;
    if abs >= 1e9 {
        format!("{sign}${:.2}B", abs / 1e9)
    } else if abs >= 1e6 {
        format!("{sign}${:.1}M", abs / 1e6)
    } else if abs >= 1e3 {
        format!("{sign}${:.1}K", abs / 1e3)
    } else {
        format!("{sign}${abs}")
    }
}

/// Fraction as a signed percent: `0.123` → `+12.3%`.
pub fn format_signed_percent(fraction: f64) -> String {
    let pct = fraction * 100.0;
    // Avoid "-0.0%" for tiny negative moves.
    if (pct * 10.0).round() == 0.0 {
        return "+0.0%".to_string();
    }
    format!("{pct:+.1}%")
}

/// Fraction as an unsigned percent: `0.123` → `12.3%`.
pub fn format_weight(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// `Sep 30th, 2025`.
pub fn format_date(date: NaiveDate) -> String {
    format!(
        "{} {}{}, {}",
        date.format("%b"),
        date.day(),
        ordinal_suffix(date.day()),
        date.year()
    )
}

/// `Q3 2025`.
pub fn quarter_label(date: NaiveDate) -> String {
    format!("Q{} {}", (date.month() - 1) / 3 + 1, date.year())
}

// ─── Renderers ──────────────────────────────────────────────────────

/// Layout knobs shared by the renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub manager: Option<String>,
    pub top_n: usize,
    pub max_message_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions::from(&PresentationConfig::default())
    }
}

impl From<&PresentationConfig> for RenderOptions {
    fn from(p: &PresentationConfig) -> Self {
        Self {
            manager: p.manager.clone(),
            top_n: p.top_n,
            max_message_chars: p.max_message_chars,
        }
    }
}

impl RenderOptions {
    fn manager(&self) -> &str {
        self.manager.as_deref().unwrap_or("Portfolio")
    }
}

/// Messages to publish for `mode`; empty for summary-only.
pub fn render_messages(
    changes: &ChangeSet,
    mode: PresentationMode,
    tickers: &TickerMap,
    opts: &RenderOptions,
) -> Vec<String> {
    match mode {
        PresentationMode::FullThread => render_thread(changes, tickers, opts),
        PresentationMode::SingleSummary => {
            split_message(&render_single(changes, tickers, opts), opts.max_message_chars)
        }
        PresentationMode::SummaryOnly => Vec::new(),
    }
}

/// The full thread. Every message fits `opts.max_message_chars`.
pub fn render_thread(
    changes: &ChangeSet,
    tickers: &TickerMap,
    opts: &RenderOptions,
) -> Vec<String> {
    let mut sections = vec![header(changes, tickers, opts)];

    let holdings = changes.top_holdings(opts.top_n);
    if !holdings.is_empty() {
        let mut s = format!("Top {} holdings:\n", holdings.len());
        for e in holdings {
            let _ = write!(
                s,
                "\n{} {} ({})",
                format_weight(e.current_weight),
                tickers.symbol(e),
                format_signed_percent(e.weight_change())
            );
        }
        sections.push(s);
    }

    for category in ChangeCategory::ALL {
        if category == ChangeCategory::Unchanged {
            continue;
        }
        let total = changes.in_category(category).count();
        if total == 0 {
            continue;
        }
        let mut s = format!("{} ({total}):\n", section_title(category));
        for e in changes.in_category(category).take(opts.top_n) {
            s.push('\n');
            s.push_str(&entry_line(e, tickers));
        }
        sections.push(s);
    }

    sections
        .iter()
        .flat_map(|s| split_message(s, opts.max_message_chars))
        .collect()
}

fn header(changes: &ChangeSet, tickers: &TickerMap, opts: &RenderOptions) -> String {
    let mut s = format!(
        "{} 13F update: {}\n\nPeriod ended {}\nAUM: {} ({})",
        opts.manager(),
        quarter_label(changes.period_current()),
        format_date(changes.period_current()),
        format_money(changes.current_total_value()),
        changes.total_percent_change()
    );
    let symbols = |entries: Vec<&ChangeEntry>| {
        entries
            .into_iter()
            .map(|e| tickers.symbol(e))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let buys = changes.top_buys(3);
    if !buys.is_empty() {
        let _ = write!(s, "\n\nBuys: {}", symbols(buys));
    }
    let sells = changes.top_sells(3);
    if !sells.is_empty() {
        let _ = write!(s, "\nSells: {}", symbols(sells));
    }
    s
}

fn section_title(category: ChangeCategory) -> &'static str {
    match category {
        ChangeCategory::New => "New positions",
        ChangeCategory::Closed => "Exits",
        ChangeCategory::Increased => "Added to",
        ChangeCategory::Decreased => "Trimmed",
        ChangeCategory::Unchanged => "Unchanged",
    }
}

fn entry_line(e: &ChangeEntry, tickers: &TickerMap) -> String {
    let symbol = tickers.symbol(e);
    match e.category {
        ChangeCategory::New => format!(
            "{symbol} {} ({})",
            format_weight(e.current_weight),
            format_money(e.current_value)
        ),
        ChangeCategory::Closed => format!(
            "{symbol} (was {}, {})",
            format_weight(e.previous_weight),
            format_money(e.previous_value)
        ),
        _ => format!(
            "{symbol} {} shares, now {}",
            e.percent_change,
            format_weight(e.current_weight)
        ),
    }
}

/// One message with AUM, the top buy and sell, and the change count.
pub fn render_single(changes: &ChangeSet, tickers: &TickerMap, opts: &RenderOptions) -> String {
    let mut s = format!(
        "{} 13F - {}\n\nAUM: {} ({})\n",
        opts.manager(),
        format_date(changes.period_current()),
        format_money(changes.current_total_value()),
        changes.total_percent_change()
    );
    if let Some(e) = changes.top_buys(1).first() {
        let tag = if e.category == ChangeCategory::New { " (NEW)" } else { "" };
        let _ = write!(
            s,
            "\nTop buy: {} {}{tag}",
            tickers.symbol(e),
            format_signed_percent(e.weight_change())
        );
    }
    if let Some(e) = changes.top_sells(1).first() {
        let tag = if e.category == ChangeCategory::Closed { " (EXIT)" } else { "" };
        let _ = write!(
            s,
            "\nTop sale: {} {}{tag}",
            tickers.symbol(e),
            format_signed_percent(e.weight_change())
        );
    }
    let _ = write!(s, "\n\n{} changes | SEC EDGAR", changes.change_count());
    s
}

/// Multi-line report for a terminal. Not subject to the message limit.
pub fn render_summary(changes: &ChangeSet, top_n: usize) -> String {
    let counts = changes.counts();
    let mut s = String::new();
    let _ = writeln!(
        s,
        "Portfolio changes: {} -> {}",
        changes.period_previous(),
        changes.period_current()
    );
    let _ = writeln!(s, "{}", "=".repeat(60));
    let _ = writeln!(
        s,
        "Total value: {} -> {} ({})",
        format_money(changes.previous_total_value()),
        format_money(changes.current_total_value()),
        changes.total_percent_change()
    );
    let _ = writeln!(s, "Threshold:   {}", format_weight(changes.threshold().value()));
    let _ = writeln!(s, "\nPosition changes: {}", changes.change_count());
    for category in ChangeCategory::ALL {
        let _ = writeln!(s, "  - {:<10} {}", category.label(), counts.get(category));
    }

    let holdings = changes.top_holdings(top_n);
    if !holdings.is_empty() {
        let _ = writeln!(s, "\nTop holdings:");
        for e in holdings {
            let _ = writeln!(
                s,
                "  {:>6} | {:<30} ({})",
                format_weight(e.current_weight),
                truncate(&e.display_name, 30),
                format_signed_percent(e.weight_change())
            );
        }
    }

    let buys = changes.top_buys(top_n);
    if !buys.is_empty() {
        let _ = writeln!(s, "\nBiggest weight increases:");
        for e in buys {
            let _ = writeln!(s, "  {}", summary_line(e));
        }
    }
    let sells = changes.top_sells(top_n);
    if !sells.is_empty() {
        let _ = writeln!(s, "\nBiggest weight decreases:");
        for e in sells {
            let _ = writeln!(s, "  {}", summary_line(e));
        }
    }
    s
}

fn summary_line(e: &ChangeEntry) -> String {
    let delta = format_signed_percent(e.weight_change());
    match e.category {
        ChangeCategory::New => format!("{delta} | {} (NEW)", e.display_name),
        ChangeCategory::Closed => format!("{delta} | {} (EXITED)", e.display_name),
        _ => format!(
            "{delta} | {} ({} -> {})",
            e.display_name,
            format_weight(e.previous_weight),
            format_weight(e.current_weight)
        ),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ─── Splitting ──────────────────────────────────────────────────────

/// Split `text` into messages of at most `max_chars` characters.
///
/// Breaks on line boundaries; a single line longer than the limit is cut by
/// characters. Leading and trailing blank lines of each piece are dropped.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max = max_chars.max(1);
    if text.chars().count() <= max {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let flush = |current: &mut String, current_len: &mut usize, out: &mut Vec<String>| {
        let piece = current.trim_matches('\n');
        if !piece.is_empty() {
            out.push(piece.to_string());
        }
        current.clear();
        *current_len = 0;
    };

    for line in text.split('\n') {
        let len = line.chars().count();
        if len > max {
            flush(&mut current, &mut current_len, &mut out);
            let chars: Vec<char> = line.chars().collect();
            out.extend(chars.chunks(max).map(|c| c.iter().collect::<String>()));
            continue;
        }
        let needed = if current.is_empty() { len } else { current_len + 1 + len };
        if needed > max {
            flush(&mut current, &mut current_len, &mut out);
        }
        if !current.is_empty() || current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += len;
    }
    flush(&mut current, &mut current_len, &mut out);
    out
}
