//! Change set export: JSON, CSV, and an artifact directory.
//!
//! - **JSON**: the full change set, loadable again with [`import_json`]
//! - **CSV**: one row per entry in ranked order
//! - **Artifacts**: both of the above plus the rendered messages

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use holdwatch_core::{ChangeSet, PercentChange};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(changes: &ChangeSet) -> Result<String> {
    serde_json::to_string_pretty(changes).context("failed to serialize change set to JSON")
}

pub fn import_json(json: &str) -> Result<ChangeSet> {
    serde_json::from_str(json).context("failed to deserialize change set from JSON")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per entry.
///
/// Columns: rank, category, identity_key, display_name, identifier,
/// security_class, previous_shares, current_shares, share_delta,
/// percent_change, previous_value, current_value, value_delta,
/// value_percent_change, previous_weight, current_weight
pub fn export_csv(changes: &ChangeSet) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "category",
        "identity_key",
        "display_name",
        "identifier",
        "security_class",
        "previous_shares",
        "current_shares",
        "share_delta",
        "percent_change",
        "previous_value",
        "current_value",
        "value_delta",
        "value_percent_change",
        "previous_weight",
        "current_weight",
    ])?;

    for (i, e) in changes.entries().iter().enumerate() {
        wtr.write_record([
            (i + 1).to_string().as_str(),
            e.category.label().to_ascii_uppercase().as_str(),
            e.identity_key.as_str(),
            e.display_name.as_str(),
            e.identifier.as_deref().unwrap_or(""),
            e.security_class.as_deref().unwrap_or(""),
            e.previous_shares.to_string().as_str(),
            e.current_shares.to_string().as_str(),
            e.share_delta.to_string().as_str(),
            percent_cell(e.percent_change).as_str(),
            e.previous_value.to_string().as_str(),
            e.current_value.to_string().as_str(),
            e.value_delta.to_string().as_str(),
            percent_cell(e.value_percent_change).as_str(),
            format!("{:.6}", e.previous_weight).as_str(),
            format!("{:.6}", e.current_weight).as_str(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn percent_cell(p: PercentChange) -> String {
    match p {
        PercentChange::New => "new".to_string(),
        PercentChange::Closed => "closed".to_string(),
        PercentChange::Ratio(r) => format!("{r:.6}"),
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for one comparison.
///
/// Creates `{previous}_{current}/` under `output_dir` containing:
/// - `change_set.json`
/// - `changes.csv`
/// - `messages.txt`: rendered messages separated by `---` lines
///
/// Returns the created directory. Re-running overwrites the same files.
pub fn save_artifacts(
    changes: &ChangeSet,
    messages: &[String],
    output_dir: &Path,
) -> Result<PathBuf> {
    let dirname = format!("{}_{}", changes.period_previous(), changes.period_current());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, content: &str| {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    };
    write("change_set.json", &export_json(changes)?)?;
    write("changes.csv", &export_csv(changes)?)?;
    write("messages.txt", &messages.join("\n\n---\n\n"))?;

    Ok(run_dir)
}

/// Load a change set back from an artifact directory.
pub fn load_artifacts(run_dir: &Path) -> Result<ChangeSet> {
    let path = run_dir.join("change_set.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
