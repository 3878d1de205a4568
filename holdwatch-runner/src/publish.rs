//! Publishing rendered messages.
//!
//! A [`Publisher`] takes an ordered batch of messages (a thread, or a single
//! message) and returns one id per message. Length is checked for the whole
//! batch before anything goes out, so a thread is never half-posted because
//! of an oversized message.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("nothing to publish")]
    Empty,

    #[error("message {index} is {len} characters, limit is {max}")]
    TooLong { index: usize, len: usize, max: usize },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write to output: {0}")]
    Output(#[from] std::io::Error),
}

/// Destination for rendered messages.
pub trait Publisher {
    /// Publish `messages` in order; returns one id per message.
    fn publish(&mut self, messages: &[String]) -> Result<Vec<String>, PublishError>;
}

/// Reject an empty batch or any message over `max_chars` characters.
pub fn check_batch(messages: &[String], max_chars: usize) -> Result<(), PublishError> {
    if messages.is_empty() {
        return Err(PublishError::Empty);
    }
    for (i, m) in messages.iter().enumerate() {
        let len = m.chars().count();
        if len > max_chars {
            return Err(PublishError::TooLong {
                index: i + 1,
                len,
                max: max_chars,
            });
        }
    }
    Ok(())
}

// ─── Dry run ────────────────────────────────────────────────────────

/// Prints each message instead of posting it.
pub struct DryRunPublisher<W: Write> {
    out: W,
    max_chars: usize,
}

impl DryRunPublisher<std::io::Stdout> {
    pub fn stdout(max_chars: usize) -> Self {
        Self::new(std::io::stdout(), max_chars)
    }
}

impl<W: Write> DryRunPublisher<W> {
    pub fn new(out: W, max_chars: usize) -> Self {
        Self { out, max_chars }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Publisher for DryRunPublisher<W> {
    fn publish(&mut self, messages: &[String]) -> Result<Vec<String>, PublishError> {
        check_batch(messages, self.max_chars)?;
        let total = messages.len();
        let rule = "=".repeat(60);
        writeln!(self.out, "{rule}\n[DRY RUN] would publish {total} message(s)\n{rule}")?;
        let mut ids = Vec::with_capacity(total);
        for (i, m) in messages.iter().enumerate() {
            let n = i + 1;
            writeln!(
                self.out,
                "\n--- Message {n}/{total} ({} chars) ---\n{m}",
                m.chars().count()
            )?;
            ids.push(format!("dry-run-{n}"));
        }
        writeln!(self.out, "\n{rule}")?;
        Ok(ids)
    }
}

// ─── Outbox ─────────────────────────────────────────────────────────

/// Writes each message to a numbered text file in a directory, for a
/// separate poster (or a person) to pick up.
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    dir: PathBuf,
    prefix: String,
    max_chars: usize,
}

impl OutboxPublisher {
    /// Files are named `{prefix}-{NN}.txt`.
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, max_chars: usize) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            max_chars,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Publisher for OutboxPublisher {
    fn publish(&mut self, messages: &[String]) -> Result<Vec<String>, PublishError> {
        check_batch(messages, self.max_chars)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| PublishError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut ids = Vec::with_capacity(messages.len());
        for (i, m) in messages.iter().enumerate() {
            let name = format!("{}-{:02}.txt", self.prefix, i + 1);
            let path = self.dir.join(&name);
            std::fs::write(&path, m).map_err(|source| PublishError::Io { path, source })?;
            ids.push(name);
        }
        info!(dir = %self.dir.display(), messages = ids.len(), "wrote messages to outbox");
        Ok(ids)
    }
}
