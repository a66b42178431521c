use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::paper::PaperOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub message_id: String,
    pub seed_paper: String,
    /// Citing paper title; empty for message-level outcomes.
    pub title: String,
    pub outcome: PaperOutcome,
    pub detail: String,
    pub recorded_at: DateTime<Utc>,
}

/// Local record of every outcome, kept for manual reprocessing.
pub trait JournalRepository {
    fn record_outcome(&self, entry: &JournalEntry) -> Result<()>;
    /// Most recent entries that did not end in a stored record, newest first.
    fn list_failures(&self, limit: usize) -> Result<Vec<JournalEntry>>;
    fn counts(&self) -> Result<Vec<(PaperOutcome, i64)>>;
}
