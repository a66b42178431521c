pub mod notion;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info};

use crate::domain::paper::CitationRecord;

pub const TITLE_MAX_CHARS: usize = 100;
pub const TLDR_MAX_CHARS: usize = 500;
/// Per-block limit of the destination, with headroom.
pub const BLOCK_MAX_CHARS: usize = 1900;

/// Structured properties of a new record, already cut to field limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordProperties {
    pub title: String,
    pub seed_paper: String,
    pub tldr: String,
    pub source_message_id: String,
    pub url: Option<String>,
    pub authors: String,
    pub received_at: DateTime<Utc>,
}

/// Hosted document database holding one record per citing paper.
pub trait DocumentStore {
    /// Create the record and return its id.
    fn create_record(&self, props: &RecordProperties) -> Result<String>;
    /// Append plain-text blocks, in order, under an existing record.
    fn append_text_blocks(&self, record_id: &str, chunks: &[String]) -> Result<()>;
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Split `text` into consecutive pieces of at most `max_chars` characters.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

pub struct RecordSink<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> RecordSink<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    fn properties(record: &CitationRecord) -> RecordProperties {
        RecordProperties {
            title: truncate_chars(&record.title, TITLE_MAX_CHARS),
            seed_paper: truncate_chars(&record.seed_paper, TITLE_MAX_CHARS),
            tldr: truncate_chars(&record.tldr, TLDR_MAX_CHARS),
            source_message_id: record.source_message_id.clone(),
            url: record.url.clone().filter(|u| !u.is_empty()),
            authors: record.authors.clone(),
            received_at: record.received_at,
        }
    }

    fn write(&self, record: &CitationRecord) -> Result<()> {
        let record_id = self.store.create_record(&Self::properties(record))?;
        let chunks = chunk_text(&record.summary_body, BLOCK_MAX_CHARS);
        if !chunks.is_empty() {
            // a failure here leaves the record without its body
            self.store.append_text_blocks(&record_id, &chunks)?;
        }
        Ok(())
    }

    /// Persist one record; failures are logged and reported as `false`.
    pub fn persist(&self, record: &CitationRecord) -> bool {
        match self.write(record) {
            Ok(()) => {
                info!("stored record for '{}'", record.title);
                true
            }
            Err(e) => {
                error!(
                    "failed to store record for '{}' (message {}): {e:#}",
                    record.title, record.source_message_id
                );
                false
            }
        }
    }
}
