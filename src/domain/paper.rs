use chrono::{DateTime, Utc};

use crate::domain::email::MessageId;

/// Seed paper and the papers reported as citing it in one alert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedCitation {
    pub seed_paper_title: Option<String>,
    pub citing_paper_titles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPaper {
    pub title: String,
    /// Full text (first pages) or abstract.
    pub content: Option<String>,
    pub url: String,
    pub authors: String,
}

impl ResolvedPaper {
    /// Result for a title the archive has no record of.
    pub fn unmatched(title: &str) -> Self {
        ResolvedPaper {
            title: title.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub full_summary: String,
    pub tldr: String,
}

/// Fields handed to the record sink for one summarized citing paper.
#[derive(Debug, Clone)]
pub struct CitationRecord {
    pub title: String,
    pub seed_paper: String,
    pub tldr: String,
    pub source_message_id: MessageId,
    pub url: Option<String>,
    pub authors: String,
    pub received_at: DateTime<Utc>,
    pub summary_body: String,
}

/// What happened to one unit of work in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PaperOutcome {
    /// Record created in the document store.
    Added,
    /// No full text or abstract could be found.
    NoContent,
    /// The long-form summary request failed.
    SummaryFailed,
    /// The store write failed.
    NotAdded,
    /// The message had no seed paper or no citing papers.
    Unparseable,
}

impl PaperOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PaperOutcome::Added => "added",
            PaperOutcome::NoContent => "no_content",
            PaperOutcome::SummaryFailed => "summary_failed",
            PaperOutcome::NotAdded => "not_added",
            PaperOutcome::Unparseable => "unparseable",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [
            PaperOutcome::Added,
            PaperOutcome::NoContent,
            PaperOutcome::SummaryFailed,
            PaperOutcome::NotAdded,
            PaperOutcome::Unparseable,
        ]
        .into_iter()
        .find(|o| o.as_str() == s)
    }
}
