//! One scheduled tick: poll the inbox, extract citations, resolve, summarize
//! and store each citing paper, then mark the alert read.

pub mod retry;

use chrono::Utc;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::archive::{ArchiveSource, PaperResolver};
use crate::domain::email::{MessageId, MessageRef};
use crate::domain::paper::{CitationRecord, PaperOutcome};
use crate::extract::extract_citation;
use crate::mail::MailSource;
use crate::pipeline::retry::RetryPolicy;
use crate::sink::{DocumentStore, RecordSink};
use crate::store::repo::{JournalEntry, JournalRepository};
use crate::summarize::{Completion, Summarizer};

/// Externally supplied collaborators.
pub struct Collaborators<'a> {
    pub mail: &'a dyn MailSource,
    pub archive: &'a dyn ArchiveSource,
    pub completion: &'a dyn Completion,
    pub store: &'a dyn DocumentStore,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub sender: String,
    pub max_messages: usize,
    pub fetch_retry: RetryPolicy,
    pub summary_char_limit: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            sender: "scholaralerts-noreply@google.com".to_string(),
            max_messages: 10,
            fetch_retry: RetryPolicy::default(),
            summary_char_limit: None,
        }
    }
}

/// Tally of one `run_once` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Listing the inbox failed on every attempt.
    pub fetch_failed: bool,
    pub messages_found: usize,
    pub messages_marked_read: usize,
    /// Left unread because their details could not be fetched.
    pub messages_deferred: usize,
    pub unparseable: usize,
    /// A stop request cut the run short.
    pub interrupted: bool,
    pub papers: BTreeMap<PaperOutcome, usize>,
}

impl RunReport {
    fn count(&mut self, outcome: PaperOutcome) {
        *self.papers.entry(outcome).or_default() += 1;
    }

    pub fn papers_with(&self, outcome: PaperOutcome) -> usize {
        self.papers.get(&outcome).copied().unwrap_or(0)
    }
}

pub struct Pipeline<'a> {
    mail: &'a dyn MailSource,
    resolver: PaperResolver<'a>,
    summarizer: Summarizer<'a>,
    sink: RecordSink<'a>,
    journal: Option<&'a dyn JournalRepository>,
    running: Option<Arc<AtomicBool>>,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(collab: Collaborators<'a>, settings: PipelineSettings) -> Self {
        Self {
            mail: collab.mail,
            resolver: PaperResolver::new(collab.archive),
            summarizer: Summarizer::new(collab.completion),
            sink: RecordSink::new(collab.store),
            journal: None,
            running: None,
            settings,
        }
    }

    pub fn with_journal(mut self, journal: &'a dyn JournalRepository) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Share a run flag; once it is cleared the current run stops at the
    /// next message or paper boundary, or during a retry wait.
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    fn keep_going(&self) -> bool {
        self.running
            .as_ref()
            .is_none_or(|r| r.load(Ordering::SeqCst))
    }

    /// Process every unread alert currently in the inbox. Individual failures
    /// are logged and counted, never returned.
    pub fn run_once(&self) -> RunReport {
        let mut report = RunReport::default();
        info!("Starting email processing...");

        let s = &self.settings;
        let listed = s.fetch_retry.run_while(
            "listing unread alerts",
            || self.keep_going(),
            |_| self.mail.list_unread(&s.sender, s.max_messages),
        );
        let messages = match listed {
            Ok(m) => m,
            Err(_) if !self.keep_going() => {
                warn!("Stop requested while listing alerts");
                report.interrupted = true;
                return report;
            }
            Err(e) => {
                error!("Error fetching emails: {e:#}");
                report.fetch_failed = true;
                return report;
            }
        };

        if messages.is_empty() {
            info!("No unread emails from {}", s.sender);
            return report;
        }
        report.messages_found = messages.len();
        info!("Found {} unread emails", messages.len());

        for msg in &messages {
            if !self.keep_going() {
                warn!("Stop requested; leaving remaining alerts unread");
                report.interrupted = true;
                break;
            }
            self.process_message(msg, &mut report);
        }

        info!("Email processing completed: {report:?}");
        report
    }

    fn process_message(&self, msg: &MessageRef, report: &mut RunReport) {
        let id = &msg.id;
        info!("Processing email: {id}");

        let details = match self.mail.get_details(id) {
            Ok(d) => d,
            Err(e) => {
                error!("Failed to get email details for {id}: {e:#}");
                report.messages_deferred += 1;
                return;
            }
        };
        info!("Subject: {}", details.subject);

        let citation = extract_citation(&details.body);
        let seed = match (citation.seed_paper_title, citation.citing_paper_titles.is_empty()) {
            (Some(seed), false) => seed,
            (seed, _) => {
                let what = if seed.is_none() { "seed paper" } else { "citing papers" };
                warn!("Could not extract {what} from email {id}");
                report.unparseable += 1;
                self.journal(id, seed.as_deref().unwrap_or(""), "", PaperOutcome::Unparseable, what);
                self.mark_read(id, report);
                return;
            }
        };

        info!("Seed paper: {seed}");
        info!("Found {} citing papers", citation.citing_paper_titles.len());

        for title in &citation.citing_paper_titles {
            if !self.keep_going() {
                // unread, so the whole alert is picked up again next time
                warn!("Stop requested; email {id} left unread");
                report.interrupted = true;
                return;
            }
            let outcome = self.process_paper(id, &seed, title);
            report.count(outcome);
        }

        self.mark_read(id, report);
        info!("Successfully processed email {id}");
    }

    fn process_paper(&self, id: &MessageId, seed: &str, title: &str) -> PaperOutcome {
        info!("Processing citing paper: {title}");

        let paper = self.resolver.resolve(title);
        let Some(content) = paper.content.as_deref() else {
            warn!("Could not find paper content for '{title}' (email {id})");
            self.journal(id, seed, title, PaperOutcome::NoContent, "no full text or abstract");
            return PaperOutcome::NoContent;
        };

        let summary = match self.summarizer.summarize(content) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to summarize paper '{title}' (email {id}): {e:#}");
                self.journal(id, seed, title, PaperOutcome::SummaryFailed, &format!("{e:#}"));
                return PaperOutcome::SummaryFailed;
            }
        };

        let mut summary_body = summary.full_summary;
        if let Some(limit) = self.settings.summary_char_limit {
            summary_body = summary_body.chars().take(limit).collect();
        }

        let record = CitationRecord {
            title: title.to_string(),
            seed_paper: seed.to_string(),
            tldr: summary.tldr,
            source_message_id: id.clone(),
            url: Some(paper.url).filter(|u| !u.is_empty()),
            authors: paper.authors,
            received_at: Utc::now(),
            summary_body,
        };

        if self.sink.persist(&record) {
            info!("Successfully added: {title}");
            self.journal(id, seed, title, PaperOutcome::Added, "");
            PaperOutcome::Added
        } else {
            // the alert is still marked read; the journal keeps it for follow-up
            self.journal(id, seed, title, PaperOutcome::NotAdded, "store write failed");
            PaperOutcome::NotAdded
        }
    }

    fn mark_read(&self, id: &MessageId, report: &mut RunReport) {
        match self.mail.mark_read(id) {
            Ok(()) => report.messages_marked_read += 1,
            Err(e) => error!("Error marking email {id} as read: {e:#}"),
        }
    }

    fn journal(&self, id: &MessageId, seed: &str, title: &str, outcome: PaperOutcome, detail: &str) {
        let Some(journal) = self.journal else {
            return;
        };
        let entry = JournalEntry {
            message_id: id.clone(),
            seed_paper: seed.to_string(),
            title: title.to_string(),
            outcome,
            detail: detail.to_string(),
            recorded_at: Utc::now(),
        };
        if let Err(e) = journal.record_outcome(&entry) {
            warn!("could not write journal entry for '{title}': {e:#}");
        }
    }
}
