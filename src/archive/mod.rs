//! Preprint lookup: full text when a PDF is available, abstract otherwise.

pub mod arxiv;
pub mod pdf;

use anyhow::Result;
use log::{info, warn};

use crate::domain::paper::ResolvedPaper;

/// Page cap for full-text extraction.
pub const MAX_PDF_PAGES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub pdf_url: Option<String>,
    pub entry_url: String,
    pub authors: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbstractEntry {
    pub text: String,
    pub entry_url: String,
    pub authors: String,
}

/// Preprint archive search and document fetch.
pub trait ArchiveSource {
    /// Most recently submitted record whose title matches exactly.
    fn search_by_exact_title(&self, title: &str) -> Result<Option<ArchiveEntry>>;
    /// Plain text of the first `max_pages` pages; `None` when nothing extractable.
    fn fetch_and_extract_text(&self, pdf_url: &str, max_pages: usize) -> Result<Option<String>>;
    fn fetch_abstract(&self, title: &str) -> Result<Option<AbstractEntry>>;
}

pub struct PaperResolver<'a> {
    archive: &'a dyn ArchiveSource,
    max_pages: usize,
}

impl<'a> PaperResolver<'a> {
    pub fn new(archive: &'a dyn ArchiveSource) -> Self {
        Self {
            archive,
            max_pages: MAX_PDF_PAGES,
        }
    }

    /// Full text of the matching record. A record without extractable text
    /// still reports its url and authors.
    pub fn full_text(&self, title: &str) -> ResolvedPaper {
        let entry = match self.archive.search_by_exact_title(title) {
            Ok(Some(entry)) => entry,
            Ok(None) => return ResolvedPaper::unmatched(title),
            Err(e) => {
                warn!("archive search failed for '{title}': {e:#}");
                return ResolvedPaper::unmatched(title);
            }
        };

        let content = entry.pdf_url.as_deref().and_then(|pdf_url| {
            match self.archive.fetch_and_extract_text(pdf_url, self.max_pages) {
                Ok(text) => text.filter(|t| !t.trim().is_empty()),
                Err(e) => {
                    warn!("could not extract text from {pdf_url}: {e:#}");
                    None
                }
            }
        });

        ResolvedPaper {
            title: title.to_string(),
            content,
            url: entry.entry_url,
            authors: entry.authors,
        }
    }

    pub fn abstract_text(&self, title: &str) -> ResolvedPaper {
        match self.archive.fetch_abstract(title) {
            Ok(Some(entry)) => ResolvedPaper {
                title: title.to_string(),
                content: Some(entry.text).filter(|t| !t.trim().is_empty()),
                url: entry.entry_url,
                authors: entry.authors,
            },
            Ok(None) => ResolvedPaper::unmatched(title),
            Err(e) => {
                warn!("abstract lookup failed for '{title}': {e:#}");
                ResolvedPaper::unmatched(title)
            }
        }
    }

    /// Full text, falling back to the abstract. Never fails; an unmatched
    /// title comes back with no content and empty url/authors.
    pub fn resolve(&self, title: &str) -> ResolvedPaper {
        let paper = self.full_text(title);
        if paper.content.is_some() {
            return paper;
        }
        info!("full text not found for '{title}', trying abstract");
        self.abstract_text(title)
    }
}
