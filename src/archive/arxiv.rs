use anyhow::{Result, anyhow};
use log::debug;
use quick_xml::de::from_str;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::archive::pdf::extract_leading_pages;
use crate::archive::{AbstractEntry, ArchiveEntry, ArchiveSource};

const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@type")]
    link_type: Option<String>,
}

impl AtomEntry {
    fn authors(&self) -> String {
        self.authors
            .iter()
            .map(|a| clean_text(&a.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn pdf_url(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.link_type.as_deref() == Some("application/pdf"))
            .and_then(|l| l.href.clone())
    }
}

fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// arXiv export API client (blocking).
pub struct ArxivClient {
    http: Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("citation_tracker/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }

    /// Newest record whose title matches the quoted phrase.
    fn newest_by_title(&self, title: &str) -> Result<Option<AtomEntry>> {
        // quotes inside the title would end the phrase early
        let phrase = title.replace('"', " ");
        let query = format!("ti:\"{}\"", phrase.trim());
        debug!("arXiv query: {query}");

        let xml = self
            .http
            .get(&self.base_url)
            .query(&[
                ("search_query", query.as_str()),
                ("max_results", "1"),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()?
            .error_for_status()?
            .text()?;

        let feed: AtomFeed = from_str(&xml).map_err(|e| anyhow!("invalid atom xml: {e}"))?;
        Ok(feed.entries.into_iter().next())
    }
}

impl ArchiveSource for ArxivClient {
    fn search_by_exact_title(&self, title: &str) -> Result<Option<ArchiveEntry>> {
        Ok(self.newest_by_title(title)?.map(|e| ArchiveEntry {
            pdf_url: e.pdf_url(),
            authors: e.authors(),
            entry_url: e.id.trim().to_string(),
        }))
    }

    fn fetch_and_extract_text(&self, pdf_url: &str, max_pages: usize) -> Result<Option<String>> {
        let bytes = self.http.get(pdf_url).send()?.error_for_status()?.bytes()?;
        let text = extract_leading_pages(&bytes, max_pages)?;
        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }

    fn fetch_abstract(&self, title: &str) -> Result<Option<AbstractEntry>> {
        Ok(self.newest_by_title(title)?.map(|e| AbstractEntry {
            text: clean_text(&e.summary),
            authors: e.authors(),
            entry_url: e.id.trim().to_string(),
        }))
    }
}
