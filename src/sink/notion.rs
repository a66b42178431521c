use anyhow::{Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::sink::{DocumentStore, RecordProperties};

const DEFAULT_BASE_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
/// Notion accepts at most this many children per append request.
const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// Property names of the target database.
#[derive(Debug, Clone)]
pub struct NotionSchema {
    pub title: String,
    pub seed_paper: String,
    pub tldr: String,
    pub message_id: String,
    pub received: String,
    pub url: String,
    pub authors: Option<String>,
}

impl Default for NotionSchema {
    fn default() -> Self {
        Self {
            title: "title".into(),
            seed_paper: "seed_paper".into(),
            tldr: "TLDR".into(),
            message_id: "Gmail Msg ID".into(),
            received: "date_received".into(),
            url: "url".into(),
            authors: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    id: String,
    object: String,
    #[serde(default)]
    title: Vec<RichText>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

fn paragraph(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": { "rich_text": [{ "type": "text", "text": { "content": content } }] }
    })
}

pub struct NotionStore {
    http: Client,
    api_key: String,
    database_id: String,
    schema: NotionSchema,
    base_url: String,
}

impl NotionStore {
    pub fn new(api_key: impl Into<String>, database_id: impl Into<String>, schema: NotionSchema) -> Result<Self> {
        Self::with_base_url(api_key, database_id, schema, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        database_id: impl Into<String>,
        schema: NotionSchema,
        base_url: &str,
    ) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            api_key: api_key.into(),
            database_id: database_id.into(),
            schema,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    fn send(&self, req: RequestBuilder) -> Result<reqwest::blocking::Response> {
        let resp = self.authed(req).send()?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(anyhow!("Notion API error [{}]: {}", status.as_u16(), body));
        }
        Ok(resp)
    }

    fn page_properties(&self, props: &RecordProperties) -> Value {
        let s = &self.schema;
        let mut properties = serde_json::Map::new();
        properties.insert(
            s.title.clone(),
            json!({ "title": [{ "text": { "content": props.title } }] }),
        );
        properties.insert(s.seed_paper.clone(), rich_text(&props.seed_paper));
        properties.insert(s.tldr.clone(), rich_text(&props.tldr));
        properties.insert(s.message_id.clone(), rich_text(&props.source_message_id));
        properties.insert(
            s.received.clone(),
            json!({ "date": { "start": props.received_at.to_rfc3339() } }),
        );
        if let Some(url) = &props.url {
            properties.insert(s.url.clone(), json!({ "url": url }));
        }
        if let Some(authors) = &s.authors {
            properties.insert(authors.clone(), rich_text(&props.authors));
        }
        Value::Object(properties)
    }

    /// Databases shared with the integration whose title matches `query`.
    pub fn find_databases(&self, query: &str) -> Result<Vec<DatabaseSummary>> {
        let body = json!({
            "query": query,
            "filter": { "value": "database", "property": "object" },
        });
        let resp: SearchResponse = self
            .send(self.http.post(format!("{}/v1/search", self.base_url)).json(&body))?
            .json()?;

        Ok(resp
            .results
            .into_iter()
            .filter(|r| r.object == "database")
            .map(|r| DatabaseSummary {
                title: r
                    .title
                    .first()
                    .map(|t| t.plain_text.clone())
                    .unwrap_or_else(|| "Untitled".to_string()),
                id: r.id,
            })
            .collect())
    }
}

impl DocumentStore for NotionStore {
    fn create_record(&self, props: &RecordProperties) -> Result<String> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": self.page_properties(props),
        });
        let page: CreatedPage = self
            .send(self.http.post(format!("{}/v1/pages", self.base_url)).json(&body))?
            .json()?;
        Ok(page.id)
    }

    fn append_text_blocks(&self, record_id: &str, chunks: &[String]) -> Result<()> {
        let url = format!("{}/v1/blocks/{}/children", self.base_url, record_id);
        for batch in chunks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let children: Vec<Value> = batch.iter().map(|c| paragraph(c)).collect();
            self.send(self.http.patch(&url).json(&json!({ "children": children })))?;
        }
        Ok(())
    }
}
