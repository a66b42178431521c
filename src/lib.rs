//! Citation-alert pipeline: polls an inbox for citation alerts, fetches each
//! citing paper from arXiv, summarizes it and files the result in Notion.

pub mod archive;
pub mod auth;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod extract;
pub mod mail;
pub mod pipeline;
pub mod sink;
pub mod store;
pub mod summarize;
