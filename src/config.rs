use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::retry::RetryPolicy;

pub const APP_DIR: &str = "citation_tracker";

/// Longest accepted poll interval (one year).
pub const MAX_INTERVAL_HOURS: u64 = 24 * 365;
/// Longest accepted wait between listing retries.
pub const MAX_RETRY_DELAY_SECS: u64 = 3600;

/// Poll interval for a user-supplied hour count, clamped to 1..=MAX_INTERVAL_HOURS.
pub fn interval_from_hours(hours: u64) -> Duration {
    Duration::from_secs(hours.clamp(1, MAX_INTERVAL_HOURS) * 3600)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub client_id: String,
    pub imap_server: Option<String>,
    pub user_email: Option<String>,
    pub redirect_uri: Option<String>,
    pub db_path: Option<String>,

    #[serde(default = "default_sender")]
    pub scholar_sender: String,
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_interval_hours")]
    pub poll_interval_hours: u64,
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub fetch_retry_delay_secs: u64,

    pub notion_database_id: Option<String>,
    /// Notion property that receives the author list; not written when unset.
    pub authors_property: Option<String>,

    #[serde(default = "default_model")]
    pub anthropic_model: String,
    /// Cut long-form summaries to this many characters before persisting.
    pub summary_char_limit: Option<usize>,
}

fn default_sender() -> String {
    "scholaralerts-noreply@google.com".to_string()
}

fn default_max_messages() -> usize {
    10
}

fn default_interval_hours() -> u64 {
    6
}

fn default_fetch_retries() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    10
}

fn default_model() -> String {
    "claude-opus-4-5-20251101".to_string()
}

impl Config {
    pub fn imap_server(&self) -> String {
        self.imap_server
            .clone()
            .unwrap_or_else(|| "imap.gmail.com".to_string())
    }

    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| "http://127.0.0.1:8080/callback".to_string())
    }

    pub fn user_email(&self) -> Result<String> {
        self.user_email
            .clone()
            .ok_or_else(|| anyhow!("user_email not set in config"))
    }

    pub fn notion_database_id(&self) -> Result<String> {
        self.notion_database_id
            .clone()
            .ok_or_else(|| anyhow!("notion_database_id not set in config"))
    }

    pub fn fetch_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch_retries.max(1),
            delay: Duration::from_secs(self.fetch_retry_delay_secs.min(MAX_RETRY_DELAY_SECS)),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        interval_from_hours(self.poll_interval_hours)
    }

    fn template() -> Self {
        Self {
            client_id: "YOUR_CLIENT_ID.apps.googleusercontent.com".to_string(),
            imap_server: Some("imap.gmail.com".to_string()),
            user_email: Some("you@example.com".to_string()),
            redirect_uri: Some("http://127.0.0.1:8080/callback".to_string()),
            db_path: None,
            scholar_sender: default_sender(),
            max_messages: default_max_messages(),
            poll_interval_hours: default_interval_hours(),
            fetch_retries: default_fetch_retries(),
            fetch_retry_delay_secs: default_retry_delay(),
            notion_database_id: Some("YOUR_NOTION_DATABASE_ID".to_string()),
            authors_property: None,
            anthropic_model: default_model(),
            summary_char_limit: None,
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    let p = dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join(APP_DIR);
    fs::create_dir_all(&p)?;
    Ok(p)
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_db_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("journal.db"))
}

/// Load the config at `path` (or the default location). A template is
/// written when the file does not exist yet.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tom = toml::to_string_pretty(&Config::template())?;
        fs::write(&path, tom)?;
        return Err(anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(&path)?;
    let cfg: Config = toml::from_str(&s)?;
    Ok(cfg)
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_durations_are_clamped() {
        assert_eq!(interval_from_hours(0), Duration::from_secs(3600));
        assert_eq!(interval_from_hours(6), Duration::from_secs(6 * 3600));
        assert_eq!(
            interval_from_hours(u64::MAX),
            Duration::from_secs(MAX_INTERVAL_HOURS * 3600)
        );

        let mut cfg: Config = toml::from_str(
            r#"
            client_id = "abc"
            poll_interval_hours = 9223372036854775807
            fetch_retry_delay_secs = 9223372036854775807
            "#,
        )
        .unwrap();
        assert_eq!(cfg.poll_interval(), Duration::from_secs(MAX_INTERVAL_HOURS * 3600));
        assert_eq!(cfg.fetch_retry_policy().delay, Duration::from_secs(MAX_RETRY_DELAY_SECS));

        cfg.poll_interval_hours = 2;
        assert_eq!(cfg.poll_interval(), Duration::from_secs(7200));
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            client_id = "abc"
            user_email = "me@example.com"
            notion_database_id = "db"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.scholar_sender, "scholaralerts-noreply@google.com");
        assert_eq!(cfg.max_messages, 10);
        assert_eq!(cfg.poll_interval(), Duration::from_secs(6 * 3600));
        assert_eq!(cfg.imap_server(), "imap.gmail.com");
        let policy = cfg.fetch_retry_policy();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert!(cfg.summary_char_limit.is_none());
    }

    #[test]
    fn missing_file_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Created template config"));
        assert!(path.exists());

        // the template itself parses
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.user_email().unwrap(), "you@example.com");
    }
}
