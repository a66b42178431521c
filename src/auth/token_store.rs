use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

use crate::config::APP_DIR;

/// Secrets kept in the OS keyring, each with an environment fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SecretKind {
    /// OAuth client secret, keyed by client id
    OauthClient,
    /// OAuth refresh token, keyed by user email
    RefreshToken,
    /// Notion integration token
    Notion,
    /// Anthropic API key
    Anthropic,
}

impl SecretKind {
    fn env_var(self) -> Option<&'static str> {
        match self {
            SecretKind::OauthClient => Some("OAUTH_CLIENT_SECRET"),
            SecretKind::RefreshToken => None,
            SecretKind::Notion => Some("NOTION_API_KEY"),
            SecretKind::Anthropic => Some("ANTHROPIC_API_KEY"),
        }
    }

    fn entry_user(self, key: &str) -> String {
        match self {
            SecretKind::OauthClient | SecretKind::RefreshToken => key.to_string(),
            SecretKind::Notion => "notion-api-key".to_string(),
            SecretKind::Anthropic => "anthropic-api-key".to_string(),
        }
    }
}

/// Save a secret into the keyring. `key` is the client id or user email for
/// the OAuth kinds and ignored otherwise.
pub fn save_secret(kind: SecretKind, key: &str, value: &str) -> Result<()> {
    let entry = Entry::new(APP_DIR, &kind.entry_user(key))?;
    entry
        .set_password(value)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load a secret from the keyring.
pub fn load_secret(kind: SecretKind, key: &str) -> Result<Option<String>> {
    let entry = Entry::new(APP_DIR, &kind.entry_user(key))?;
    match entry.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}

/// Keyring first, then the kind's environment variable.
pub fn resolve_secret(kind: SecretKind, key: &str) -> Result<Option<String>> {
    if let Some(v) = load_secret(kind, key)? {
        return Ok(Some(v));
    }
    Ok(kind.env_var().and_then(|var| std::env::var(var).ok()))
}

/// Like [`resolve_secret`] but a missing secret is an error naming both sources.
pub fn require_secret(kind: SecretKind, key: &str) -> Result<String> {
    resolve_secret(kind, key)?.ok_or_else(|| match kind.env_var() {
        Some(var) => anyhow!("{kind:?} secret not found in keyring or ${var}"),
        None => anyhow!("{kind:?} secret not found in keyring"),
    })
}
