use anyhow::{Result, anyhow};
use log::{info, warn};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::auth::oauth::{self, GMAIL_SCOPE, Tokens};
use crate::auth::token_store::{self, SecretKind};
use crate::auth::tokens_file;
use crate::config::Config;

// Assumed lifetime when the provider omits expires_in.
const DEFAULT_TOKEN_TTL_SECS: i64 = 3500;

#[derive(Clone)]
pub struct TokenManager {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub user_email: String,
}

fn now_epoch() -> Result<i64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as i64)
}

impl TokenManager {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let client_id = cfg.client_id.clone();
        Ok(Self {
            client_secret: token_store::resolve_secret(SecretKind::OauthClient, &client_id)?,
            client_id,
            redirect_uri: cfg.redirect_uri(),
            user_email: cfg.user_email()?,
        })
    }

    /// Returns a valid access token, refreshing it when the cached one has
    /// expired. Never starts the interactive flow.
    pub fn get_access_token(&self) -> Result<String> {
        let now = now_epoch()?;

        if let Some(at) = tokens_file::load_tokens()?.and_then(|tf| tf.valid_token(now)) {
            return Ok(at);
        }

        let rt = token_store::load_secret(SecretKind::RefreshToken, &self.user_email)?
            .ok_or_else(|| {
                anyhow!(
                    "no refresh token for {}; run `citation_tracker login` first",
                    self.user_email
                )
            })?;

        info!("access token expired; refreshing");
        let t = oauth::refresh_access_token(&self.client_id, self.client_secret.as_deref(), &rt)?;
        self.persist(&t, now)?;
        Ok(t.access_token)
    }

    /// Interactive PKCE login; stores the refresh token in the keyring.
    pub fn login(&self) -> Result<()> {
        let t = oauth::perform_pkce_flow(
            &self.client_id,
            self.client_secret.as_deref(),
            &self.redirect_uri,
            GMAIL_SCOPE,
        )?;
        self.persist(&t, now_epoch()?)
    }

    fn persist(&self, t: &Tokens, now: i64) -> Result<()> {
        if let Some(rt) = &t.refresh_token {
            match token_store::save_secret(SecretKind::RefreshToken, &self.user_email, rt) {
                Ok(()) => info!("saved refresh token into keyring for {}", self.user_email),
                Err(e) => warn!("couldn't save refresh token to keyring: {e}"),
            }
        }
        let exp = t
            .expires_in
            .map(|s| now + s as i64)
            .unwrap_or(now + DEFAULT_TOKEN_TTL_SECS);
        tokens_file::save_tokens(Some(&t.access_token), Some(exp))
    }
}
