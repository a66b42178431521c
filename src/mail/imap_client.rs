use crate::auth::token_manager::TokenManager;
use crate::domain::email::{InboxMessage, MessageId, MessageRef};
use crate::mail::MailSource;
use crate::mail::decoders::parse_alert;
use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};
use log::{debug, warn};
use native_tls::TlsConnector;

type TlsSession = imap::Session<native_tls::TlsStream<std::net::TcpStream>>;

/// Build canonical auth string as bytes.
fn build_xoauth2_bytes(user: &str, access_token: &str) -> Vec<u8> {
    format!("user={user}\x01auth=Bearer {access_token}\x01\x01").into_bytes()
}

struct OAuth2Authenticator {
    response: Vec<u8>,
}

impl imap::Authenticator for OAuth2Authenticator {
    type Response = Vec<u8>;
    fn process(&self, _challenge: &[u8]) -> Self::Response {
        self.response.clone()
    }
}

/// Gmail (or any XOAUTH2 IMAP server) inbox. Every call opens its own
/// session so a dropped connection only costs one operation.
pub struct ImapMailbox {
    pub server: String,
    pub user: String,
    tokens: TokenManager,
}

impl ImapMailbox {
    pub fn new(server: impl Into<String>, user: impl Into<String>, tokens: TokenManager) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
            tokens,
        }
    }

    fn connect_and_auth(&self) -> Result<TlsSession> {
        let access_token = self.tokens.get_access_token()?;
        let tls = TlsConnector::builder().build()?;
        let mut client = imap::connect((self.server.as_str(), 993), self.server.as_str(), &tls)?;

        let raw_payload = build_xoauth2_bytes(&self.user, &access_token);

        // Try RAW first
        let auth_raw = OAuth2Authenticator {
            response: raw_payload.clone(),
        };
        match client.authenticate("XOAUTH2", &auth_raw) {
            Ok(session) => return Ok(session),
            Err((e, returned_client)) => {
                debug!("XOAUTH2 raw attempt failed: {e}");
                client = returned_client;
            }
        }

        // Fallback BASE64
        let b64_bytes = general_purpose::STANDARD.encode(&raw_payload).into_bytes();
        let auth_b64 = OAuth2Authenticator {
            response: b64_bytes,
        };
        match client.authenticate("XOAUTH2", &auth_b64) {
            Ok(session) => Ok(session),
            Err((e, _)) => Err(anyhow!("XOAUTH2 failed (raw+base64): {e}")),
        }
    }

    fn open_inbox(&self) -> Result<TlsSession> {
        let mut session = self.connect_and_auth()?;
        session.select("INBOX")?;
        Ok(session)
    }
}

fn parse_uid(id: &MessageId) -> Result<u32> {
    id.parse::<u32>()
        .map_err(|_| anyhow!("invalid IMAP UID '{id}'"))
}

fn search_query(sender: &str) -> String {
    // IMAP quoted string: escape backslash and quote
    let quoted = sender.replace('\\', "\\\\").replace('"', "\\\"");
    format!("UNSEEN FROM \"{quoted}\"")
}

impl MailSource for ImapMailbox {
    fn list_unread(&self, sender: &str, max_results: usize) -> Result<Vec<MessageRef>> {
        let mut session = self.open_inbox()?;
        let mut uids: Vec<u32> = session.uid_search(search_query(sender))?.into_iter().collect();
        session.logout()?;

        // newest first
        uids.sort_unstable_by(|a, b| b.cmp(a));
        uids.truncate(max_results);

        Ok(uids
            .into_iter()
            .map(|uid| MessageRef {
                id: uid.to_string(),
            })
            .collect())
    }

    fn get_details(&self, id: &MessageId) -> Result<InboxMessage> {
        let uid = parse_uid(id)?;
        let mut session = self.open_inbox()?;

        let mut raw = session
            .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")?
            .iter()
            .next()
            .and_then(|f| f.body().map(|b| b.to_vec()));

        if raw.is_none() {
            warn!("UID {uid} missing body on first fetch; retrying once");
            raw = session
                .uid_fetch(uid.to_string(), "(UID BODY.PEEK[])")?
                .iter()
                .next()
                .and_then(|f| f.body().map(|b| b.to_vec()));
        }
        session.logout()?;

        let raw = raw.ok_or_else(|| anyhow!("UID {uid}: missing body even after retry"))?;
        let alert = parse_alert(&raw);

        Ok(InboxMessage {
            id: id.clone(),
            subject: alert.subject,
            sender: alert.sender,
            body: alert.body,
        })
    }

    fn mark_read(&self, id: &MessageId) -> Result<()> {
        let uid = parse_uid(id)?;
        let mut session = self.open_inbox()?;
        session.uid_store(uid.to_string(), "+FLAGS (\\Seen)")?;
        session.logout()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xoauth2_payload_layout() {
        let bytes = build_xoauth2_bytes("me@example.com", "tok");
        assert_eq!(bytes, b"user=me@example.com\x01auth=Bearer tok\x01\x01".to_vec());
    }

    #[test]
    fn search_query_quotes_sender() {
        assert_eq!(
            search_query("scholaralerts-noreply@google.com"),
            "UNSEEN FROM \"scholaralerts-noreply@google.com\""
        );
        assert_eq!(search_query("a\"b"), "UNSEEN FROM \"a\\\"b\"");
    }

    #[test]
    fn uid_must_be_numeric() {
        assert_eq!(parse_uid(&"42".to_string()).unwrap(), 42);
        assert!(parse_uid(&"abc".to_string()).is_err());
    }
}
