pub mod decoders;
pub mod imap_client;

use anyhow::Result;

use crate::domain::email::{InboxMessage, MessageId, MessageRef};

/// Inbox operations the pipeline needs. Implementations must not mark a
/// message read as a side effect of reading it.
pub trait MailSource {
    fn list_unread(&self, sender: &str, max_results: usize) -> Result<Vec<MessageRef>>;
    fn get_details(&self, id: &MessageId) -> Result<InboxMessage>;
    fn mark_read(&self, id: &MessageId) -> Result<()>;
}
