/// Opaque mailbox identifier (an IMAP UID rendered as a string).
pub type MessageId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: MessageId,
}

#[derive(Debug, Clone)]
pub struct InboxMessage {
    pub id: MessageId,
    pub subject: String,
    pub sender: String,
    /// Raw markup body, entity-decoded.
    pub body: String,
}
