//! Domain email message.

/// A single outgoing email.
///
/// All fields are validated as non-empty by the HTTP layer before a message
/// reaches the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}
