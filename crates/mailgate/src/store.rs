//! Persistence hook for sent emails.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::message::EmailMessage;

/// Records emails before they are handed to a provider.
///
/// Failures are logged and ignored by the sender.
#[async_trait]
pub trait EmailStore: Send + Sync {
    async fn save(&self, email: &EmailMessage) -> Result<(), StoreError>;
}

/// Store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

#[async_trait]
impl EmailStore for NoopStore {
    async fn save(&self, _email: &EmailMessage) -> Result<(), StoreError> {
        Ok(())
    }
}
