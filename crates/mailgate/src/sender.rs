//! Email sending orchestration.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, Instrument, Span};

use crate::error::DeliveryError;
use crate::executor::RetryableExecutor;
use crate::message::EmailMessage;
use crate::provider::Provider;
use crate::store::{EmailStore, NoopStore};

/// Anything that can deliver an email. The HTTP layer only sees this trait.
#[async_trait]
pub trait SendEmail: Send + Sync {
    /// Deliver `email` or report why it could not be delivered.
    async fn send(&self, email: EmailMessage) -> Result<(), DeliveryError>;
}

/// Sends every email through the one provider chosen at startup.
///
/// There is no failover: a failed send is reported, not rerouted.
pub struct EmailSender {
    provider: Provider,
    executor: RetryableExecutor,
    store: Arc<dyn EmailStore>,
    span: Span,
}

impl EmailSender {
    /// Create a sender with a no-op store and a span named after the provider.
    #[must_use]
    pub fn new(provider: Provider, executor: RetryableExecutor) -> Self {
        let span = tracing::info_span!("email_sender", provider = provider.name());
        Self {
            provider,
            executor,
            store: Arc::new(NoopStore),
            span,
        }
    }

    /// Replace the persistence hook.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn EmailStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the span that scopes this sender's log events.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

#[async_trait]
impl SendEmail for EmailSender {
    async fn send(&self, email: EmailMessage) -> Result<(), DeliveryError> {
        let provider = self.provider.name();

        async move {
            if let Err(e) = self.store.save(&email).await {
                debug!(error = %e, "Ignoring store failure");
            }

            let mutations = self.provider.request_mutations(&email);
            match self.executor.post(self.provider.url(), mutations).await {
                Ok(()) => {
                    info!(provider, "Email sent successfully");
                    Ok(())
                }
                Err(e) => {
                    error!(provider, error = %e, "Failed to send email");
                    Err(e)
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}
