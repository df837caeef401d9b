//! Retrying request executor.
//!
//! A request is built once from a list of [`RequestMutation`]s and then
//! issued through a [`Transport`] with bounded retries and exponential
//! backoff. Only transport failures (timeouts, refused connections) are
//! retried; a response with an error status ends the send immediately.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use tracing::{debug, error, warn};

use crate::error::{DeliveryError, MutationError};
use crate::transport::{OutboundRequest, Transport};

/// One step that shapes an outbound request (auth, body, headers).
pub type RequestMutation =
    Box<dyn FnOnce(&mut OutboundRequest) -> Result<(), MutationError> + Send>;

/// Retry count and backoff base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first one.
    pub retries: u32,
    /// Delay before the first retry; doubled for each later retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(retries: u32, backoff: Duration) -> Self {
        Self { retries, backoff }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub const fn no_retries() -> Self {
        Self::new(0, Duration::ZERO)
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }

    /// Sleep before the 0-indexed `attempt`: nothing before the first,
    /// `backoff * 2^(attempt - 1)` before every later one.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.backoff.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Issues POST requests with bounded retries.
///
/// Holds no per-request state, so one executor can serve any number of
/// concurrent sends.
#[derive(Clone)]
pub struct RetryableExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl RetryableExecutor {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Build a POST to `url`, apply `mutations` in order, then deliver it.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::Mutation`] if any mutation fails (nothing is sent)
    /// - [`DeliveryError::TransportExhausted`] if every attempt fails at the transport level
    /// - [`DeliveryError::Rejected`] if the provider answers with a status >= 400
    pub async fn post(
        &self,
        url: &Url,
        mutations: Vec<RequestMutation>,
    ) -> Result<(), DeliveryError> {
        let mut request = OutboundRequest::post(url.clone());
        for mutation in mutations {
            if let Err(e) = mutation(&mut request) {
                error!(url = %url, error = %e, "Failed to build provider request");
                return Err(e.into());
            }
        }

        let max_attempts = self.policy.max_attempts();
        for attempt in 0..max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }

            match self.transport.send(&request).await {
                Ok(response) if response.status.as_u16() >= 400 => {
                    error!(
                        url = %url,
                        attempt = attempt + 1,
                        status = %response.status,
                        "Provider rejected request"
                    );
                    return Err(DeliveryError::Rejected {
                        status: response.status,
                    });
                }
                Ok(response) => {
                    debug!(
                        url = %url,
                        attempt = attempt + 1,
                        status = %response.status,
                        "Request succeeded"
                    );
                    return Ok(());
                }
                Err(e) => {
                    if attempt + 1 == max_attempts {
                        error!(
                            url = %url,
                            attempts = max_attempts,
                            error = %e,
                            "Failed to deliver request after exhausting attempts"
                        );
                    } else {
                        warn!(
                            url = %url,
                            attempt = attempt + 1,
                            error = %e,
                            "Transport error, will retry"
                        );
                    }
                }
            }
        }

        Err(DeliveryError::TransportExhausted {
            attempts: max_attempts,
        })
    }
}
