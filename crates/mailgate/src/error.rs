//! Error types for the gateway.

use reqwest::header::InvalidHeaderValue;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised while a request mutation shapes an outbound request.
///
/// Mutations are deterministic, so these are never retried.
#[derive(Debug, Error)]
pub enum MutationError {
    /// A header value contained bytes that are not legal in HTTP headers
    #[error("invalid value for header {name}")]
    InvalidHeader {
        name: &'static str,
        #[source]
        source: InvalidHeaderValue,
    },

    /// JSON body serialization failed
    #[error("failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures to complete an HTTP exchange with a provider.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The per-attempt timeout elapsed
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other client-side HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

/// Outcome of a failed send, as reported to callers of the sender.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Building the request failed before anything was sent
    #[error("failed to build provider request: {0}")]
    Mutation(#[from] MutationError),

    /// Every attempt failed at the transport level
    #[error("delivery failed after {attempts} attempts")]
    TransportExhausted { attempts: u32 },

    /// The provider answered with an error status
    #[error("send failed: provider responded with {status}")]
    Rejected { status: StatusCode },
}

/// Persistence failure. Never surfaced to senders.
#[derive(Debug, Error)]
#[error("failed to persist email: {0}")]
pub struct StoreError(pub String);

/// Configuration errors raised at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// An environment variable could not be parsed
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// A provider endpoint did not form a valid URL
    #[error("invalid {provider} URL {url:?}: {reason}")]
    InvalidUrl {
        provider: &'static str,
        url: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_error_messages() {
        let exhausted = DeliveryError::TransportExhausted { attempts: 3 };
        assert_eq!(exhausted.to_string(), "delivery failed after 3 attempts");

        let rejected = DeliveryError::Rejected {
            status: StatusCode::BAD_GATEWAY,
        };
        assert_eq!(
            rejected.to_string(),
            "send failed: provider responded with 502 Bad Gateway"
        );
    }

    #[test]
    fn test_mutation_error_names_header() {
        let source = reqwest::header::HeaderValue::from_str("a\nb").unwrap_err();
        let err = MutationError::InvalidHeader {
            name: "Authorization",
            source,
        };
        assert_eq!(err.to_string(), "invalid value for header Authorization");
    }
}
