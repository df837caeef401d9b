//! SendGrid v3 mail send API.

use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::Serialize;

use super::{endpoint, SEND_GRID};
use crate::error::{ConfigError, MutationError};
use crate::executor::RequestMutation;
use crate::message::EmailMessage;
use crate::transport::OutboundRequest;

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_PLAIN_TEXT: &str = "text/plain";

/// SendGrid backend: Bearer token, JSON body.
#[derive(Clone)]
pub struct SendGridProvider {
    url: Url,
    api_key: String,
}

impl SendGridProvider {
    /// Build the provider for `{base_url}/{version}/mail/send`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the endpoint is not a valid absolute URL.
    pub fn new(
        base_url: &str,
        version: &str,
        api_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            url: endpoint(SEND_GRID, &[base_url, version, "mail/send"])?,
            api_key: api_key.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Bearer auth plus JSON content type, then the serialized payload.
    #[must_use]
    pub fn request_mutations(&self, email: &EmailMessage) -> Vec<RequestMutation> {
        let api_key = self.api_key.clone();
        let auth = move |request: &mut OutboundRequest| -> Result<(), MutationError> {
            request.bearer_auth(&api_key)?;
            request.set_header(CONTENT_TYPE, CONTENT_TYPE_JSON)
        };

        let payload = SendGridPayload::from(email);
        let body = move |request: &mut OutboundRequest| -> Result<(), MutationError> {
            request.set_body(serde_json::to_vec(&payload)?);
            Ok(())
        };

        vec![Box::new(auth), Box::new(body)]
    }
}

impl std::fmt::Debug for SendGridProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridProvider")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SendGrid API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendGridPayload {
    personalizations: Vec<Personalization>,
    from: Address,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<Address>,
    subject: String,
}

#[derive(Debug, Serialize)]
struct Address {
    email: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: String,
}

impl From<&EmailMessage> for SendGridPayload {
    fn from(email: &EmailMessage) -> Self {
        Self {
            personalizations: vec![Personalization {
                // One recipient per send.
                to: vec![Address {
                    email: email.to_address.clone(),
                    name: email.to_name.clone(),
                }],
                subject: email.subject.clone(),
            }],
            from: Address {
                email: email.from_address.clone(),
                name: email.from_name.clone(),
            },
            content: vec![Content {
                content_type: CONTENT_TYPE_PLAIN_TEXT,
                value: email.body.clone(),
            }],
        }
    }
}
