//! MailGun messages API.

use reqwest::Url;

use super::{endpoint, MAIL_GUN};
use crate::error::{ConfigError, MutationError};
use crate::executor::RequestMutation;
use crate::message::EmailMessage;
use crate::transport::OutboundRequest;

/// MailGun backend: Basic auth, multipart form body.
#[derive(Clone)]
pub struct MailGunProvider {
    url: Url,
    username: String,
    password: String,
}

impl MailGunProvider {
    /// Build the provider for `{base_url}/{version}/{domain}/messages`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the endpoint is not a valid absolute URL.
    pub fn new(
        base_url: &str,
        version: &str,
        domain: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            url: endpoint(MAIL_GUN, &[base_url, version, domain, "messages"])?,
            username: username.into(),
            password: password.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Basic auth, then a multipart body with `from`, `to`, `subject` and `text`.
    ///
    /// Display names are not part of MailGun's encoding. The transport sets
    /// the multipart `Content-Type` when it encodes the form.
    #[must_use]
    pub fn request_mutations(&self, email: &EmailMessage) -> Vec<RequestMutation> {
        let username = self.username.clone();
        let password = self.password.clone();
        let auth = move |request: &mut OutboundRequest| request.basic_auth(&username, &password);

        let fields = Self::form_fields(email);
        let body = move |request: &mut OutboundRequest| -> Result<(), MutationError> {
            request.set_form(fields);
            Ok(())
        };

        vec![Box::new(auth), Box::new(body)]
    }

    fn form_fields(email: &EmailMessage) -> [(&'static str, String); 4] {
        [
            ("from", email.from_address.clone()),
            ("to", email.to_address.clone()),
            ("subject", email.subject.clone()),
            ("text", email.body.clone()),
        ]
    }
}

impl std::fmt::Debug for MailGunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailGunProvider")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
