//! Email delivery providers.
//!
//! The set of providers is closed: each variant of [`Provider`] knows its
//! endpoint, its name, and how to turn an [`EmailMessage`] into the request
//! mutations its API expects. Adding a backend means adding a variant.

pub mod mailgun;
pub mod sendgrid;

pub use mailgun::MailGunProvider;
pub use sendgrid::SendGridProvider;

use reqwest::Url;

use crate::error::ConfigError;
use crate::executor::RequestMutation;
use crate::message::EmailMessage;

/// Name reported for the MailGun backend.
pub const MAIL_GUN: &str = "mail_gun";

/// Name reported for the SendGrid backend.
pub const SEND_GRID: &str = "send_grid";

/// The delivery backend selected at startup.
#[derive(Debug, Clone)]
pub enum Provider {
    MailGun(MailGunProvider),
    SendGrid(SendGridProvider),
}

impl Provider {
    /// Fixed delivery endpoint, resolved when the provider was built.
    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            Self::MailGun(p) => p.url(),
            Self::SendGrid(p) => p.url(),
        }
    }

    /// Identifier used for log and error attribution.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MailGun(_) => MAIL_GUN,
            Self::SendGrid(_) => SEND_GRID,
        }
    }

    /// Mutations that authenticate and encode `email` for this backend,
    /// auth first, body second.
    #[must_use]
    pub fn request_mutations(&self, email: &EmailMessage) -> Vec<RequestMutation> {
        match self {
            Self::MailGun(p) => p.request_mutations(email),
            Self::SendGrid(p) => p.request_mutations(email),
        }
    }
}

impl From<MailGunProvider> for Provider {
    fn from(provider: MailGunProvider) -> Self {
        Self::MailGun(provider)
    }
}

impl From<SendGridProvider> for Provider {
    fn from(provider: SendGridProvider) -> Self {
        Self::SendGrid(provider)
    }
}

/// Join URL segments, tolerating stray slashes, and parse the result.
fn endpoint(provider: &'static str, segments: &[&str]) -> Result<Url, ConfigError> {
    let raw = segments
        .iter()
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
        provider,
        url: raw.clone(),
        reason: e.to_string(),
    })
}
