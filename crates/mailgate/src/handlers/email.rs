//! `POST /email` handler.
//!
//! Binds and validates the inbound payload, converts the body to plain
//! text, and hands the resulting [`EmailMessage`] to the configured sender.

use std::sync::LazyLock;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::message::EmailMessage;
use crate::sanitize::html_to_text;
use crate::server::AppState;

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Inbound email payload. Every field is required; absence is reported by name.
#[derive(Debug, Default, Deserialize)]
pub struct EmailRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub from_name: Option<String>,
    pub to_name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

/// Problems with an inbound payload, reported to the client verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("the following fields are missing: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("the following email addresses are invalid: {}", .0.join(", "))]
    InvalidAddresses(Vec<String>),
}

impl EmailRequest {
    /// Validate the payload and build the message to send.
    ///
    /// The body is reduced to plain text first, so a body made only of
    /// markup counts as missing.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] listing every missing field, or else every
    /// malformed address.
    pub fn into_message(self) -> Result<EmailMessage, ValidationError> {
        let body = self.body.as_deref().map(html_to_text);

        let fields = [
            ("from", self.from.as_deref()),
            ("to", self.to.as_deref()),
            ("from_name", self.from_name.as_deref()),
            ("to_name", self.to_name.as_deref()),
            ("subject", self.subject.as_deref()),
            ("body", body.as_deref()),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }

        let email = EmailMessage {
            from_address: self.from.unwrap_or_default(),
            from_name: self.from_name.unwrap_or_default(),
            to_address: self.to.unwrap_or_default(),
            to_name: self.to_name.unwrap_or_default(),
            subject: self.subject.unwrap_or_default(),
            body: body.unwrap_or_default(),
        };

        let invalid: Vec<String> = [&email.from_address, &email.to_address]
            .into_iter()
            .filter(|address| !is_valid_address(address))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(ValidationError::InvalidAddresses(invalid));
        }

        Ok(email)
    }
}

fn is_valid_address(address: &str) -> bool {
    EMAIL_ADDRESS.is_match(address)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Handle `POST /email`.
pub async fn send_email_handler(
    State(state): State<AppState>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Response {
    let started = Instant::now();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Malformed email request");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let email = match request.into_message() {
        Ok(email) => email,
        Err(e) => {
            warn!(error = %e, "Invalid email request");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    if let Err(e) = state.sender.send(email).await {
        // Provider details stay in the logs.
        error!(error = %e, "Email delivery failed");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to send email");
    }

    info!(
        latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Email delivered"
    );
    (
        StatusCode::OK,
        Json(json!({ "message": "email sent successfully" })),
    )
        .into_response()
}
