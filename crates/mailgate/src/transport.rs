//! Outbound HTTP transport.
//!
//! The [`Transport`] trait is the only seam between the gateway and the
//! network. It carries no retry logic; see [`crate::executor`] for that.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode, Url};

use crate::error::{MutationError, TransportError};

/// Body of an [`OutboundRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Raw bytes sent as-is.
    Bytes(Bytes),
    /// Text fields sent as `multipart/form-data`. The transport encodes them
    /// on every attempt and sets the boundary `Content-Type` itself.
    Form(Vec<(String, String)>),
}

impl RequestBody {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Form(fields) => fields.is_empty(),
        }
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::Bytes(Bytes::new())
    }
}

/// Request under construction, shaped by request mutations before sending.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl OutboundRequest {
    /// A POST to `url` with no headers and an empty body.
    #[must_use]
    pub fn post(url: Url) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::default(),
        }
    }

    /// Set (replace) a header.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::InvalidHeader`] if `value` is not a legal header value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<(), MutationError> {
        let value = header_value(&name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Set HTTP Basic credentials.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::InvalidHeader`] if the encoded credentials are rejected.
    pub fn basic_auth(&mut self, username: &str, password: &str) -> Result<(), MutationError> {
        let encoded = BASE64.encode(format!("{username}:{password}"));
        self.set_sensitive(AUTHORIZATION, &format!("Basic {encoded}"))
    }

    /// Set a Bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::InvalidHeader`] if the token is not a legal header value.
    pub fn bearer_auth(&mut self, token: &str) -> Result<(), MutationError> {
        self.set_sensitive(AUTHORIZATION, &format!("Bearer {token}"))
    }

    /// Replace the request body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = RequestBody::Bytes(body.into());
    }

    /// Replace the request body with multipart form fields, in order.
    ///
    /// Any `Content-Type` already set is dropped; the boundary is only known
    /// once the transport encodes the form.
    pub fn set_form<N, V>(&mut self, fields: impl IntoIterator<Item = (N, V)>)
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.headers.remove(CONTENT_TYPE);
        self.body = RequestBody::Form(
            fields
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        );
    }

    fn set_sensitive(&mut self, name: HeaderName, value: &str) -> Result<(), MutationError> {
        let mut value = header_value(&name, value)?;
        value.set_sensitive(true);
        self.headers.insert(name, value);
        Ok(())
    }
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, MutationError> {
    HeaderValue::from_str(value).map_err(|source| MutationError::InvalidHeader {
        name: header_label(name),
        source,
    })
}

/// Static label for the headers the gateway sets, used in error messages.
fn header_label(name: &HeaderName) -> &'static str {
    match name.as_str() {
        "authorization" => "Authorization",
        "content-type" => "Content-Type",
        _ => "custom",
    }
}

/// A fully-read provider response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Single-shot HTTP exchange. Implementations must be safe to share across tasks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `request` once.
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport that applies `timeout` to every attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &OutboundRequest) -> Result<TransportResponse, TransportError> {
        let builder = self
            .client
            .request(request.method.clone(), request.url.clone());

        // A form is consumed by sending, so each attempt encodes a fresh one.
        let builder = match &request.body {
            RequestBody::Bytes(bytes) => builder
                .headers(request.headers.clone())
                .body(bytes.clone()),
            RequestBody::Form(fields) => {
                let mut headers = request.headers.clone();
                headers.remove(CONTENT_TYPE);
                builder.headers(headers).multipart(form(fields))
            }
        };

        let response = builder.send().await?;

        let status = response.status();
        // Reading the body to the end hands the connection back to the pool.
        let body = response.bytes().await?;

        Ok(TransportResponse { status, body })
    }
}

fn form(fields: &[(String, String)]) -> Form {
    fields
        .iter()
        .fold(Form::new(), |form, (name, value)| {
            form.text(name.clone(), value.clone())
        })
}
