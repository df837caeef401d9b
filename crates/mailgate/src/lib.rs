//! Email sending gateway.
//!
//! This crate accepts an email over HTTP, validates and sanitizes it, and
//! forwards it to one of two interchangeable delivery providers, retrying
//! transient failures with exponential backoff.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use mailgate::{
//!     EmailMessage, EmailSender, HttpTransport, RetryPolicy, RetryableExecutor, SendEmail,
//!     SendGridProvider,
//! };
//!
//! # async fn run() -> anyhow::Result<()> {
//! let provider = SendGridProvider::new("https://api.sendgrid.com", "v3", "SG.key")?;
//! let transport = HttpTransport::new(Duration::from_secs(2))?;
//! let executor = RetryableExecutor::new(
//!     Arc::new(transport),
//!     RetryPolicy::new(3, Duration::from_millis(100)),
//! );
//! let sender = EmailSender::new(provider.into(), executor);
//!
//! sender
//!     .send(EmailMessage {
//!         from_address: "noreply@example.com".to_string(),
//!         from_name: "Example".to_string(),
//!         to_address: "user@example.com".to_string(),
//!         to_name: "User".to_string(),
//!         subject: "Hello".to_string(),
//!         body: "Hi there".to_string(),
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`Transport`] performs a single HTTP exchange ([`HttpTransport`] in production)
//! - [`RetryableExecutor`] builds a request from [`RequestMutation`]s and retries transport failures
//! - [`Provider`] turns an [`EmailMessage`] into the mutations its API needs
//! - [`EmailSender`] ties a provider to an executor and a persistence hook
//! - [`server`] exposes `POST /email` and `GET /health`

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod message;
pub mod provider;
pub mod sanitize;
pub mod sender;
pub mod server;
pub mod store;
pub mod transport;

pub use config::Config;
pub use error::{ConfigError, DeliveryError, MutationError, StoreError, TransportError};
pub use executor::{RequestMutation, RetryPolicy, RetryableExecutor};
pub use message::EmailMessage;
pub use provider::{MailGunProvider, Provider, SendGridProvider};
pub use sender::{EmailSender, SendEmail};
pub use store::{EmailStore, NoopStore};
pub use transport::{HttpTransport, OutboundRequest, RequestBody, Transport, TransportResponse};
