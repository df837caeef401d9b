//! HTTP request handlers.

pub mod email;
pub mod health;

pub use email::{send_email_handler, EmailRequest, ValidationError};
pub use health::health_handler;
