//! Configuration for the gateway service.
//!
//! All settings come from environment variables; see [`Config::from_env`].

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::executor::RetryPolicy;
use crate::provider::{MailGunProvider, Provider, SendGridProvider};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_MS: u64 = 100;
const DEFAULT_MAILGUN_BASE_URL: &str = "https://api.mailgun.net";
const DEFAULT_SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";
const DEFAULT_API_VERSION: &str = "v3";

/// Which backend delivers email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderChoice {
    MailGun,
    SendGrid,
}

/// Gateway configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Timeout applied to every outbound attempt.
    pub http_timeout: Duration,
    /// Outbound retry policy.
    pub retry: RetryPolicy,
    /// Backend used for all sends.
    pub provider: ProviderChoice,
    /// MailGun settings.
    pub mail_gun: MailGunConfig,
    /// SendGrid settings.
    pub send_grid: SendGridConfig,
}

/// MailGun connection settings.
#[derive(Clone)]
pub struct MailGunConfig {
    pub base_url: String,
    pub version: String,
    pub domain: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// SendGrid connection settings.
#[derive(Clone)]
pub struct SendGridConfig {
    pub base_url: String,
    pub version: String,
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or boolean setting cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric or boolean setting cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let retries = parse(&get, "SEND_RETRIES", DEFAULT_RETRIES)?;
        let backoff_ms = parse(&get, "SEND_BACKOFF_MS", DEFAULT_BACKOFF_MS)?;
        let send_grid_default = parse_bool(&get, "IS_SENDGRID_DEFAULT", true)?;

        Ok(Self {
            port: parse(&get, "HTTP_PORT", DEFAULT_PORT)?,
            http_timeout: Duration::from_millis(parse(
                &get,
                "HTTP_TIMEOUT_MS",
                DEFAULT_HTTP_TIMEOUT_MS,
            )?),
            retry: RetryPolicy::new(retries, Duration::from_millis(backoff_ms)),
            provider: if send_grid_default {
                ProviderChoice::SendGrid
            } else {
                ProviderChoice::MailGun
            },
            mail_gun: MailGunConfig {
                base_url: get("MAILGUN_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_MAILGUN_BASE_URL.to_string()),
                version: get("MAILGUN_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                domain: get("MAILGUN_DOMAIN"),
                username: get("MAILGUN_USERNAME"),
                password: get("MAILGUN_PASSWORD"),
            },
            send_grid: SendGridConfig {
                base_url: get("SENDGRID_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_SENDGRID_BASE_URL.to_string()),
                version: get("SENDGRID_VERSION")
                    .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                api_key: get("SENDGRID_API_KEY"),
            },
        })
    }

    /// Build the selected provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if the selected provider's credentials are
    /// not set, or [`ConfigError::InvalidUrl`] if its endpoint does not parse.
    pub fn build_provider(&self) -> Result<Provider, ConfigError> {
        match self.provider {
            ProviderChoice::MailGun => {
                let cfg = &self.mail_gun;
                let provider = MailGunProvider::new(
                    &cfg.base_url,
                    &cfg.version,
                    required(cfg.domain.as_deref(), "MAILGUN_DOMAIN")?,
                    required(cfg.username.as_deref(), "MAILGUN_USERNAME")?,
                    required(cfg.password.as_deref(), "MAILGUN_PASSWORD")?,
                )?;
                Ok(provider.into())
            }
            ProviderChoice::SendGrid => {
                let cfg = &self.send_grid;
                let provider = SendGridProvider::new(
                    &cfg.base_url,
                    &cfg.version,
                    required(cfg.api_key.as_deref(), "SENDGRID_API_KEY")?,
                )?;
                Ok(provider.into())
            }
        }
    }
}

fn required<'a>(value: Option<&'a str>, key: &'static str) -> Result<&'a str, ConfigError> {
    value.ok_or(ConfigError::Missing(key))
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
