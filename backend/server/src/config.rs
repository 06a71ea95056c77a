use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("{0} is required when AUTH_URL is set")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` keeps interactions in process memory.
    pub redis_url: Option<String>,
    /// Base URL of the auth service. `None` switches to the in-memory user directory.
    pub auth_url: Option<String>,
    pub auth_service_key: Option<String>,
    pub admin_emails: Vec<String>,
    /// `None` serves the catalog compiled into the binary.
    pub catalog_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let auth_url = optional("AUTH_URL");
        let auth_service_key = read_secret("AUTH_SERVICE_KEY");

        if auth_url.is_some() && auth_service_key.is_none() {
            return Err(ConfigError::MissingSecret("AUTH_SERVICE_KEY"));
        }

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            redis_url: optional("REDIS_URL"),
            auth_url,
            auth_service_key,
            admin_emails: admin_emails(),
            catalog_url: optional("CATALOG_URL"),
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            redis_url: None,
            auth_url: None,
            auth_service_key: None,
            admin_emails: Vec::new(),
            catalog_url: None,
        }
    }
}

/// Comma separated `ADMIN_EMAILS`. Unset means nobody is an admin.
fn admin_emails() -> Vec<String> {
    let emails = optional("ADMIN_EMAILS")
        .map(|list| parse_emails(&list))
        .unwrap_or_default();

    if emails.is_empty() {
        warn!("ADMIN_EMAILS not set, admin routes are closed");
    }

    emails
}

pub fn parse_emails(list: &str) -> Vec<String> {
    list.split(',')
        .map(|email| email.trim().to_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found");
    })
}

fn optional(key: &str) -> Option<String> {
    var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

/// Docker secret first, then a plain environment variable of the same name.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Failed to read {secret_name} from file: {e}");
        })
        .ok()
        .or_else(|| optional(secret_name))
}
