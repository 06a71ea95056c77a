//! # Auth
//!
//! Accounts live in an external auth service (GoTrue-compatible REST API). The server never
//! sees passwords except when forwarding a signup.
//!
//! ## Calls
//!
//! - `GET /auth/v1/user` with the caller's bearer token: who is this?
//! - `POST /auth/v1/admin/users` with the service key: signup, email already confirmed
//! - `GET /auth/v1/admin/users` with the service key: admin user list
//!
//! ## Admins
//!
//! A user is an admin when their email is confirmed and appears in `ADMIN_EMAILS`.
//!
//! ## Local Mode
//!
//! Without `AUTH_URL` the server keeps users in memory. Signup returns the user id, and that
//! id doubles as the bearer token. Only meant for local runs and tests.
use std::sync::Arc;

use catalog::payloads::UserProfile;
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),

    #[error("Auth service unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Auth service answered {status}: {message}")]
    Service { status: StatusCode, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl AuthUser {
    /// Metadata username, else the local part of the email, else "Anonymous".
    pub fn display_name(&self) -> String {
        self.user_metadata
            .username
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                self.email
                    .as_deref()
                    .and_then(|email| email.split('@').next())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or("Anonymous")
            .to_string()
    }

    pub fn verified_email(&self) -> Option<&str> {
        self.email_confirmed_at.as_ref()?;
        self.email.as_deref()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            email: self.email.clone(),
            username: self
                .user_metadata
                .username
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            created_at: self.created_at.clone(),
            last_sign_in: self.last_sign_in_at.clone(),
            email_confirmed: self.email_confirmed_at.is_some(),
        }
    }
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Clone)]
pub enum AuthService {
    Remote(RemoteAuth),
    Memory(MemoryDirectory),
}

impl AuthService {
    pub fn from_config(config: &Config) -> Self {
        match (&config.auth_url, &config.auth_service_key) {
            (Some(url), Some(key)) => {
                info!("Using auth service at {url}");
                AuthService::Remote(RemoteAuth::new(url, key))
            }
            _ => {
                warn!("AUTH_URL not set, keeping users in memory");
                AuthService::Memory(MemoryDirectory::default())
            }
        }
    }

    /// Resolves a bearer token. Any failure reads as anonymous.
    pub async fn verify_user(&self, token: Option<&str>) -> Option<AuthUser> {
        let token = token?;

        let result = match self {
            AuthService::Remote(remote) => remote.user(token).await,
            AuthService::Memory(directory) => Ok(directory.user(token).await),
        };

        result.unwrap_or_else(|e| {
            warn!("Auth error: {e}");
            None
        })
    }

    /// A verified user whose confirmed email is on the allowlist.
    pub async fn verify_admin(&self, config: &Config, token: Option<&str>) -> Option<AuthUser> {
        let user = self.verify_user(token).await?;

        match user.verified_email() {
            Some(email) if config.is_admin_email(email) => Some(user),
            _ => {
                info!("Admin access refused for user {}", user.id);
                None
            }
        }
    }

    pub async fn create_user(&self, new_user: NewUser<'_>) -> Result<AuthUser, AuthError> {
        match self {
            AuthService::Remote(remote) => remote.create_user(new_user).await,
            AuthService::Memory(directory) => directory.create_user(new_user).await,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<AuthUser>, AuthError> {
        match self {
            AuthService::Remote(remote) => remote.list_users().await,
            AuthService::Memory(directory) => Ok(directory.list_users().await),
        }
    }
}

#[derive(Clone)]
pub struct RemoteAuth {
    client: Client,
    base_url: String,
    service_key: String,
}

#[derive(Deserialize)]
struct UserList {
    users: Vec<AuthUser>,
}

impl RemoteAuth {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    async fn user(&self, token: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self
            .client
            .get(self.url("user"))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(service_error(status, response).await),
        }
    }

    async fn create_user(&self, new_user: NewUser<'_>) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .post(self.url("admin/users"))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({
                "email": new_user.email,
                "password": new_user.password,
                "user_metadata": { "username": new_user.username },
                "email_confirm": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AuthError::Rejected(error_message(response).await));
        }
        if !status.is_success() {
            return Err(service_error(status, response).await);
        }

        Ok(response.json().await?)
    }

    async fn list_users(&self) -> Result<Vec<AuthUser>, AuthError> {
        let response = self
            .client
            .get(self.url("admin/users"))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(service_error(status, response).await);
        }

        Ok(response.json::<UserList>().await?.users)
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap_or(Value::Null);

    ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .unwrap_or("Request rejected by auth service")
        .to_string()
}

async fn service_error(status: StatusCode, response: reqwest::Response) -> AuthError {
    AuthError::Service {
        status,
        message: error_message(response).await,
    }
}

/// Token to user map for local runs and tests.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    users: Arc<RwLock<Vec<(String, AuthUser)>>>,
}

impl MemoryDirectory {
    pub async fn add(&self, token: &str, user: AuthUser) {
        self.users.write().await.push((token.to_string(), user));
    }

    async fn user(&self, token: &str) -> Option<AuthUser> {
        self.users
            .read()
            .await
            .iter()
            .find(|(known, _)| known == token)
            .map(|(_, user)| user.clone())
    }

    async fn create_user(&self, new_user: NewUser<'_>) -> Result<AuthUser, AuthError> {
        let mut users = self.users.write().await;

        let taken = users.iter().any(|(_, user)| {
            user.email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(new_user.email))
        });
        if taken {
            return Err(AuthError::Rejected(
                "A user with this email address has already been registered".to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(new_user.email.to_string()),
            user_metadata: UserMetadata {
                username: Some(new_user.username.to_string()),
            },
            created_at: Some(now.clone()),
            last_sign_in_at: None,
            email_confirmed_at: Some(now),
        };
        users.push((user.id.clone(), user.clone()));

        Ok(user)
    }

    async fn list_users(&self) -> Vec<AuthUser> {
        self.users
            .read()
            .await
            .iter()
            .map(|(_, user)| user.clone())
            .collect()
    }
}
