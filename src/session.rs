//! Passthrough to the auth service. The portfolio never stores credentials, it only keeps the
//! [`Session`] the auth service hands back.
use catalog::payloads::SignupResponse;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{api::Api, error::ClientError};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl SessionUser {
    /// Name shown on comments before the server confirms them.
    pub fn display_name(&self) -> String {
        self.user_metadata
            .username
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Anonymous".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: SessionUser,
}

#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    auth_url: String,
    anon_key: String,
    api: Api,
}

impl AuthClient {
    pub fn new(auth_url: &str, anon_key: &str, api: Api) -> Self {
        Self {
            client: Client::new(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            api,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.auth_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|field| body.get(field).and_then(Value::as_str))
            .unwrap_or("Authentication failed")
            .to_string();

        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .client
            .post(self.url("token?grant_type=password"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: Session = Self::check(response).await?.json().await?;
        info!("Signed in as {}", session.user.id);

        Ok(session)
    }

    /// Accounts are created by the portfolio server so the email is confirmed right away.
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupResponse, ClientError> {
        self.api.signup(username, email, password).await
    }

    pub async fn reset_password(&self, email: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;

        Self::check(response).await?;

        Ok(())
    }

    pub async fn sign_out(&self, session: &Session) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        Self::check(response).await?;
        info!("Signed out {}", session.user.id);

        Ok(())
    }
}
