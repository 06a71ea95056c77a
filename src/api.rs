use std::future::Future;

use catalog::{
    EditId,
    payloads::{
        AdminCheck, AdminData, AdminUsers, Comment, CommentRequest, CommentResponse,
        CommentsResponse, ErrorBody, Health, LikesResponse, RatingRequest, RatingResponse,
        RatingsResponse, SignupRequest, SignupResponse, SuccessResponse,
    },
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;

/// The calls [`Interactions`](crate::interactions::Interactions) depends on.
pub trait Remote: Send + Sync {
    fn likes(
        &self,
        edit_id: EditId,
        token: Option<&str>,
    ) -> impl Future<Output = Result<LikesResponse, ClientError>> + Send;

    fn set_like(
        &self,
        token: &str,
        edit_id: EditId,
        liked: bool,
    ) -> impl Future<Output = Result<LikesResponse, ClientError>> + Send;

    fn comments(
        &self,
        edit_id: EditId,
    ) -> impl Future<Output = Result<Vec<Comment>, ClientError>> + Send;

    fn add_comment(
        &self,
        token: &str,
        edit_id: EditId,
        text: &str,
    ) -> impl Future<Output = Result<Comment, ClientError>> + Send;

    fn delete_comment(
        &self,
        token: &str,
        edit_id: EditId,
        comment_id: &str,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    fn ratings(
        &self,
        edit_id: EditId,
        token: Option<&str>,
    ) -> impl Future<Output = Result<RatingsResponse, ClientError>> + Send;

    fn set_rating(
        &self,
        token: &str,
        edit_id: EditId,
        rating: u8,
    ) -> impl Future<Output = Result<RatingResponse, ClientError>> + Send;
}

/// HTTP client for the portfolio API.
#[derive(Clone)]
pub struct Api {
    client: Client,
    base_url: String,
}

impl Api {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            debug!("Request failed with {status}: {message}");

            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<Health, ClientError> {
        Self::send(self.client.get(self.url("/health"))).await
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupResponse, ClientError> {
        let body = SignupRequest {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };

        Self::send(self.client.post(self.url("/auth/signup")).json(&body)).await
    }

    /// Toggle on the server. [`Remote::set_like`] is preferred, it is safe to retry.
    pub async fn toggle_like(&self, token: &str, edit_id: EditId) -> Result<LikesResponse, ClientError> {
        let request = self.client.post(self.url(&format!("/likes/{edit_id}")));

        Self::send(request.bearer_auth(token)).await
    }

    pub async fn admin_check(&self, token: &str) -> Result<AdminCheck, ClientError> {
        Self::send(self.client.get(self.url("/admin/check")).bearer_auth(token)).await
    }

    pub async fn admin_data(&self, token: &str) -> Result<AdminData, ClientError> {
        Self::send(self.client.get(self.url("/admin/data")).bearer_auth(token)).await
    }

    pub async fn admin_users(&self, token: &str) -> Result<AdminUsers, ClientError> {
        Self::send(self.client.get(self.url("/admin/users")).bearer_auth(token)).await
    }
}

impl Remote for Api {
    async fn likes(&self, edit_id: EditId, token: Option<&str>) -> Result<LikesResponse, ClientError> {
        let request = self.client.get(self.url(&format!("/likes/{edit_id}")));

        Self::send(Self::authorized(request, token)).await
    }

    async fn set_like(
        &self,
        token: &str,
        edit_id: EditId,
        liked: bool,
    ) -> Result<LikesResponse, ClientError> {
        let url = self.url(&format!("/likes/{edit_id}"));
        let request = if liked {
            self.client.put(url)
        } else {
            self.client.delete(url)
        };

        Self::send(request.bearer_auth(token)).await
    }

    async fn comments(&self, edit_id: EditId) -> Result<Vec<Comment>, ClientError> {
        let request = self.client.get(self.url(&format!("/comments/{edit_id}")));

        Ok(Self::send::<CommentsResponse>(request).await?.comments)
    }

    async fn add_comment(
        &self,
        token: &str,
        edit_id: EditId,
        text: &str,
    ) -> Result<Comment, ClientError> {
        let request = self
            .client
            .post(self.url(&format!("/comments/{edit_id}")))
            .bearer_auth(token)
            .json(&CommentRequest {
                text: Some(text.to_string()),
            });

        Ok(Self::send::<CommentResponse>(request).await?.comment)
    }

    async fn delete_comment(
        &self,
        token: &str,
        edit_id: EditId,
        comment_id: &str,
    ) -> Result<(), ClientError> {
        let request = self
            .client
            .delete(self.url(&format!("/comments/{edit_id}/{comment_id}")))
            .bearer_auth(token);

        Self::send::<SuccessResponse>(request).await?;

        Ok(())
    }

    async fn ratings(
        &self,
        edit_id: EditId,
        token: Option<&str>,
    ) -> Result<RatingsResponse, ClientError> {
        let request = self.client.get(self.url(&format!("/ratings/{edit_id}")));

        Self::send(Self::authorized(request, token)).await
    }

    async fn set_rating(
        &self,
        token: &str,
        edit_id: EditId,
        rating: u8,
    ) -> Result<RatingResponse, ClientError> {
        let request = self
            .client
            .post(self.url(&format!("/ratings/{edit_id}")))
            .bearer_auth(token)
            .json(&RatingRequest {
                rating: Some(i64::from(rating)),
            });

        Self::send(request).await
    }
}
