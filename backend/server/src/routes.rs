use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use catalog::{
    EditId,
    payloads::{
        AdminCheck, AdminData, AdminUsers, Comment, CommentRequest, CommentResponse,
        CommentsResponse, Health, LikesResponse, MAX_RATING, MIN_RATING, RatingRequest,
        RatingResponse, RatingsResponse, SignupRequest, SignupResponse, SuccessResponse,
        average_rating,
    },
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, NewUser},
    error::AppError,
    interactions,
    state::AppState,
    utils::{avatar_url, bearer_token, known_edit},
};

type Shared = State<Arc<AppState>>;

async fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    state
        .auth
        .verify_user(bearer_token(headers))
        .await
        .ok_or(AppError::Unauthorized)
}

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    state
        .auth
        .verify_admin(&state.config, bearer_token(headers))
        .await
        .ok_or(AppError::Forbidden("Unauthorized - Admin access required"))
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

/// Keeps path errors in the JSON shape every other failure uses.
fn edit_path<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(value)| value)
        .map_err(|_| AppError::BadRequest("Invalid edit id"))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|_| AppError::MalformedPayload)
}

pub async fn health_handler() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

pub async fn signup_handler(
    State(state): Shared,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Json<SignupResponse>, AppError> {
    let request = body(payload)?;

    let (Some(username), Some(email), Some(password)) = (
        present(&request.username),
        present(&request.email),
        request.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::BadRequest("Missing required fields"));
    };

    if state.config.is_admin_email(email) {
        warn!("Refused signup for admin address {email}");
        return Err(AppError::Forbidden(
            "Admin accounts are created in the auth service",
        ));
    }

    let user = state
        .auth
        .create_user(NewUser {
            username,
            email,
            password,
        })
        .await?;
    info!("Created user {}", user.id);

    Ok(Json(SignupResponse {
        success: true,
        message: "Account created, you can now sign in.".to_string(),
        user: user.profile(),
    }))
}

async fn likes_response(
    state: &AppState,
    edit_id: EditId,
    user: Option<&AuthUser>,
) -> Result<Json<LikesResponse>, AppError> {
    let likes = interactions::likes(&state.store, edit_id).await?;
    let is_liked = user.is_some_and(|user| likes.iter().any(|like| like.user_id == user.id));

    Ok(Json(LikesResponse {
        count: likes.len(),
        likes,
        is_liked,
    }))
}

pub async fn get_likes_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<LikesResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    let edit_id = known_edit(&state, edit_id)?;
    let user = state.auth.verify_user(bearer_token(&headers)).await;

    likes_response(&state, edit_id, user.as_ref()).await
}

pub async fn toggle_like_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<LikesResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    let user = require_user(&state, &headers).await?;
    let edit_id = known_edit(&state, edit_id)?;

    interactions::toggle_like(&state.store, edit_id, &user.id).await?;

    likes_response(&state, edit_id, Some(&user)).await
}

pub async fn like_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<LikesResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    set_like(&state, edit_id, &headers, true).await
}

pub async fn unlike_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<LikesResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    set_like(&state, edit_id, &headers, false).await
}

async fn set_like(
    state: &AppState,
    edit_id: EditId,
    headers: &HeaderMap,
    liked: bool,
) -> Result<Json<LikesResponse>, AppError> {
    let user = require_user(state, headers).await?;
    let edit_id = known_edit(state, edit_id)?;

    interactions::set_like(&state.store, edit_id, &user.id, liked).await?;

    likes_response(state, edit_id, Some(&user)).await
}

pub async fn get_comments_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
) -> Result<Json<CommentsResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    let edit_id = known_edit(&state, edit_id)?;

    Ok(Json(CommentsResponse {
        comments: interactions::comments(&state.store, edit_id).await?,
    }))
}

pub async fn add_comment_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Json<CommentResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    let user = require_user(&state, &headers).await?;
    let edit_id = known_edit(&state, edit_id)?;

    let text = body(payload)?
        .text
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(AppError::BadRequest("Comment text is required"))?;

    let username = user.display_name();
    let comment = Comment {
        id: Uuid::new_v4().to_string(),
        edit_id,
        user_id: user.id.clone(),
        avatar: avatar_url(&username),
        username,
        text,
        created_at: Utc::now(),
    };
    interactions::add_comment(&state.store, &comment).await?;

    Ok(Json(CommentResponse { comment }))
}

pub async fn delete_comment_handler(
    State(state): Shared,
    ids: Result<Path<(EditId, String)>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    let (edit_id, comment_id) = edit_path(ids)?;
    let user = require_user(&state, &headers).await?;
    let edit_id = known_edit(&state, edit_id)?;

    let comment = interactions::comment(&state.store, edit_id, &comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found"))?;

    if comment.user_id != user.id {
        return Err(AppError::Forbidden("Unauthorized to delete this comment"));
    }

    interactions::remove_comment(&state.store, edit_id, &comment_id).await?;

    Ok(Json(SuccessResponse { success: true }))
}

pub async fn get_ratings_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
) -> Result<Json<RatingsResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    let edit_id = known_edit(&state, edit_id)?;
    let user = state.auth.verify_user(bearer_token(&headers)).await;

    let ratings = interactions::ratings(&state.store, edit_id).await?;
    let (average, count) = average_rating(&ratings);
    let my_rating = user.and_then(|user| {
        ratings
            .iter()
            .find(|rating| rating.user_id == user.id)
            .map(|rating| rating.rating)
    });

    Ok(Json(RatingsResponse {
        ratings,
        average,
        count,
        my_rating,
    }))
}

pub async fn set_rating_handler(
    State(state): Shared,
    edit_id: Result<Path<EditId>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<RatingRequest>, JsonRejection>,
) -> Result<Json<RatingResponse>, AppError> {
    let edit_id = edit_path(edit_id)?;
    let user = require_user(&state, &headers).await?;
    let edit_id = known_edit(&state, edit_id)?;

    let rating = body(payload)?
        .rating
        .filter(|rating| (MIN_RATING..=MAX_RATING).contains(rating))
        .and_then(|rating| u8::try_from(rating).ok())
        .ok_or(AppError::BadRequest("Rating must be between 1 and 5"))?;

    interactions::upsert_rating(&state.store, edit_id, &user.id, rating).await?;

    let ratings = interactions::ratings(&state.store, edit_id).await?;
    let (average, count) = average_rating(&ratings);

    Ok(Json(RatingResponse {
        rating,
        average,
        count,
    }))
}

pub async fn admin_check_handler(State(state): Shared, headers: HeaderMap) -> Response {
    match require_admin(&state, &headers).await {
        Ok(admin) => Json(AdminCheck {
            is_admin: true,
            email: admin.email,
        })
        .into_response(),
        Err(_) => (
            StatusCode::FORBIDDEN,
            Json(AdminCheck {
                is_admin: false,
                email: None,
            }),
        )
            .into_response(),
    }
}

pub async fn admin_users_handler(
    State(state): Shared,
    headers: HeaderMap,
) -> Result<Json<AdminUsers>, AppError> {
    require_admin(&state, &headers).await?;

    let users = state.auth.list_users().await?;

    Ok(Json(AdminUsers {
        users: users.iter().map(AuthUser::profile).collect(),
    }))
}

pub async fn admin_data_handler(
    State(state): Shared,
    headers: HeaderMap,
) -> Result<Json<AdminData>, AppError> {
    require_admin(&state, &headers).await?;

    Ok(Json(interactions::admin_data(&state.store).await?))
}
