use axum::http::{HeaderMap, header::AUTHORIZATION};
use catalog::EditId;
use reqwest::Url;

use crate::{error::AppError, state::AppState};

const AVATAR_ENDPOINT: &str = "https://ui-avatars.com/api/";

/// The token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub fn avatar_url(name: &str) -> Option<String> {
    Url::parse_with_params(
        AVATAR_ENDPOINT,
        &[("name", name), ("background", "8ab4f8"), ("color", "fff")],
    )
    .ok()
    .map(String::from)
}

pub fn known_edit(state: &AppState, edit_id: EditId) -> Result<EditId, AppError> {
    if state.catalog.contains(edit_id) {
        Ok(edit_id)
    } else {
        Err(AppError::UnknownEdit(edit_id))
    }
}
