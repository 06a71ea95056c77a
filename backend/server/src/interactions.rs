//! Typed access to likes, comments and ratings on top of [`Store`] rows.
use catalog::{
    EditId,
    payloads::{AdminData, AdminLike, AdminRating, Comment, Like, Rating},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::database::{Store, StoreError};

pub const LIKES: &str = "likes:";
pub const COMMENTS: &str = "comments:";
pub const RATINGS: &str = "ratings:";

#[derive(Serialize, Deserialize)]
struct LikeRow {
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RatingRow {
    rating: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub fn table(kind: &str, edit_id: EditId) -> String {
    format!("{kind}{edit_id}")
}

fn edit_of(kind: &str, table: &str) -> Option<EditId> {
    let edit_id = table.strip_prefix(kind)?.parse().ok();
    if edit_id.is_none() {
        warn!("Skipping table with unexpected name {table}");
    }

    edit_id
}

fn decode<T: DeserializeOwned>(table: &str, value: &str) -> Result<T, StoreError> {
    serde_json::from_str(value).map_err(|source| StoreError::Corrupt {
        table: table.to_string(),
        source,
    })
}

/// Oldest first.
pub async fn likes(store: &Store, edit_id: EditId) -> Result<Vec<Like>, StoreError> {
    let table = table(LIKES, edit_id);

    let mut likes = store
        .rows(&table)
        .await?
        .into_iter()
        .map(|(user_id, value)| {
            let row: LikeRow = decode(&table, &value)?;
            Ok(Like {
                user_id,
                created_at: row.created_at,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    likes.sort_by(|a, b| (a.created_at, &a.user_id).cmp(&(b.created_at, &b.user_id)));

    Ok(likes)
}

/// Returns whether the user likes the edit afterwards.
pub async fn toggle_like(store: &Store, edit_id: EditId, user_id: &str) -> Result<bool, StoreError> {
    let row = serde_json::to_string(&LikeRow {
        created_at: Utc::now(),
    })?;

    let liked = store.toggle(&table(LIKES, edit_id), user_id, &row).await?;

    #[cfg(feature = "verbose")]
    tracing::info!("Toggled like on edit {edit_id} for {user_id}: {liked}");

    Ok(liked)
}

/// Idempotent: liking twice keeps the first timestamp.
pub async fn set_like(
    store: &Store,
    edit_id: EditId,
    user_id: &str,
    liked: bool,
) -> Result<(), StoreError> {
    let table = table(LIKES, edit_id);

    #[cfg(feature = "verbose")]
    tracing::info!("Setting like on {table} for {user_id} to {liked}");

    if liked {
        let row = serde_json::to_string(&LikeRow {
            created_at: Utc::now(),
        })?;
        store.insert(&table, user_id, &row).await?;
    } else {
        store.remove(&table, user_id).await?;
    }

    Ok(())
}

/// Oldest first, ties broken by id.
pub async fn comments(store: &Store, edit_id: EditId) -> Result<Vec<Comment>, StoreError> {
    let table = table(COMMENTS, edit_id);

    let mut comments = store
        .rows(&table)
        .await?
        .iter()
        .map(|(_, value)| decode::<Comment>(&table, value))
        .collect::<Result<Vec<_>, _>>()?;
    comments.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));

    Ok(comments)
}

pub async fn comment(
    store: &Store,
    edit_id: EditId,
    comment_id: &str,
) -> Result<Option<Comment>, StoreError> {
    let table = table(COMMENTS, edit_id);

    store
        .get(&table, comment_id)
        .await?
        .map(|value| decode(&table, &value))
        .transpose()
}

pub async fn add_comment(store: &Store, comment: &Comment) -> Result<(), StoreError> {
    let row = serde_json::to_string(comment)?;

    store
        .put(&table(COMMENTS, comment.edit_id), &comment.id, &row)
        .await
}

pub async fn remove_comment(
    store: &Store,
    edit_id: EditId,
    comment_id: &str,
) -> Result<bool, StoreError> {
    store.remove(&table(COMMENTS, edit_id), comment_id).await
}

/// Oldest first.
pub async fn ratings(store: &Store, edit_id: EditId) -> Result<Vec<Rating>, StoreError> {
    let table = table(RATINGS, edit_id);

    let mut ratings = store
        .rows(&table)
        .await?
        .into_iter()
        .map(|(user_id, value)| {
            let row: RatingRow = decode(&table, &value)?;
            Ok(Rating {
                user_id,
                rating: row.rating,
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;
    ratings.sort_by(|a, b| (a.created_at, &a.user_id).cmp(&(b.created_at, &b.user_id)));

    Ok(ratings)
}

/// One rating per user and edit; a second call replaces the value and keeps `created_at`.
pub async fn upsert_rating(
    store: &Store,
    edit_id: EditId,
    user_id: &str,
    rating: u8,
) -> Result<Rating, StoreError> {
    let table = table(RATINGS, edit_id);
    let now = Utc::now();

    let created_at = match store.get(&table, user_id).await? {
        Some(value) => decode::<RatingRow>(&table, &value)?.created_at,
        None => now,
    };

    let row = RatingRow {
        rating,
        created_at,
        updated_at: now,
    };
    store
        .put(&table, user_id, &serde_json::to_string(&row)?)
        .await?;

    Ok(Rating {
        user_id: user_id.to_string(),
        rating,
        created_at,
        updated_at: now,
    })
}

/// Everything, grouped by edit in ascending id order.
pub async fn admin_data(store: &Store) -> Result<AdminData, StoreError> {
    let mut data = AdminData {
        likes: Vec::new(),
        comments: Vec::new(),
        ratings: Vec::new(),
    };

    for edit_id in edit_ids(store, LIKES).await? {
        data.likes.extend(likes(store, edit_id).await?.into_iter().map(|like| AdminLike {
            edit_id,
            user_id: like.user_id,
            created_at: like.created_at,
        }));
    }

    for edit_id in edit_ids(store, COMMENTS).await? {
        data.comments.extend(comments(store, edit_id).await?);
    }

    for edit_id in edit_ids(store, RATINGS).await? {
        data.ratings
            .extend(ratings(store, edit_id).await?.into_iter().map(|rating| AdminRating {
                edit_id,
                user_id: rating.user_id,
                rating: rating.rating,
            }));
    }

    Ok(data)
}

async fn edit_ids(store: &Store, kind: &str) -> Result<Vec<EditId>, StoreError> {
    let mut ids: Vec<EditId> = store
        .tables(kind)
        .await?
        .iter()
        .filter_map(|table| edit_of(kind, table))
        .collect();
    ids.sort_unstable();

    Ok(ids)
}
