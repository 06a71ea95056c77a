//! Walks a running API through one viewer's visit.
//!
//! ```sh
//! REEL_API=http://localhost:1111 REEL_TOKEN=<access token> cargo run -p tester
//! ```
//!
//! Without `REEL_TOKEN` only the public reads run. Writes leave the account as they found it:
//! the like is toggled twice and an existing rating is sent again unchanged.
use std::env;

use anyhow::{Context, Error, bail};
use catalog::{Catalog, EditId};
use reel::{
    admin::check_admin,
    api::Api,
    interactions::{Interactions, Outcome},
    session::{Session, SessionUser, UserMetadata},
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Error> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let base_url = env::var("REEL_API").unwrap_or_else(|_| "http://localhost:1111".to_string());
    let api = Api::new(&base_url);

    let health = api.health().await.context("health check")?;
    info!("{base_url} is {}", health.status);

    let catalog = Catalog::embedded()?;
    let ids: Vec<_> = catalog.edits().iter().map(|edit| edit.id).collect();

    let interactions = Interactions::new(api.clone());
    let session = env::var("REEL_TOKEN").ok().map(|token| Session {
        access_token: token,
        refresh_token: None,
        user: SessionUser {
            id: "tester".to_string(),
            email: None,
            user_metadata: UserMetadata {
                username: Some("tester".to_string()),
            },
        },
    });
    interactions.set_session(session.clone());
    interactions.load(&ids).await;

    for edit in catalog.edits() {
        info!(
            "#{} {}: {} likes, {} comments, {:.1} stars ({})",
            edit.id,
            edit.title,
            interactions.likes_count(edit.id),
            interactions.comments(edit.id).len(),
            interactions.average_rating(edit.id),
            interactions.ratings_count(edit.id),
        );
    }

    let Some(session) = session else {
        warn!("REEL_TOKEN not set, skipping writes");
        return Ok(());
    };

    let Some(&edit_id) = ids.first() else {
        bail!("catalog is empty");
    };
    round_trip_writes(&interactions, edit_id).await?;

    info!("Admin: {}", check_admin(&api, Some(&session)).await);

    Ok(())
}

/// Likes twice and re-sends the viewer's own rating, leaving a real account as it was.
async fn round_trip_writes(interactions: &Interactions<Api>, edit_id: EditId) -> Result<(), Error> {
    let liked = interactions.is_liked(edit_id);

    for _ in 0..2 {
        if interactions.toggle_like(edit_id).await? == Outcome::Reverted {
            bail!("like on edit {edit_id} was rejected");
        }
    }
    if interactions.is_liked(edit_id) != liked {
        bail!("double toggle did not restore the like on edit {edit_id}");
    }

    match interactions.my_rating(edit_id) {
        Some(rating) => {
            if interactions.set_rating(edit_id, rating).await? == Outcome::Reverted {
                bail!("rating on edit {edit_id} was rejected");
            }
            info!(
                "Re-rated edit {edit_id} with {rating}, average now {:.1}",
                interactions.average_rating(edit_id)
            );
        }
        None => info!("No rating on edit {edit_id} yet, skipping rating write"),
    }

    Ok(())
}
