//! Documentation of the reel portfolio API.
//!
//! Serves likes, comments and star ratings for the edits in the [`catalog`], plus an
//! allowlisted admin view over all of them.
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/health` | none |
//! | POST | `/auth/signup` | none |
//! | GET | `/likes/{editId}` | optional |
//! | POST | `/likes/{editId}` (toggle) | user |
//! | PUT, DELETE | `/likes/{editId}` | user |
//! | GET | `/comments/{editId}` | none |
//! | POST | `/comments/{editId}` | user |
//! | DELETE | `/comments/{editId}/{commentId}` | author |
//! | GET | `/ratings/{editId}` | optional |
//! | POST | `/ratings/{editId}` | user |
//! | GET | `/admin/check`, `/admin/users`, `/admin/data` | admin |
//!
//! Users authenticate with `Authorization: Bearer <access token>` issued by the auth service,
//! see [`auth`].
//!
//!
//!
//! # Notes
//!
//! ## Why PUT/DELETE on likes
//! The toggle is kept for older clients, but a toggle sent twice by a double click cancels
//! itself. The client sends the state it wants instead, so retries and reordering are harmless.
//!
//! ## Storage
//! Redis hashes, one row per interaction, see [`database`]. Without `REDIS_URL` everything
//! lives in memory and is lost on restart.
//!
//!
//!
//! # Setup
//!
//! Environment, all optional:
//! ```sh
//! RUST_PORT=1111
//! REDIS_URL=redis://localhost:6379
//! AUTH_URL=https://project.supabase.co
//! ADMIN_EMAILS=owner@example.com
//! CATALOG_URL=https://example.com/catalog.json
//! RUST_LOG=info
//! ```
//!
//! Secret, read from `/run/secrets/AUTH_SERVICE_KEY` or the environment. Required with
//! `AUTH_URL`.
//!
//! Run.
//! ```sh
//! cargo run -p reel-backend
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::{Context, Error};
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod interactions;
pub mod routes;
pub mod state;
pub mod utils;

#[cfg(test)]
mod tests;

use routes::{
    add_comment_handler, admin_check_handler, admin_data_handler, admin_users_handler,
    delete_comment_handler, get_comments_handler, get_likes_handler, get_ratings_handler,
    health_handler, like_handler, set_rating_handler, signup_handler, toggle_like_handler,
    unlike_handler,
};
use state::AppState;

pub async fn start_server() -> Result<(), Error> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("Server shut down");

    Ok(())
}

pub fn app_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .expose_headers([CONTENT_LENGTH])
        .max_age(Duration::from_secs(600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/auth/signup", post(signup_handler))
        .route(
            "/likes/{edit_id}",
            get(get_likes_handler)
                .post(toggle_like_handler)
                .put(like_handler)
                .delete(unlike_handler),
        )
        .route(
            "/comments/{edit_id}",
            get(get_comments_handler).post(add_comment_handler),
        )
        .route(
            "/comments/{edit_id}/{comment_id}",
            delete(delete_comment_handler),
        )
        .route(
            "/ratings/{edit_id}",
            get(get_ratings_handler).post(set_rating_handler),
        )
        .route("/admin/check", get(admin_check_handler))
        .route("/admin/users", get(admin_users_handler))
        .route("/admin/data", get(admin_data_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
