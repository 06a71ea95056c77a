//! # Reel
//!
//! Client side of the video-edit portfolio: what the gallery page knows about the viewer and
//! the edits on screen.
//!
//! - [`gallery`]: filter buttons, search box and the opened edit over the [`catalog`].
//! - [`session`]: sign in, sign up, password reset and sign out against the auth service.
//! - [`interactions`]: likes, comments and ratings, shown before the server confirms them.
//! - [`admin`]: whether to offer the admin view, and its data.
//!
//! ## Wiring
//!
//! ```no_run
//! # async fn run() -> Result<(), reel::error::ClientError> {
//! use reel::{api::Api, interactions::Interactions, session::AuthClient};
//!
//! let api = Api::new("http://localhost:1111");
//! let auth = AuthClient::new("https://project.supabase.co", "anon-key", api.clone());
//! let interactions = Interactions::new(api);
//!
//! let session = auth.sign_in("kai@example.com", "hunter22").await?;
//! interactions.set_session(Some(session));
//! interactions.load(&[1, 2, 3]).await;
//! interactions.toggle_like(2).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Notes
//!
//! Mutations never surface server failures, they quietly roll back. Errors returned from
//! [`interactions::Interactions`] only mean the call was refused locally: no session, empty
//! comment, rating out of range.

pub mod admin;
pub mod api;
pub mod error;
pub mod gallery;
pub mod interactions;
pub mod session;
