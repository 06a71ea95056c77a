use catalog::payloads::{AdminData, UserProfile};
use tracing::{debug, info};

use crate::{api::Api, error::ClientError, session::Session};

/// Whether the admin view should be offered. The server decides, and any failure counts as no.
pub async fn check_admin(api: &Api, session: Option<&Session>) -> bool {
    let Some(session) = session else {
        return false;
    };

    match api.admin_check(&session.access_token).await {
        Ok(check) => {
            if check.is_admin {
                info!("Admin access granted to {}", session.user.id);
            }
            check.is_admin
        }
        Err(e) => {
            debug!("Admin check failed: {e}");
            false
        }
    }
}

pub async fn admin_data(api: &Api, session: &Session) -> Result<AdminData, ClientError> {
    api.admin_data(&session.access_token).await
}

pub async fn admin_users(api: &Api, session: &Session) -> Result<Vec<UserProfile>, ClientError> {
    Ok(api.admin_users(&session.access_token).await?.users)
}
