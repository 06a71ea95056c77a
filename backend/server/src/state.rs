use std::sync::Arc;

use anyhow::{Context, Error};
use catalog::{Catalog, remote::fetch_catalog};
use tracing::{info, warn};

use super::{auth::AuthService, config::Config, database::Store};

pub struct AppState {
    pub catalog: Catalog,
    pub config: Config,
    pub store: Store,
    pub auth: AuthService,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>, Error> {
        let config = Config::load()?;

        let catalog = match &config.catalog_url {
            Some(url) => fetch_catalog(url)
                .await
                .with_context(|| format!("loading catalog from {url}"))?,
            None => Catalog::embedded()?,
        };
        info!("Catalog loaded: {} edits", catalog.len());

        let store = match &config.redis_url {
            Some(url) => Store::redis(url)
                .await
                .with_context(|| format!("connecting to redis at {url}"))?,
            None => {
                warn!("REDIS_URL not set, interactions are kept in memory");
                Store::memory()
            }
        };

        let auth = AuthService::from_config(&config);

        Ok(Self::with_parts(catalog, config, store, auth))
    }

    pub fn with_parts(catalog: Catalog, config: Config, store: Store, auth: AuthService) -> Arc<Self> {
        Arc::new(Self {
            catalog,
            config,
            store,
            auth,
        })
    }
}
