use anyhow::{Context, Error};
use reqwest::get;

use crate::Catalog;

/// Pulls the catalog JSON from `url` instead of the copy compiled into the binary.
pub async fn fetch_catalog(url: &str) -> Result<Catalog, Error> {
    let response = get(url).await?.error_for_status()?;
    let json = response.text().await?;

    let catalog = Catalog::from_json(&json).context("remote catalog is not valid JSON")?;
    catalog.validate()?;

    Ok(catalog)
}
