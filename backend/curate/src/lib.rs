//! # Curate
//!
//! Maintenance for `catalog.json`, the list of edits compiled into the server and shown in
//! the gallery.
//!
//! ## Adding An Edit
//!
//! 1. Load the catalog file and validate it, refusing to touch a broken file.
//!
//! 2. Sanitize the input: the category becomes a slug ("Demon Slayer" -> "demonslayer"),
//!    tags are lowercased and deduplicated, title and anime are trimmed.
//!
//! 3. Assign the next id, one past the highest existing id. Ids are never reused, so likes,
//!    comments and ratings stored under an id always point at the same edit.
//!
//! 4. Validate again with the new edit and write the file back.
//!
//! A category without a filter button is accepted but reported, since the gallery would only
//! show it under "all".
//!
//! ## Commands
//!
//! ```sh
//! curate check
//! curate search naruto --filter naruto
//! curate add --title "Bleach - Cook Up" --anime Bleach --type bleach --video "./cook.mp4" --tag action
//! ```
use std::{fmt::Write, path::Path};

use anyhow::{Error, bail};
use catalog::{Catalog, Edit, Filter};

pub mod models;
pub mod utils;

use models::{NewEdit, format_edit};
use utils::{sanitize_tags, slug};

fn load(path: &Path) -> Result<Catalog, Error> {
    let catalog = Catalog::read(path)?;
    catalog.validate()?;

    Ok(catalog)
}

pub fn check(path: &Path) -> Result<String, Error> {
    let catalog = load(path)?;

    let unfiltered: Vec<String> = catalog
        .stats()
        .per_category
        .into_keys()
        .filter(|category| Filter::parse(category).label().is_none())
        .collect();

    let mut report = format!("{} edits, catalog is valid", catalog.len());
    if !unfiltered.is_empty() {
        write!(report, "\nNo filter button for: {}", unfiltered.join(", "))?;
    }

    Ok(report)
}

pub fn list(path: &Path, filter: &str, query: &str) -> Result<String, Error> {
    let catalog = load(path)?;

    let mut out = String::new();
    for edit in catalog.search(&Filter::parse(filter), query) {
        writeln!(out, "{}", format_edit(edit))?;
    }

    Ok(out)
}

pub fn stats(path: &Path) -> Result<String, Error> {
    let stats = load(path)?.stats();

    let mut out = format!("Total: {}\n", stats.total);
    for (category, count) in &stats.per_category {
        let label = Filter::parse(category).label().unwrap_or("-");
        writeln!(out, "{category:<12} {count:>3}  {label}")?;
    }

    Ok(out)
}

pub fn add(path: &Path, new_edit: NewEdit) -> Result<Edit, Error> {
    let mut catalog = load(path)?;

    let title = new_edit.title.trim().to_string();
    let anime = new_edit.anime.trim().to_string();
    let category = slug(&new_edit.category);

    if title.is_empty() || anime.is_empty() || category.is_empty() {
        bail!("title, anime and type are required");
    }

    let edit = Edit {
        id: catalog.next_id(),
        title,
        anime,
        category,
        video_url: new_edit.video_url.trim().to_string(),
        tags: sanitize_tags(&new_edit.tags),
    };

    catalog.push(edit.clone());
    catalog.validate()?;
    catalog.write(path)?;

    Ok(edit)
}
