//! # Catalog
//!
//! The fixed list of edits shown in the gallery.
//!
//! ## Storage
//!
//! - `catalog.json` next to this crate, compiled into every binary with `include_str!`
//! - Same JSON shape the frontend consumes: `id`, `title`, `anime`, `type`, `videoUrl`, `tags`
//! - `curate add` appends to that file and assigns the next id
//! - The server may instead pull the file from `CATALOG_URL` at startup, see [`remote`]
//!
//! ## Filters
//!
//! Every edit carries a category slug (`type` on the wire). The gallery shows a fixed row of
//! filter buttons, [`FILTERS`], the first one being "all".
use std::{collections::BTreeMap, fs, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod payloads;
pub mod remote;

pub const CATALOG_PATH: &str = "backend/catalog/catalog.json";

const EMBEDDED_CATALOG: &str = include_str!("../catalog.json");

/// Filter buttons in display order: `(slug, label)`.
pub const FILTERS: [(&str, &str); 9] = [
    ("all", "Tous"),
    ("yla", "YOUR LIE IN APRIL"),
    ("yourname", "YOUR NAME"),
    ("naruto", "NARUTO"),
    ("demonslayer", "DEMON SLAYER"),
    ("hxh", "HUNTER X HUNTER"),
    ("bleach", "BLEACH"),
    ("asv", "A SILENT VOICE"),
    ("rappeur", "RAPPEUR"),
];

pub type EditId = u32;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Malformed catalog: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Catalog io: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid edit {id}: {reason}")]
    Invalid { id: EditId, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit {
    pub id: EditId,
    pub title: String,
    /// Source anime, or the artist for music edits.
    pub anime: String,
    #[serde(rename = "type")]
    pub category: String,
    pub video_url: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Edit {
    fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.anime.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    All,
    Category(String),
}

impl Filter {
    pub fn parse(slug: &str) -> Self {
        match slug.trim() {
            "" | "all" => Filter::All,
            other => Filter::Category(other.to_lowercase()),
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Filter::All => "all",
            Filter::Category(slug) => slug,
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        FILTERS
            .iter()
            .find(|(slug, _)| *slug == self.slug())
            .map(|(_, label)| *label)
    }

    fn accepts(&self, edit: &Edit) -> bool {
        match self {
            Filter::All => true,
            Filter::Category(slug) => edit.category == *slug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: usize,
    pub per_category: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    edits: Vec<Edit>,
}

impl Catalog {
    pub fn new(edits: Vec<Edit>) -> Self {
        Self { edits }
    }

    /// The catalog compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let edits: Vec<Edit> = serde_json::from_str(json)?;

        Ok(Self { edits })
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let mut json = serde_json::to_string_pretty(&self.edits)?;
        json.push('\n');

        fs::write(path, json)?;

        Ok(())
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn get(&self, id: EditId) -> Option<&Edit> {
        self.edits.iter().find(|edit| edit.id == id)
    }

    pub fn contains(&self, id: EditId) -> bool {
        self.get(id).is_some()
    }

    pub fn next_id(&self) -> EditId {
        self.edits.iter().map(|edit| edit.id).max().unwrap_or(0) + 1
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Edits accepted by `filter` whose title, anime or a tag contains `query`,
    /// case-insensitively. A blank query matches everything. Catalog order is kept.
    pub fn search(&self, filter: &Filter, query: &str) -> Vec<&Edit> {
        let needle = query.trim().to_lowercase();

        self.edits
            .iter()
            .filter(|edit| filter.accepts(edit))
            .filter(|edit| needle.is_empty() || edit.matches_query(&needle))
            .collect()
    }

    pub fn stats(&self) -> Stats {
        let mut per_category = BTreeMap::new();
        for edit in &self.edits {
            *per_category.entry(edit.category.clone()).or_insert(0) += 1;
        }

        Stats {
            total: self.edits.len(),
            per_category,
        }
    }

    /// Checks the invariants `curate check` enforces before a catalog ships.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let slug = Regex::new(r"^[a-z0-9]+$").expect("static regex");
        let mut seen = Vec::with_capacity(self.edits.len());

        for edit in &self.edits {
            let invalid = |reason: &str| CatalogError::Invalid {
                id: edit.id,
                reason: reason.to_string(),
            };

            if edit.id == 0 {
                return Err(invalid("id must be positive"));
            }
            if seen.contains(&edit.id) {
                return Err(invalid("duplicate id"));
            }
            seen.push(edit.id);

            if edit.title.trim().is_empty() {
                return Err(invalid("empty title"));
            }
            if edit.video_url.trim().is_empty() {
                return Err(invalid("empty video url"));
            }
            if !slug.is_match(&edit.category) {
                return Err(invalid("category must be a lowercase slug"));
            }
            if edit
                .tags
                .iter()
                .any(|tag| tag.trim().is_empty() || *tag != tag.to_lowercase())
            {
                return Err(invalid("tags must be non-empty and lowercase"));
            }
        }

        Ok(())
    }
}
