//! The concrete pipeline item used by the shipped ingestion steps.

use serde::{Deserialize, Serialize};

/// One unit of content moving through an ingestion pipeline.
///
/// An item starts as a bare URL (optionally tied to a source record) and is
/// progressively filled in: raw page content after fetching, tags and a
/// summary after analysis. The workflow engine itself is generic and never
/// inspects this type; it exists for the steps shipped with the crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentItem {
    /// Identifier of the backing source record, when one exists.
    pub id: Option<String>,
    /// The canonical URL of the content.
    pub url: String,
    /// Page title, when known.
    pub title: Option<String>,
    /// Raw page content, present after a successful fetch.
    pub content: Option<String>,
    /// Tags produced by analysis.
    pub tags: Vec<String>,
    /// Summary produced by analysis.
    pub summary: Option<String>,
    /// URL of the parent item, for items discovered via nested extraction.
    pub derived_from: Option<String>,
}

impl ContentItem {
    /// Create a bare item for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Create an item tied to a source record.
    pub fn from_source(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Attach raw page content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// True once analysis has produced tags or a summary.
    pub fn is_enriched(&self) -> bool {
        !self.tags.is_empty() || self.summary.is_some()
    }
}
