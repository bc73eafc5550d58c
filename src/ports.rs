//! External capability ports consumed by the shipped steps.
//!
//! Each port is an explicit trait so the engine and steps depend only on the
//! interface; concrete adapters (HTTP scrapers, AI clients, repositories)
//! live outside this crate.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::item::ContentItem;
use crate::Result;

/// Result of analyzing a piece of content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    /// Tags describing the content.
    pub tags: Vec<String>,
    /// A short summary of the content.
    pub summary: String,
}

/// A small persisted position within a source, scoped per user and per
/// source type.
///
/// Readers use it to resume where the previous run left off. It has an
/// explicit load/save lifecycle via [`CursorStore`] rather than living in
/// module-level state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCursor {
    /// Epoch milliseconds of the newest item seen by the previous run.
    pub last_seen_ms: u64,
}

/// Filter configuration handed to a [`SourceReader`].
///
/// Readers may attach auxiliary metadata (for example an id mapping) into
/// `metadata` as a side channel back to the calling step; the step copies it
/// into the workflow context.
#[derive(Debug, Clone, Default)]
pub struct ReadFilter {
    /// Identity of the user whose content is being read.
    pub user_id: String,
    /// Optional source locator (mailbox label, feed URL, export path).
    pub source_path: Option<String>,
    /// Resume position, when a previous run saved one.
    pub cursor: Option<SourceCursor>,
    /// Side-channel metadata filled in by the reader.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Reads items from a heterogeneous content source.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Read items matching `filter`. The reader may update
    /// `filter.metadata` as a side channel.
    async fn read(&self, filter: &mut ReadFilter) -> Result<Vec<ContentItem>>;
}

/// Fetches raw page content for a URL.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the content at `url`.
    ///
    /// `Ok(None)` means the page is unavailable; that is an expected
    /// per-item outcome, distinct from `Err`.
    async fn fetch(&self, url: &str) -> Result<Option<String>>;
}

/// Produces tags and a summary for a piece of content.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze `url`, optionally with its already-fetched content.
    async fn analyze(&self, url: &str, content: Option<&str>) -> Result<Analysis>;
}

/// Extracts candidate URLs from fetched page content.
#[async_trait]
pub trait UrlExtractor: Send + Sync {
    /// Return the URLs referenced by the page at `url` with body `content`.
    async fn extract_urls(&self, url: &str, content: &str) -> Result<Vec<String>>;
}

/// A client whose upstream distinguishes "try again later" from
/// "permanently failed".
#[async_trait]
pub trait RateLimitedClient: Send + Sync {
    /// Fetch content for `url`. `Ok(None)` means unavailable; callers
    /// consult [`is_rate_limited`](RateLimitedClient::is_rate_limited) to
    /// tell a rate-limit rejection from a permanent miss.
    async fn fetch_content(&self, url: &str) -> Result<Option<String>>;

    /// Whether the client is currently inside a rate-limit window.
    fn is_rate_limited(&self) -> bool;

    /// Time remaining until the current rate-limit window resets, when the
    /// upstream reported one.
    fn retry_after(&self) -> Option<Duration>;

    /// Forget the current rate-limit window (called after waiting it out).
    fn clear_rate_limit(&self);
}

/// Persistence port for derived bookmark items.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// Persist all `items` in one bulk operation, returning the saved count.
    async fn save_all(&self, items: &[ContentItem]) -> Result<usize>;

    /// Whether a bookmark for `url` already exists.
    async fn exists(&self, url: &str) -> Result<bool>;
}

/// Status updates for source records.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Mark the source record `id` as archived. Enrichment is attempted at
    /// most once per record, so this runs whether or not enrichment
    /// succeeded.
    async fn mark_archived(&self, id: &str) -> Result<()>;
}

/// Load/save lifecycle for [`SourceCursor`] values.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Load the cursor for `(user_id, source)`, if one was saved.
    async fn load(&self, user_id: &str, source: &str) -> Result<Option<SourceCursor>>;

    /// Persist the cursor for `(user_id, source)`.
    async fn save(&self, user_id: &str, source: &str, cursor: &SourceCursor) -> Result<()>;
}
