//! Bounded nested-fetch enrichment.
//!
//! For each input item the step fetches the page, optionally discovers a
//! capped number of further URLs inside it, processes those sequentially
//! (depth exactly one; discovered URLs are never themselves expanded), and
//! analyzes the original page. Derived items are persisted in one bulk
//! operation; the source record is archived whether or not enrichment
//! succeeded, so a scheduled sweep never reprocesses it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::item::ContentItem;
use crate::ports::{Analyzer, BookmarkStore, ContentFetcher, SourceStore, UrlExtractor};
use crate::progress::ItemProcessed;
use crate::step::{StepResult, WorkflowStep};
use crate::{Result, WorkflowContext};

/// Configuration for [`EnrichmentStep`].
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Whether to discover and process URLs found inside fetched pages.
    pub discover_nested: bool,
    /// Hard cap on discovered URLs per input item. Bounds the fan-out: one
    /// input item yields at most `1 + max_extracted_urls` derived items.
    pub max_extracted_urls: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            discover_nested: true,
            max_extracted_urls: 5,
        }
    }
}

/// What happened to one input item.
struct ItemOutcome {
    /// Derived items (nested bookmarks, and the original when its own
    /// analysis succeeded).
    outputs: Vec<ContentItem>,
    /// Set when the item's primary processing failed. Nested outputs may
    /// still be present when only the final analysis failed.
    error: Option<String>,
}

/// Workflow step implementing bounded nested-fetch enrichment over
/// [`ContentItem`] collections.
///
/// Items are processed sequentially, never in parallel, to respect shared
/// rate limits on the fetcher and analyzer. One progress event fires per
/// input item (not per derived item), in input order.
pub struct EnrichmentStep {
    fetcher: Arc<dyn ContentFetcher>,
    analyzer: Arc<dyn Analyzer>,
    extractor: Arc<dyn UrlExtractor>,
    bookmarks: Arc<dyn BookmarkStore>,
    sources: Arc<dyn SourceStore>,
    config: EnrichmentConfig,
}

impl EnrichmentStep {
    /// Create the step from its ports.
    pub fn new(
        fetcher: Arc<dyn ContentFetcher>,
        analyzer: Arc<dyn Analyzer>,
        extractor: Arc<dyn UrlExtractor>,
        bookmarks: Arc<dyn BookmarkStore>,
        sources: Arc<dyn SourceStore>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            fetcher,
            analyzer,
            extractor,
            bookmarks,
            sources,
            config,
        }
    }

    /// Process one discovered URL. Failures skip the URL without failing
    /// the batch.
    async fn process_nested(&self, parent_url: &str, url: &str) -> Option<ContentItem> {
        match self.bookmarks.exists(url).await {
            Ok(true) => {
                debug!(%url, "already bookmarked, skipping");
                return None;
            }
            Ok(false) => {}
            Err(error) => warn!(%url, %error, "existence check failed, processing anyway"),
        }

        let content = match self.fetcher.fetch(url).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!(%url, "nested page unavailable, skipping");
                return None;
            }
            Err(error) => {
                debug!(%url, %error, "nested fetch failed, skipping");
                return None;
            }
        };

        let analysis = match self.analyzer.analyze(url, Some(&content)).await {
            Ok(analysis) => analysis,
            Err(error) => {
                debug!(%url, %error, "nested analysis failed, skipping");
                return None;
            }
        };

        let mut derived = ContentItem::new(url).with_content(content);
        derived.tags = analysis.tags;
        derived.summary = Some(analysis.summary);
        derived.derived_from = Some(parent_url.to_string());
        Some(derived)
    }

    async fn process_item(&self, item: &ContentItem) -> ItemOutcome {
        let content = match self.fetcher.fetch(&item.url).await {
            Ok(Some(content)) => content,
            Ok(None) => {
                return ItemOutcome {
                    outputs: Vec::new(),
                    error: Some(format!("content unavailable: {}", item.url)),
                }
            }
            Err(error) => {
                return ItemOutcome {
                    outputs: Vec::new(),
                    error: Some(error.to_string()),
                }
            }
        };

        let mut outputs = Vec::new();

        if self.config.discover_nested {
            let candidates = match self.extractor.extract_urls(&item.url, &content).await {
                Ok(urls) => urls,
                Err(error) => {
                    warn!(url = %item.url, %error, "url extraction failed");
                    Vec::new()
                }
            };
            // Discovered URLs are processed at depth one only.
            for url in candidates.into_iter().take(self.config.max_extracted_urls) {
                if let Some(derived) = self.process_nested(&item.url, &url).await {
                    outputs.push(derived);
                }
            }
        }

        // The original item is analyzed regardless of nested outcomes.
        match self.analyzer.analyze(&item.url, Some(&content)).await {
            Ok(analysis) => {
                let mut primary = item.clone().with_content(content);
                primary.tags = analysis.tags;
                primary.summary = Some(analysis.summary);
                outputs.push(primary);
                ItemOutcome {
                    outputs,
                    error: None,
                }
            }
            Err(error) => ItemOutcome {
                outputs,
                error: Some(error.to_string()),
            },
        }
    }
}

#[async_trait]
impl WorkflowStep<ContentItem> for EnrichmentStep {
    fn name(&self) -> &str {
        "enrich"
    }

    async fn execute(&self, ctx: WorkflowContext<ContentItem>) -> Result<StepResult<ContentItem>> {
        let mut ctx = ctx;
        let items = std::mem::take(&mut ctx.items);
        let total = items.len();

        let mut derived: Vec<ContentItem> = Vec::new();
        let mut enriched = 0usize;
        let mut failed = 0usize;

        for (index, item) in items.iter().enumerate() {
            let outcome = self.process_item(item).await;

            // Enrichment is attempted at most once per source record: a
            // failed scrape still consumes the attempt.
            if let Some(id) = &item.id {
                match self.sources.mark_archived(id).await {
                    Ok(()) => ctx.mark_updated(id.clone()),
                    Err(error) => warn!(%id, %error, "failed to archive source record"),
                }
            }

            match &outcome.error {
                None => {
                    enriched += 1;
                    ctx.report_progress(ItemProcessed::succeeded(self.name(), item, index, total));
                }
                Some(error) => {
                    failed += 1;
                    debug!(url = %item.url, %error, "item enrichment failed");
                    ctx.report_progress(ItemProcessed::failed(
                        self.name(),
                        item,
                        index,
                        total,
                        error,
                    ));
                }
            }

            derived.extend(outcome.outputs);
        }

        if !derived.is_empty() {
            let saved = self.bookmarks.save_all(&derived).await?;
            debug!(saved, "persisted derived bookmarks");
        }

        ctx.insert_metadata("enrichment.enriched", serde_json::json!(enriched));
        ctx.insert_metadata("enrichment.failed", serde_json::json!(failed));

        let message = format!("enriched {enriched} of {total} items ({failed} failed)");
        Ok(StepResult::proceed(ctx.with_items(derived)).with_message(message))
    }
}
