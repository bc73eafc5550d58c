//! Multi-cycle retry scheduler for rate-limited operations.
//!
//! The scheduler re-drives an enrichment operation against a queue of items
//! that previously failed with a rate-limit signal. It runs bounded cycles:
//! wait out the current reset window, re-attempt every queued item once,
//! repeat with whatever is left. Termination is guaranteed by four rules:
//! empty queue, per-item attempt cap, a reset window beyond the configured
//! ceiling, and the no-progress rule (a cycle that changes nothing and
//! leaves nothing to wait for stops the scheduler).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::item::ContentItem;
use crate::ports::{Analyzer, BookmarkStore, RateLimitedClient};
use crate::Result;

/// Outcome of one attempt at a queued item.
///
/// The two failure variants are deliberately distinct: `RateLimited` is
/// transient and re-queued, `Failed` is permanent and dropped.
#[derive(Debug, Clone)]
pub enum AttemptOutcome {
    /// The item was enriched; `url` is recorded as updated.
    Completed {
        /// URL of the record that was updated.
        url: String,
    },
    /// The upstream rejected the call inside a rate-limit window.
    RateLimited,
    /// The content is permanently unavailable; never retried.
    Failed(String),
}

/// The operation the scheduler re-drives for each queued item.
#[async_trait]
pub trait RetryOperation<T: Sync>: Send + Sync {
    /// Attempt to enrich `item` once.
    ///
    /// Expected failures are data ([`AttemptOutcome`]); `Err` is reserved
    /// for unexpected defects and drops the item without re-queuing.
    async fn attempt(&self, item: &T) -> Result<AttemptOutcome>;
}

/// An item waiting for another enrichment attempt.
///
/// Created when the first attempt signals "rate limited" rather than
/// "failed"; destroyed when it succeeds, exhausts its attempts, or the
/// scheduler stops.
#[derive(Debug, Clone)]
pub struct QueuedItem<T> {
    /// The item to re-attempt.
    pub item: T,
    /// Position of the item in the originating batch, for attribution.
    pub index: usize,
    /// Attempts consumed so far, including the one that queued it.
    pub attempts: u32,
}

impl<T> QueuedItem<T> {
    /// Queue an item after its first rate-limited attempt.
    pub fn new(item: T, index: usize) -> Self {
        Self {
            item,
            index,
            attempts: 1,
        }
    }
}

/// Tuning knobs for the scheduler.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Per-item attempt cap, counting the attempt that queued the item.
    pub max_attempts: u32,
    /// Ceiling on a single reset wait. A longer reported window abandons
    /// the whole queue, bounding worst-case latency of a background job.
    pub max_wait: Duration,
    /// Safety buffer added after the reported reset time.
    pub wait_buffer: Duration,
    /// Cadence of countdown status updates while waiting.
    pub countdown_interval: Duration,
    /// Overall cycle budget, independent of the other rules.
    pub max_cycles: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_wait: Duration::from_secs(15 * 60),
            wait_buffer: Duration::from_secs(5),
            countdown_interval: Duration::from_secs(30),
            max_cycles: 10,
        }
    }
}

/// Summary handed back to the calling step when the scheduler stops.
#[derive(Debug, Default, Clone)]
pub struct RetryReport {
    /// URLs of records successfully updated across all cycles.
    pub updated_urls: HashSet<String>,
    /// Items still unenriched when the scheduler stopped.
    pub remaining: usize,
    /// Number of retry cycles executed.
    pub cycles: u32,
}

/// Drives bounded retry cycles against a rate-limited client.
///
/// The scheduler owns its queue exclusively for the duration of
/// [`drain`](RetryScheduler::drain) and hands back only a [`RetryReport`].
pub struct RetryScheduler<C: ?Sized> {
    client: Arc<C>,
    config: RetryConfig,
}

impl<C: RateLimitedClient + ?Sized> RetryScheduler<C> {
    /// Create a scheduler over the given client.
    pub fn new(client: Arc<C>, config: RetryConfig) -> Self {
        Self { client, config }
    }

    /// Drive a full batch: a first pass attempts every item once, items
    /// that signal "rate limited" become the retry queue, and
    /// [`drain`](RetryScheduler::drain) re-attempts whatever queued.
    ///
    /// Permanent failures are dropped in the first pass, matching the
    /// cycle rules: only the rate-limit signal earns a retry.
    pub async fn run<T, O>(&self, items: Vec<T>, op: &O) -> RetryReport
    where
        T: Send + Sync,
        O: RetryOperation<T> + ?Sized,
    {
        let mut updated: HashSet<String> = HashSet::new();
        let mut queue: Vec<QueuedItem<T>> = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            match op.attempt(&item).await {
                Ok(AttemptOutcome::Completed { url }) => {
                    updated.insert(url);
                }
                Ok(AttemptOutcome::RateLimited) => {
                    debug!(index, "rate limited, queuing for retry");
                    queue.push(QueuedItem::new(item, index));
                }
                Ok(AttemptOutcome::Failed(reason)) => {
                    debug!(index, %reason, "permanent failure, not queued");
                }
                Err(error) => {
                    warn!(index, %error, "attempt errored, not queued");
                }
            }
        }

        let mut report = self.drain(queue, op).await;
        report.updated_urls.extend(updated);
        report
    }

    /// Re-attempt every queued item across bounded cycles until the queue is
    /// empty or a termination rule fires.
    ///
    /// Within one cycle every item is attempted exactly once, in queue
    /// order. A cycle that produces zero successes, drops nothing, and
    /// leaves no fresh rate-limit window to wait for terminates the
    /// scheduler; this rule holds even if the upstream never recovers.
    pub async fn drain<T, O>(&self, mut queue: Vec<QueuedItem<T>>, op: &O) -> RetryReport
    where
        T: Send + Sync,
        O: RetryOperation<T> + ?Sized,
    {
        let mut updated: HashSet<String> = HashSet::new();
        let mut cycles = 0u32;

        while !queue.is_empty() && cycles < self.config.max_cycles {
            if self.client.is_rate_limited() {
                match self.client.retry_after() {
                    Some(wait) if wait > self.config.max_wait => {
                        warn!(
                            wait_secs = wait.as_secs(),
                            ceiling_secs = self.config.max_wait.as_secs(),
                            queued = queue.len(),
                            "reset window exceeds ceiling, abandoning retry queue"
                        );
                        break;
                    }
                    Some(wait) => {
                        self.wait_for_reset(wait).await;
                        self.client.clear_rate_limit();
                    }
                    None => {}
                }
            }

            cycles += 1;
            let before = queue.len();
            let mut successes = 0usize;
            let mut next: Vec<QueuedItem<T>> = Vec::with_capacity(queue.len());

            for mut queued in queue {
                match op.attempt(&queued.item).await {
                    Ok(AttemptOutcome::Completed { url }) => {
                        debug!(%url, index = queued.index, "retry succeeded");
                        updated.insert(url);
                        successes += 1;
                    }
                    Ok(AttemptOutcome::RateLimited) => {
                        queued.attempts += 1;
                        if queued.attempts < self.config.max_attempts {
                            next.push(queued);
                        } else {
                            debug!(
                                index = queued.index,
                                attempts = queued.attempts,
                                "attempt cap reached, giving up"
                            );
                        }
                    }
                    Ok(AttemptOutcome::Failed(reason)) => {
                        debug!(index = queued.index, %reason, "permanent failure, dropping");
                    }
                    Err(error) => {
                        warn!(index = queued.index, %error, "attempt errored, dropping");
                    }
                }
            }

            queue = next;
            info!(
                cycle = cycles,
                remaining = queue.len(),
                updated = updated.len(),
                "retry cycle finished"
            );

            // No-progress rule: nothing succeeded, nothing was dropped, and
            // there is no fresh reset window to wait out.
            if successes == 0 && queue.len() == before && !self.client.is_rate_limited() {
                warn!(remaining = queue.len(), "retry cycle made no progress, stopping");
                break;
            }
        }

        RetryReport {
            remaining: queue.len(),
            updated_urls: updated,
            cycles,
        }
    }

    /// Sleep until the reset window passes, emitting a countdown status at
    /// `countdown_interval` rather than busy-polling.
    async fn wait_for_reset(&self, wait: Duration) {
        let total = wait + self.config.wait_buffer;
        info!(total_secs = total.as_secs(), "waiting for rate limit reset");

        let mut remaining = total;
        while !remaining.is_zero() {
            let slice = remaining.min(self.config.countdown_interval);
            tokio::time::sleep(slice).await;
            remaining = remaining.saturating_sub(slice);
            if !remaining.is_zero() {
                info!(remaining_secs = remaining.as_secs(), "rate limit countdown");
            }
        }
    }
}

/// The enrichment attempt the scheduler re-drives: fetch through the
/// rate-limited client, classify the client's two "no content" signals,
/// analyze and persist on success.
pub struct RateLimitedEnrichment {
    client: Arc<dyn RateLimitedClient>,
    analyzer: Arc<dyn Analyzer>,
    bookmarks: Arc<dyn BookmarkStore>,
}

impl RateLimitedEnrichment {
    /// Build the operation from its ports.
    pub fn new(
        client: Arc<dyn RateLimitedClient>,
        analyzer: Arc<dyn Analyzer>,
        bookmarks: Arc<dyn BookmarkStore>,
    ) -> Self {
        Self {
            client,
            analyzer,
            bookmarks,
        }
    }
}

#[async_trait]
impl RetryOperation<ContentItem> for RateLimitedEnrichment {
    async fn attempt(&self, item: &ContentItem) -> Result<AttemptOutcome> {
        let content = match self.client.fetch_content(&item.url).await? {
            Some(content) => content,
            // Nothing came back. If the client is inside a rate-limit
            // window the item is retryable; otherwise the content is gone.
            None if self.client.is_rate_limited() => return Ok(AttemptOutcome::RateLimited),
            None => {
                return Ok(AttemptOutcome::Failed(format!(
                    "content unavailable: {}",
                    item.url
                )))
            }
        };

        let analysis = self.analyzer.analyze(&item.url, Some(&content)).await?;
        let mut enriched = item.clone().with_content(content);
        enriched.tags = analysis.tags;
        enriched.summary = Some(analysis.summary);
        self.bookmarks
            .save_all(std::slice::from_ref(&enriched))
            .await?;

        Ok(AttemptOutcome::Completed {
            url: item.url.clone(),
        })
    }
}
