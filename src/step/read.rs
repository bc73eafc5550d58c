//! Producer step reading the initial working set from a content source.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::item::ContentItem;
use crate::ports::{CursorStore, ReadFilter, SourceReader};
use crate::step::{StepResult, WorkflowStep};
use crate::{Result, WorkflowContext};

/// Reads items from a [`SourceReader`] into the context.
///
/// This is a producer step: it runs even when the incoming collection is
/// empty, since it generates the initial working set. Resume position is an
/// explicit [`SourceCursor`](crate::ports::SourceCursor) scoped per user and
/// per source type, loaded before the read and saved after it; readers
/// update `filter.cursor` to the new position.
pub struct SourceReadStep {
    name: String,
    /// Source-type key used to scope the cursor (for example `"gmail"`).
    source: String,
    reader: Arc<dyn SourceReader>,
    cursors: Option<Arc<dyn CursorStore>>,
}

impl SourceReadStep {
    /// Create a read step for the given source type.
    pub fn new(source: impl Into<String>, reader: Arc<dyn SourceReader>) -> Self {
        let source = source.into();
        Self {
            name: format!("read-{source}"),
            source,
            reader,
            cursors: None,
        }
    }

    /// Persist and resume the read position through `store`.
    #[must_use]
    pub fn with_cursor_store(mut self, store: Arc<dyn CursorStore>) -> Self {
        self.cursors = Some(store);
        self
    }
}

#[async_trait]
impl WorkflowStep<ContentItem> for SourceReadStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_producer(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: WorkflowContext<ContentItem>) -> Result<StepResult<ContentItem>> {
        if ctx.user_id.is_empty() {
            // Structural configuration problem: halt cleanly, no exception.
            return Ok(StepResult::halt(ctx, "no user identity configured"));
        }

        let mut filter = ReadFilter {
            user_id: ctx.user_id.clone(),
            source_path: ctx.source_path.clone(),
            cursor: None,
            metadata: Default::default(),
        };

        if let Some(store) = &self.cursors {
            filter.cursor = store.load(&ctx.user_id, &self.source).await?;
        }
        let resumed_from = filter.cursor;

        let items = self.reader.read(&mut filter).await?;
        debug!(source = %self.source, count = items.len(), "read items from source");

        let mut ctx = ctx;
        // Side-channel metadata from the reader lands in the context.
        for (key, value) in filter.metadata.drain() {
            ctx.insert_metadata(key, value);
        }

        if let (Some(store), Some(cursor)) = (&self.cursors, filter.cursor) {
            if resumed_from != Some(cursor) {
                if let Err(error) = store.save(&ctx.user_id, &self.source, &cursor).await {
                    warn!(source = %self.source, %error, "failed to save source cursor");
                }
            }
        }

        let message = format!("read {} items from {}", items.len(), self.source);
        Ok(StepResult::proceed(ctx.with_items(items)).with_message(message))
    }
}
