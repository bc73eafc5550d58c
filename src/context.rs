//! Workflow context threaded through all steps.
//!
//! The context carries the working item collection, accumulated metadata, and
//! the identity/path arguments of the current run. Steps never mutate the
//! collection in place: each step consumes the context it was given and
//! returns a new one, so no step can observe a later step's output.

use std::collections::{HashMap, HashSet};

use crate::progress::{ItemProcessed, ProgressHook};

/// Mutable-by-replacement state passed from step to step.
///
/// Each workflow run owns exactly one context; it is never shared across
/// concurrent runs. Steps replace `items` wholesale via [`with_items`] and
/// add to `metadata` additively; later steps must not drop keys written by
/// earlier steps.
///
/// [`with_items`]: WorkflowContext::with_items
///
/// # Example
///
/// ```rust
/// use content_workflow::WorkflowContext;
///
/// let ctx = WorkflowContext::new("user-1")
///     .with_items(vec!["https://example.com".to_string()]);
/// assert_eq!(ctx.items.len(), 1);
/// assert_eq!(ctx.user_id, "user-1");
/// ```
#[derive(Clone)]
pub struct WorkflowContext<T> {
    /// Identity of the user this run belongs to.
    pub user_id: String,
    /// Optional path or locator of the input source.
    pub source_path: Option<String>,
    /// Optional path or locator for exported output.
    pub output_path: Option<String>,
    /// The working item collection, fully replaced between steps.
    pub items: Vec<T>,
    /// Identifiers of records updated so far in this run.
    pub updated_ids: HashSet<String>,
    /// Accumulated cross-step metadata. Additive only.
    pub metadata: HashMap<String, serde_json::Value>,
    progress: Option<ProgressHook<T>>,
}

impl<T> std::fmt::Debug for WorkflowContext<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("user_id", &self.user_id)
            .field("source_path", &self.source_path)
            .field("output_path", &self.output_path)
            .field("items", &self.items.len())
            .field("updated_ids", &self.updated_ids.len())
            .field("metadata_keys", &self.metadata.len())
            .field("has_progress_hook", &self.progress.is_some())
            .finish()
    }
}

impl<T> WorkflowContext<T> {
    /// Create an empty context for the given user.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            source_path: None,
            output_path: None,
            items: Vec::new(),
            updated_ids: HashSet::new(),
            metadata: HashMap::new(),
            progress: None,
        }
    }

    /// Set the source path.
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Set the output path.
    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Replace the item collection, returning the new context.
    ///
    /// This is the only sanctioned way for a step to hand items to its
    /// successor.
    #[must_use]
    pub fn with_items(mut self, items: Vec<T>) -> Self {
        self.items = items;
        self
    }

    /// Attach the per-item progress hook. Installed once by the engine before
    /// the first step runs.
    pub(crate) fn with_progress(mut self, hook: ProgressHook<T>) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Record a metadata value under `key`.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Look up a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Record an identifier as updated in this run.
    pub fn mark_updated(&mut self, id: impl Into<String>) {
        self.updated_ids.insert(id.into());
    }

    /// Emit a per-item progress notification, if a hook is installed.
    ///
    /// Steps call this once per input item, in input order.
    pub fn report_progress(&self, info: ItemProcessed<'_, T>) {
        if let Some(hook) = &self.progress {
            hook(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn with_items_replaces_collection() {
        let ctx = WorkflowContext::new("u").with_items(vec![1, 2, 3]);
        let ctx = ctx.with_items(vec![9]);
        assert_eq!(ctx.items, vec![9]);
    }

    #[test]
    fn metadata_accumulates() {
        let mut ctx: WorkflowContext<i32> = WorkflowContext::new("u");
        ctx.insert_metadata("a", serde_json::json!(1));
        ctx.insert_metadata("b", serde_json::json!("two"));
        assert_eq!(ctx.metadata_value("a"), Some(&serde_json::json!(1)));
        assert_eq!(ctx.metadata_value("b"), Some(&serde_json::json!("two")));
    }

    #[test]
    fn report_progress_without_hook_is_noop() {
        let ctx = WorkflowContext::new("u").with_items(vec![5]);
        ctx.report_progress(crate::progress::ItemProcessed::succeeded(
            "step",
            &ctx.items[0],
            0,
            1,
        ));
    }

    #[test]
    fn report_progress_invokes_hook() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ctx = WorkflowContext::new("u")
            .with_items(vec![5])
            .with_progress(Arc::new(move |info: ItemProcessed<'_, i32>| {
                assert_eq!(info.step_name, "step");
                assert!(info.success);
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        ctx.report_progress(ItemProcessed::succeeded("step", &ctx.items[0], 0, 1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
