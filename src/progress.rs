//! Per-item progress reporting.
//!
//! Steps that process collections emit one [`ItemProcessed`] notification per
//! input item. Consumers (job-status trackers, progress bars) must treat the
//! stream as at-least-once and ordered within a single step.

use std::sync::Arc;

/// Notification emitted once per item by steps that opt into progress
/// reporting.
///
/// Events for a given step fire in input order, so consumers can render
/// monotonic progress percentages from `index` and `total`.
#[derive(Debug, Clone, Copy)]
pub struct ItemProcessed<'a, T> {
    /// The item that was processed.
    pub item: &'a T,
    /// Zero-based position of the item within the step's input.
    pub index: usize,
    /// Total number of items the step is processing.
    pub total: usize,
    /// Name of the step reporting progress.
    pub step_name: &'a str,
    /// Whether the item's primary processing succeeded.
    pub success: bool,
    /// Failure description when `success` is false.
    pub error: Option<&'a str>,
}

impl<'a, T> ItemProcessed<'a, T> {
    /// Build a success notification.
    pub fn succeeded(step_name: &'a str, item: &'a T, index: usize, total: usize) -> Self {
        Self {
            item,
            index,
            total,
            step_name,
            success: true,
            error: None,
        }
    }

    /// Build a failure notification with the given error description.
    pub fn failed(
        step_name: &'a str,
        item: &'a T,
        index: usize,
        total: usize,
        error: &'a str,
    ) -> Self {
        Self {
            item,
            index,
            total,
            step_name,
            success: false,
            error: Some(error),
        }
    }
}

/// Shared callback invoked for every [`ItemProcessed`] notification.
///
/// Cloneable so the engine can inject it into the context without taking
/// ownership away from the builder.
pub type ProgressHook<T> = Arc<dyn for<'a> Fn(ItemProcessed<'a, T>) + Send + Sync>;
