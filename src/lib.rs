//! # content-workflow
//!
//! Composable async workflow primitives for content ingestion and
//! enrichment pipelines in Rust.
//!
//! This crate provides a generic workflow execution engine (an ordered
//! sequence of typed steps threaded through a shared context, assembled by
//! a builder with lifecycle hooks) plus the two coordination primitives
//! ingestion pipelines need when calling unreliable third parties: a
//! rate-limit retry scheduler and a bounded nested-fetch enrichment step.
//!
//! ## Core Concepts
//!
//! - **WorkflowStep**: the unit of work; consumes and replaces the item
//!   collection in the context
//! - **WorkflowContext**: mutable-by-replacement state threaded through all
//!   steps (items, metadata, progress callback)
//! - **WorkflowBuilder / Workflow**: ordered step list plus `on_start`,
//!   `on_item_processed`, `on_error`, and `on_complete` hooks
//! - **ExecutionStats**: per-run statistics handed to the completion hook,
//!   which fires whether the run completed, halted, or failed
//! - **RetryScheduler**: bounded retry cycles against a rate-limited
//!   upstream, with guaranteed termination
//! - **EnrichmentStep**: expands one input item into a capped set of
//!   derived items (depth exactly one)
//!
//! ## Example: Building and Running a Workflow
//!
//! ```rust
//! use content_workflow::{FnStep, StepResult, WorkflowBuilder, WorkflowContext};
//!
//! # tokio_test::block_on(async {
//! let workflow = WorkflowBuilder::new("ingest")
//!     .step(
//!         FnStep::new("seed", |ctx: WorkflowContext<String>| async move {
//!             Ok(StepResult::proceed(
//!                 ctx.with_items(vec!["https://example.com".to_string()]),
//!             ))
//!         })
//!         .producer(),
//!     )
//!     .step(FnStep::new("label", |ctx: WorkflowContext<String>| async move {
//!         let items = ctx.items.iter().map(|url| format!("seen: {url}")).collect();
//!         Ok(StepResult::proceed(ctx.with_items(items)))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let run = workflow.execute("user-1", None, None).await.unwrap();
//! assert_eq!(run.context.items, vec!["seen: https://example.com"]);
//! assert_eq!(run.stats.executed_step_names, vec!["seed", "label"]);
//! assert!(run.stats.success);
//! # });
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod item;
pub mod ports;
pub mod progress;
pub mod retry;
pub mod stats;
pub mod step;
pub mod workflow;

pub use builder::WorkflowBuilder;
pub use context::WorkflowContext;
pub use error::{Error, Result};
pub use item::ContentItem;
pub use progress::{ItemProcessed, ProgressHook};
pub use stats::ExecutionStats;
pub use workflow::{
    CompleteHook, ErrorDecision, ErrorHook, StartHook, StepFailure, Workflow, WorkflowRun,
};

// Re-export step types
pub use step::enrich::{EnrichmentConfig, EnrichmentStep};
pub use step::read::SourceReadStep;
pub use step::{FnStep, StepResult, WorkflowStep};

// Re-export the retry scheduler
pub use retry::{
    AttemptOutcome, QueuedItem, RateLimitedEnrichment, RetryConfig, RetryOperation, RetryReport,
    RetryScheduler,
};

// Re-export the external capability ports
pub use ports::{
    Analysis, Analyzer, BookmarkStore, ContentFetcher, CursorStore, RateLimitedClient, ReadFilter,
    SourceCursor, SourceReader, SourceStore, UrlExtractor,
};
