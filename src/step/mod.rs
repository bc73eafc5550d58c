//! Core step contract and fundamental step types.
//!
//! This module defines the [`WorkflowStep`] trait — the unit of work in a
//! workflow — along with [`StepResult`] and [`FnStep`] for closure-based
//! steps.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

use crate::{Result, WorkflowContext};

pub mod enrich;
pub mod read;

/// Outcome of one step execution.
///
/// A step consumes the context it was given and returns a replacement inside
/// this result. `proceed = false` halts the workflow cleanly after the step:
/// a normal, non-exceptional stop used for unrecoverable configuration
/// problems.
pub struct StepResult<T> {
    /// The context to hand to the next step.
    pub context: WorkflowContext<T>,
    /// Whether the workflow should continue past this step.
    pub proceed: bool,
    /// Optional human-readable note about this step's outcome.
    pub message: Option<String>,
}

impl<T> StepResult<T> {
    /// Continue to the next step with the given context.
    pub fn proceed(context: WorkflowContext<T>) -> Self {
        Self {
            context,
            proceed: true,
            message: None,
        }
    }

    /// Halt the workflow cleanly after this step.
    pub fn halt(context: WorkflowContext<T>, message: impl Into<String>) -> Self {
        Self {
            context,
            proceed: false,
            message: Some(message.into()),
        }
    }

    /// Attach an outcome message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The unit of work in a workflow.
///
/// Steps run strictly in sequence; each receives the context produced by its
/// predecessor and returns a new one. A step must not throw for *expected*
/// per-item failures (one URL failing to scrape); those are reported through
/// the progress stream with `success: false` while the step still proceeds
/// with the surviving subset. Returning `Err` is reserved for structural
/// failures the engine's error hook should see.
#[async_trait]
pub trait WorkflowStep<T>: Send + Sync {
    /// Stable, unique (within one workflow) name for this step. Used for
    /// progress attribution and statistics.
    fn name(&self) -> &str;

    /// Whether this step produces the initial working set.
    ///
    /// Non-producer steps are skipped by the engine when the incoming item
    /// collection is empty; producer steps run even with zero input items.
    fn is_producer(&self) -> bool {
        false
    }

    /// Execute this step, consuming and replacing the context.
    async fn execute(&self, ctx: WorkflowContext<T>) -> Result<StepResult<T>>;
}

#[async_trait]
impl<T: Send + 'static> WorkflowStep<T> for Box<dyn WorkflowStep<T>> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_producer(&self) -> bool {
        (**self).is_producer()
    }

    async fn execute(&self, ctx: WorkflowContext<T>) -> Result<StepResult<T>> {
        (**self).execute(ctx).await
    }
}

/// A step constructed from a closure.
///
/// # Example
///
/// ```rust
/// use content_workflow::{FnStep, StepResult, WorkflowContext, WorkflowStep};
///
/// # tokio_test::block_on(async {
/// let double = FnStep::new("double", |ctx: WorkflowContext<i32>| async move {
///     let items = ctx.items.iter().map(|x| x * 2).collect();
///     Ok(StepResult::proceed(ctx.with_items(items)))
/// });
///
/// let ctx = WorkflowContext::new("u").with_items(vec![1, 2]);
/// let result = double.execute(ctx).await.unwrap();
/// assert_eq!(result.context.items, vec![2, 4]);
/// # });
/// ```
pub struct FnStep<T, F> {
    name: String,
    producer: bool,
    f: F,
    _phantom: PhantomData<fn(T) -> T>,
}

impl<T, F, Fut> FnStep<T, F>
where
    F: Fn(WorkflowContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepResult<T>>> + Send + 'static,
    T: Send + 'static,
{
    /// Create a new closure step with the given name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            producer: false,
            f,
            _phantom: PhantomData,
        }
    }

    /// Mark this step as a producer (runs even with zero input items).
    #[must_use]
    pub fn producer(mut self) -> Self {
        self.producer = true;
        self
    }
}

#[async_trait]
impl<T, F, Fut> WorkflowStep<T> for FnStep<T, F>
where
    F: Fn(WorkflowContext<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepResult<T>>> + Send + 'static,
    T: Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_producer(&self) -> bool {
        self.producer
    }

    async fn execute(&self, ctx: WorkflowContext<T>) -> Result<StepResult<T>> {
        (self.f)(ctx).await
    }
}
