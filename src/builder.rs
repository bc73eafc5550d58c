//! Fluent builder for assembling workflows.

use std::collections::HashSet;
use std::sync::Arc;

use crate::progress::ItemProcessed;
use crate::stats::ExecutionStats;
use crate::step::WorkflowStep;
use crate::workflow::{ErrorDecision, StepFailure, Workflow};
use crate::{Error, Result};

/// Composes an ordered step list plus lifecycle hooks into a [`Workflow`].
///
/// # Example
///
/// ```rust
/// use content_workflow::{FnStep, StepResult, WorkflowBuilder, WorkflowContext};
///
/// # tokio_test::block_on(async {
/// let workflow = WorkflowBuilder::new("ingest")
///     .step(
///         FnStep::new("seed", |ctx: WorkflowContext<i32>| async move {
///             Ok(StepResult::proceed(ctx.with_items(vec![1, 2, 3])))
///         })
///         .producer(),
///     )
///     .step(FnStep::new("double", |ctx: WorkflowContext<i32>| async move {
///         let items = ctx.items.iter().map(|x| x * 2).collect();
///         Ok(StepResult::proceed(ctx.with_items(items)))
///     }))
///     .build()
///     .unwrap();
///
/// let run = workflow.execute("user-1", None, None).await.unwrap();
/// assert_eq!(run.context.items, vec![2, 4, 6]);
/// # });
/// ```
pub struct WorkflowBuilder<T> {
    name: String,
    steps: Vec<Box<dyn WorkflowStep<T>>>,
    on_start: Option<crate::workflow::StartHook>,
    on_item_processed: Option<crate::progress::ProgressHook<T>>,
    on_error: Option<crate::workflow::ErrorHook<T>>,
    on_complete: Option<crate::workflow::CompleteHook<T>>,
}

impl<T: Send + 'static> WorkflowBuilder<T> {
    /// Start a builder for a workflow with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            on_start: None,
            on_item_processed: None,
            on_error: None,
            on_complete: None,
        }
    }

    /// Append a step to the execution order.
    #[must_use]
    pub fn step(mut self, step: impl WorkflowStep<T> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Append an already-boxed step.
    #[must_use]
    pub fn boxed_step(mut self, step: Box<dyn WorkflowStep<T>>) -> Self {
        self.steps.push(step);
        self
    }

    /// Apply `configure` to this builder only when `condition` holds.
    ///
    /// Lets presets add optional steps (skip analysis, skip enrichment)
    /// without branching inside the steps themselves.
    #[must_use]
    pub fn when(self, condition: bool, configure: impl FnOnce(Self) -> Self) -> Self {
        if condition {
            configure(self)
        } else {
            self
        }
    }

    /// Hook invoked once before the first step, with the ordered step names.
    #[must_use]
    pub fn on_start(mut self, hook: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(hook));
        self
    }

    /// Hook invoked for every per-item progress notification.
    ///
    /// The engine injects it into the context so steps can report without
    /// the engine needing visibility into per-item behavior.
    #[must_use]
    pub fn on_item_processed(
        mut self,
        hook: impl for<'a> Fn(ItemProcessed<'a, T>) + Send + Sync + 'static,
    ) -> Self {
        self.on_item_processed = Some(Arc::new(hook));
        self
    }

    /// Hook invoked when a step returns an error; decides continue or abort.
    #[must_use]
    pub fn on_error(
        mut self,
        hook: impl for<'a> Fn(StepFailure<'a, T>) -> ErrorDecision<T> + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// Hook invoked once after the run with final statistics and items.
    #[must_use]
    pub fn on_complete(
        mut self,
        hook: impl Fn(&ExecutionStats, &[T]) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    /// Finish the builder.
    ///
    /// Step names must be unique within one workflow, since they attribute
    /// progress events and statistics; duplicates are rejected here.
    pub fn build(self) -> Result<Workflow<T>> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name().to_string()) {
                return Err(Error::Configuration(format!(
                    "duplicate step name '{}' in workflow '{}'",
                    step.name(),
                    self.name
                )));
            }
        }

        Ok(Workflow {
            name: self.name,
            steps: self.steps,
            on_start: self.on_start,
            on_item_processed: self.on_item_processed,
            on_error: self.on_error,
            on_complete: self.on_complete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{FnStep, StepResult};
    use crate::WorkflowContext;

    fn noop(name: &str) -> impl WorkflowStep<i32> {
        FnStep::new(name, |ctx: WorkflowContext<i32>| async move {
            Ok(StepResult::proceed(ctx))
        })
    }

    #[test]
    fn when_true_adds_steps() {
        let workflow = WorkflowBuilder::new("conditional")
            .step(noop("always"))
            .when(true, |b| b.step(noop("optional")))
            .build()
            .unwrap();
        assert_eq!(workflow.step_names(), vec!["always", "optional"]);
    }

    #[test]
    fn when_false_skips_steps() {
        let workflow = WorkflowBuilder::new("conditional")
            .step(noop("always"))
            .when(false, |b| b.step(noop("optional")))
            .build()
            .unwrap();
        assert_eq!(workflow.step_names(), vec!["always"]);
    }

    #[test]
    fn boxed_steps_compose() {
        let boxed: Box<dyn WorkflowStep<i32>> = Box::new(noop("first"));
        let workflow = WorkflowBuilder::new("boxed")
            .step(boxed)
            .boxed_step(Box::new(noop("second")))
            .build()
            .unwrap();
        assert_eq!(workflow.step_names(), vec!["first", "second"]);
    }

    #[test]
    fn duplicate_step_names_rejected() {
        let err = WorkflowBuilder::new("dupes")
            .step(noop("same"))
            .step(noop("same"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[tokio::test]
    async fn progress_hook_reaches_steps() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);

        let workflow = WorkflowBuilder::new("progressive")
            .step(
                FnStep::new("emit", |ctx: WorkflowContext<i32>| async move {
                    let ctx = ctx.with_items(vec![1, 2, 3]);
                    let total = ctx.items.len();
                    for (index, item) in ctx.items.iter().enumerate() {
                        ctx.report_progress(ItemProcessed::succeeded("emit", item, index, total));
                    }
                    Ok(StepResult::proceed(ctx))
                })
                .producer(),
            )
            .on_item_processed(move |info: ItemProcessed<'_, i32>| {
                assert_eq!(info.step_name, "emit");
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        workflow.execute("u", None, None).await.unwrap();
        assert_eq!(events.load(Ordering::SeqCst), 3);
    }
}
