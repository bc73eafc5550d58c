//! The workflow execution engine.
//!
//! A [`Workflow`] owns an ordered list of steps plus four optional lifecycle
//! hooks and exposes a single [`execute`](Workflow::execute) entry point. The
//! engine guarantees strict sequential execution, a clean halt path for
//! `proceed = false`, error-hook mediation for step failures, and that the
//! completion hook always observes final statistics and items, whether the
//! run completed, halted, or failed.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::progress::ProgressHook;
use crate::stats::ExecutionStats;
use crate::step::WorkflowStep;
use crate::{Error, Result, WorkflowContext};

/// Invoked once before the first step, with the ordered step names.
pub type StartHook = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Invoked once after the run with final statistics and items. Always fires,
/// whether the run completed, halted, or failed.
pub type CompleteHook<T> = Arc<dyn Fn(&ExecutionStats, &[T]) + Send + Sync>;

/// Invoked when a step returns an error; decides whether the run continues.
pub type ErrorHook<T> = Arc<dyn for<'a> Fn(StepFailure<'a, T>) -> ErrorDecision<T> + Send + Sync>;

/// Details handed to the error hook when a step fails.
pub struct StepFailure<'a, T> {
    /// The error the step returned.
    pub error: &'a Error,
    /// Name of the failing step.
    pub step_name: &'a str,
    /// Zero-based position of the failing step.
    pub step_index: usize,
    /// The context as it was before the failing step ran.
    pub context: &'a WorkflowContext<T>,
}

/// The error hook's verdict.
pub enum ErrorDecision<T> {
    /// Abort the run; the error propagates and the run is marked
    /// unsuccessful. The completion hook still fires.
    Abort,
    /// Continue with the next step, optionally substituting a repaired
    /// context. `None` reuses the context from before the failing step.
    Continue(Option<WorkflowContext<T>>),
}

/// The final context and statistics of a successful run.
pub struct WorkflowRun<T> {
    /// The context produced by the last executed step.
    pub context: WorkflowContext<T>,
    /// Statistics for the run.
    pub stats: ExecutionStats,
}

/// An ordered, executable sequence of steps plus lifecycle hooks.
///
/// Built via [`WorkflowBuilder`](crate::WorkflowBuilder). Each call to
/// [`execute`](Workflow::execute) owns its context exclusively; workflows may
/// be executed repeatedly and concurrently, each run independent of the
/// others.
pub struct Workflow<T> {
    pub(crate) name: String,
    pub(crate) steps: Vec<Box<dyn WorkflowStep<T>>>,
    pub(crate) on_start: Option<StartHook>,
    pub(crate) on_item_processed: Option<ProgressHook<T>>,
    pub(crate) on_error: Option<ErrorHook<T>>,
    pub(crate) on_complete: Option<CompleteHook<T>>,
}

impl<T> Workflow<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Returns the workflow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the configured steps, in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    /// Run the workflow for `user_id`.
    ///
    /// Steps execute strictly in order, each consuming and replacing the
    /// context. A step returning `proceed = false` halts the run cleanly; a
    /// step returning `Err` is routed through the error hook, which decides
    /// between continuing (optionally with a replacement context) and
    /// aborting. The completion hook fires in every case, so callers can
    /// always observe partial results.
    pub async fn execute(
        &self,
        user_id: &str,
        source_path: Option<&str>,
        output_path: Option<&str>,
    ) -> Result<WorkflowRun<T>> {
        let started = Instant::now();

        let mut ctx = WorkflowContext::new(user_id);
        if let Some(path) = source_path {
            ctx = ctx.with_source_path(path);
        }
        if let Some(path) = output_path {
            ctx = ctx.with_output_path(path);
        }
        if let Some(hook) = &self.on_item_processed {
            ctx = ctx.with_progress(Arc::clone(hook));
        }

        let step_names = self.step_names();
        info!(workflow = %self.name, steps = step_names.len(), "starting workflow");
        if let Some(hook) = &self.on_start {
            hook(&step_names);
        }

        let mut executed: Vec<String> = Vec::new();
        let mut run_error: Option<Error> = None;

        for (index, step) in self.steps.iter().enumerate() {
            let step_name = step.name().to_string();

            if ctx.items.is_empty() && !step.is_producer() {
                debug!(workflow = %self.name, step = %step_name, "empty input, step is a no-op");
                executed.push(step_name);
                continue;
            }

            let before = ctx.clone();
            match step.execute(ctx).await {
                Ok(result) => {
                    ctx = result.context;
                    executed.push(step_name.clone());
                    if let Some(message) = &result.message {
                        debug!(workflow = %self.name, step = %step_name, %message, "step message");
                    }
                    if !result.proceed {
                        info!(workflow = %self.name, step = %step_name, "workflow halted by step");
                        break;
                    }
                }
                Err(error) => {
                    warn!(workflow = %self.name, step = %step_name, %error, "step failed");
                    let decision = match &self.on_error {
                        Some(hook) => hook(StepFailure {
                            error: &error,
                            step_name: &step_name,
                            step_index: index,
                            context: &before,
                        }),
                        None => ErrorDecision::Abort,
                    };
                    match decision {
                        ErrorDecision::Continue(replacement) => {
                            ctx = replacement.unwrap_or(before);
                            executed.push(step_name);
                        }
                        ErrorDecision::Abort => {
                            ctx = before;
                            run_error = Some(Error::Step {
                                step_name: step_name.clone(),
                                message: error.to_string(),
                            });
                            break;
                        }
                    }
                }
            }
        }

        let stats = ExecutionStats {
            total_steps: self.steps.len(),
            completed_steps: executed.len(),
            executed_step_names: executed,
            duration_ms: started.elapsed().as_millis(),
            success: run_error.is_none(),
            items_processed: ctx.items.len(),
        };

        // Completion always observes the final state, even on failure.
        if let Some(hook) = &self.on_complete {
            hook(&stats, &ctx.items);
        }

        match run_error {
            Some(error) => Err(error),
            None => Ok(WorkflowRun { context: ctx, stats }),
        }
    }
}

impl<T> std::fmt::Debug for Workflow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for WorkflowRun<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowRun")
            .field("context", &self.context)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{FnStep, StepResult};
    use crate::WorkflowBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type BoxStepFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Result<StepResult<i32>>> + Send>>;

    fn add_step(
        name: &str,
        n: i32,
    ) -> FnStep<i32, impl Fn(WorkflowContext<i32>) -> BoxStepFuture + Send + Sync> {
        FnStep::new(name, move |ctx: WorkflowContext<i32>| -> BoxStepFuture {
            Box::pin(async move {
                let items = ctx.items.iter().map(|x| x + n).collect();
                Ok(StepResult::proceed(ctx.with_items(items)))
            })
        })
    }

    #[tokio::test]
    async fn runs_steps_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&order), Arc::clone(&order));

        let workflow = WorkflowBuilder::new("order")
            .step(
                FnStep::new("first", move |ctx: WorkflowContext<i32>| {
                    let order = Arc::clone(&a);
                    async move {
                        order.lock().unwrap().push("first");
                        Ok(StepResult::proceed(ctx.with_items(vec![1])))
                    }
                })
                .producer(),
            )
            .step(FnStep::new("second", move |ctx: WorkflowContext<i32>| {
                let order = Arc::clone(&b);
                async move {
                    order.lock().unwrap().push("second");
                    Ok(StepResult::proceed(ctx))
                }
            }))
            .build()
            .unwrap();

        let run = workflow.execute("u", None, None).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(run.stats.executed_step_names, vec!["first", "second"]);
        assert!(run.stats.success);
        assert!(run.stats.ran_all_steps());
    }

    #[tokio::test]
    async fn halt_skips_later_steps() {
        let later_ran = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&later_ran);

        let workflow = WorkflowBuilder::new("halting")
            .step(
                FnStep::new("guard", |ctx: WorkflowContext<i32>| async move {
                    Ok(StepResult::halt(ctx, "missing identity"))
                })
                .producer(),
            )
            .step(
                FnStep::new("after", move |ctx: WorkflowContext<i32>| {
                    let flag = Arc::clone(&flag);
                    async move {
                        flag.fetch_add(1, Ordering::SeqCst);
                        Ok(StepResult::proceed(ctx))
                    }
                })
                .producer(),
            )
            .build()
            .unwrap();

        let run = workflow.execute("u", None, None).await.unwrap();
        assert_eq!(later_ran.load(Ordering::SeqCst), 0);
        assert_eq!(run.stats.executed_step_names, vec!["guard"]);
        assert!(run.stats.success);
    }

    #[tokio::test]
    async fn on_complete_fires_exactly_once_on_success_halt_and_error() {
        for outcome in ["ok", "halt", "err"] {
            let completions = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&completions);

            let workflow = WorkflowBuilder::new("completion")
                .step(
                    FnStep::new("only", move |ctx: WorkflowContext<i32>| {
                        let outcome = outcome.to_string();
                        async move {
                            match outcome.as_str() {
                                "ok" => Ok(StepResult::proceed(ctx)),
                                "halt" => Ok(StepResult::halt(ctx, "stop")),
                                _ => Err(Error::Execution("boom".into())),
                            }
                        }
                    })
                    .producer(),
                )
                .on_complete(move |_stats, _items| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .build()
                .unwrap();

            let result = workflow.execute("u", None, None).await;
            assert_eq!(result.is_err(), outcome == "err");
            assert_eq!(completions.load(Ordering::SeqCst), 1, "outcome {outcome}");
        }
    }

    #[tokio::test]
    async fn on_complete_sees_failure_stats() {
        let observed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&observed);

        let workflow = WorkflowBuilder::new("failing")
            .step(
                FnStep::new("boom", |_ctx: WorkflowContext<i32>| async move {
                    Err(Error::Execution("unexpected".into()))
                })
                .producer(),
            )
            .on_complete(move |stats, _items| {
                *sink.lock().unwrap() = Some(stats.clone());
            })
            .build()
            .unwrap();

        let err = workflow.execute("u", None, None).await.unwrap_err();
        assert!(matches!(err, Error::Step { .. }));
        let stats = observed.lock().unwrap().clone().unwrap();
        assert!(!stats.success);
        assert_eq!(stats.completed_steps, 0);
    }

    #[tokio::test]
    async fn error_hook_can_continue_with_replacement_context() {
        let workflow = WorkflowBuilder::new("recovering")
            .step(
                FnStep::new("boom", |_ctx: WorkflowContext<i32>| async move {
                    Err(Error::Execution("transient defect".into()))
                })
                .producer(),
            )
            .step(add_step("inc", 1))
            .on_error(|failure: StepFailure<'_, i32>| {
                assert_eq!(failure.step_name, "boom");
                assert_eq!(failure.step_index, 0);
                let repaired = failure.context.clone().with_items(vec![10]);
                ErrorDecision::Continue(Some(repaired))
            })
            .build()
            .unwrap();

        let run = workflow.execute("u", None, None).await.unwrap();
        assert_eq!(run.context.items, vec![11]);
        assert_eq!(run.stats.executed_step_names, vec!["boom", "inc"]);
        assert!(run.stats.success);
    }

    #[tokio::test]
    async fn error_without_hook_aborts() {
        let workflow = WorkflowBuilder::new("aborting")
            .step(
                FnStep::new("boom", |_ctx: WorkflowContext<i32>| async move {
                    Err(Error::Execution("fatal".into()))
                })
                .producer(),
            )
            .step(add_step("unreached", 1))
            .build()
            .unwrap();

        let err = workflow.execute("u", None, None).await.unwrap_err();
        match err {
            Error::Step { step_name, message } => {
                assert_eq!(step_name, "boom");
                assert!(message.contains("fatal"));
            }
            other => panic!("expected step error, got {other}"),
        }
    }

    #[tokio::test]
    async fn empty_input_skips_non_producer_steps() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        let workflow = WorkflowBuilder::new("empty")
            .step(FnStep::new("transform", move |ctx: WorkflowContext<i32>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(StepResult::proceed(ctx))
                }
            }))
            .build()
            .unwrap();

        let run = workflow.execute("u", None, None).await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        // A skipped step still counts as executed.
        assert_eq!(run.stats.executed_step_names, vec!["transform"]);
    }

    #[tokio::test]
    async fn producer_runs_with_empty_input() {
        let workflow = WorkflowBuilder::new("producing")
            .step(
                FnStep::new("produce", |ctx: WorkflowContext<i32>| async move {
                    Ok(StepResult::proceed(ctx.with_items(vec![1, 2])))
                })
                .producer(),
            )
            .build()
            .unwrap();

        let run = workflow.execute("u", None, None).await.unwrap();
        assert_eq!(run.context.items, vec![1, 2]);
        assert_eq!(run.stats.items_processed, 2);
    }

    #[tokio::test]
    async fn on_start_receives_ordered_step_names() {
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);

        let workflow = WorkflowBuilder::new("announcing")
            .step(add_step("a", 1))
            .step(add_step("b", 2))
            .on_start(move |step_names| {
                *sink.lock().unwrap() = step_names.to_vec();
            })
            .build()
            .unwrap();

        workflow.execute("u", None, None).await.unwrap();
        assert_eq!(*names.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn paths_land_in_context() {
        let workflow = WorkflowBuilder::new("paths")
            .step(
                FnStep::new("check", |ctx: WorkflowContext<i32>| async move {
                    assert_eq!(ctx.source_path.as_deref(), Some("in.csv"));
                    assert_eq!(ctx.output_path.as_deref(), Some("out.csv"));
                    Ok(StepResult::proceed(ctx))
                })
                .producer(),
            )
            .build()
            .unwrap();

        workflow
            .execute("u", Some("in.csv"), Some("out.csv"))
            .await
            .unwrap();
    }
}
