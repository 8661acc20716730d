//! Sequential command pipelines
//!
//! Each step may reference earlier outputs through variables (`$prev.id`,
//! `$steps.user.email`) and may be guarded by a `when` condition. A failed
//! step stops the pipeline unless `continue_on_failure` is set.

use crate::commands::{CommandContext, CommandError, CommandRegistry, CommandResult};
use crate::error::ErrorCode;
use crate::streaming::{chunks_from_result, StreamChunk};
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod aggregate;
pub mod condition;
pub mod types;
pub mod variables;

pub use aggregate::{
    aggregate_pipeline_alternatives, aggregate_pipeline_confidence, aggregate_pipeline_reasoning,
    aggregate_pipeline_sources, aggregate_pipeline_warnings, build_confidence_breakdown,
    build_pipeline_metadata,
};
pub use condition::{evaluate_condition, is_pipeline_condition, PipelineCondition};
pub use types::{
    create_pipeline, PipelineAlternative, PipelineContext, PipelineMetadata, PipelineOptions,
    PipelineRequest, PipelineResult, PipelineSource, PipelineStep, PipelineWarning,
    StepConfidence, StepMetadata, StepReasoning, StepResult, StepStatus,
};
pub use variables::{get_nested_value, resolve_variable, resolve_variables};

/// Receives pipeline progress as it happens
///
/// Every method defaults to a no-op.
pub trait PipelineObserver: Send + Sync {
    fn on_step_start(&self, _index: usize, _step: &PipelineStep) {}

    /// Called for executed, skipped and cascaded steps alike
    fn on_step_complete(&self, _result: &StepResult) {}

    /// Chunks of steps declared with `stream: true`
    fn on_chunk(&self, _index: usize, _chunk: &StreamChunk) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

impl CommandRegistry {
    /// Runs a pipeline, see [`CommandRegistry::execute_pipeline_with`]
    pub async fn execute_pipeline(
        &self,
        request: PipelineRequest,
        ctx: Option<&CommandContext>,
    ) -> PipelineResult {
        self.execute_pipeline_with(request, ctx, &NoopObserver).await
    }

    /// Runs a pipeline, reporting progress to `observer`
    ///
    /// Steps run strictly in order. A skipped step takes no time and leaves
    /// `$prev` where it was. The pipeline's `data` is the output of the last
    /// successful step.
    pub async fn execute_pipeline_with(
        &self,
        request: PipelineRequest,
        ctx: Option<&CommandContext>,
        observer: &dyn PipelineObserver,
    ) -> PipelineResult {
        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let options = request.options.clone().unwrap_or_default();
        let defaults = &self.config().pipeline;
        let continue_on_failure = options
            .continue_on_failure
            .unwrap_or(defaults.continue_on_failure);
        let timeout_ms = options.timeout_ms.or(defaults.default_timeout_ms);

        debug!(pipeline = %id, steps = request.steps.len(), "Starting pipeline");

        let start = Instant::now();
        let mut results: Vec<StepResult> = Vec::with_capacity(request.steps.len());
        let mut previous: Option<usize> = None;
        let mut error: Option<CommandError> = None;

        for (index, step) in request.steps.iter().enumerate() {
            if let Some(limit) = timeout_ms {
                let elapsed = start.elapsed().as_millis() as u64;
                if index > 0 && elapsed >= limit {
                    warn!(pipeline = %id, elapsed_ms = elapsed, limit_ms = limit, "Pipeline timed out");
                    error = Some(pipeline_timeout_error(limit, index));
                    skip_remaining(&request.steps, index, &mut results, observer);
                    break;
                }
            }

            observer.on_step_start(index, step);

            let view = PipelineContext::new(
                request.input.as_ref(),
                previous.map(|i| &results[i]),
                &results,
            );

            if let Some(condition) = &step.when {
                if !evaluate_condition(condition, &view) {
                    debug!(pipeline = %id, step = index, command = %step.command, "Condition false, skipping step");
                    let skipped = StepResult::skipped(index, step);
                    observer.on_step_complete(&skipped);
                    results.push(skipped);
                    continue;
                }
            }

            let input = match &step.input {
                Some(template) => resolve_variables(template, &view),
                None => Value::Object(Map::new()),
            };

            let step_start = Instant::now();
            let result = self.execute(&step.command, input, ctx).await;
            let elapsed_ms = step_start.elapsed().as_millis() as u64;

            if step.stream == Some(true) {
                for chunk in chunks_from_result(result.clone(), elapsed_ms) {
                    observer.on_chunk(index, &chunk);
                }
            }

            let step_result = step_result_from(index, step, result, elapsed_ms);
            observer.on_step_complete(&step_result);

            let failure = (!step_result.is_success()).then(|| {
                step_result
                    .error
                    .clone()
                    .unwrap_or_else(|| CommandError::internal("Step failed without an error"))
            });
            results.push(step_result);
            previous = Some(results.len() - 1);

            if let Some(step_error) = failure {
                if !continue_on_failure {
                    warn!(pipeline = %id, step = index, code = %step_error.code, "Pipeline stopped on failed step");
                    error = Some(step_error);
                    skip_remaining(&request.steps, index + 1, &mut results, observer);
                    break;
                }
                debug!(pipeline = %id, step = index, "Step failed, continuing");
            }
        }

        let execution_time_ms = start.elapsed().as_millis() as u64;
        let data = results
            .iter()
            .rev()
            .find(|s| s.is_success())
            .and_then(|s| s.data.clone());
        let metadata = build_pipeline_metadata(&results, execution_time_ms);

        info!(
            pipeline = %id,
            completed = metadata.completed_steps,
            failed = metadata.failed_steps,
            skipped = metadata.skipped_steps,
            confidence = metadata.confidence,
            duration_ms = execution_time_ms,
            "Pipeline finished"
        );

        PipelineResult {
            id,
            success: error.is_none(),
            data,
            error,
            metadata,
            steps: results,
        }
    }
}

fn skip_remaining(
    steps: &[PipelineStep],
    from: usize,
    results: &mut Vec<StepResult>,
    observer: &dyn PipelineObserver,
) {
    for (index, step) in steps.iter().enumerate().skip(from) {
        let skipped = StepResult::skipped(index, step);
        observer.on_step_complete(&skipped);
        results.push(skipped);
    }
}

fn step_result_from(
    index: usize,
    step: &PipelineStep,
    result: CommandResult,
    execution_time_ms: u64,
) -> StepResult {
    let mut step_result = StepResult {
        index,
        alias: step.alias.clone(),
        command: step.command.clone(),
        status: StepStatus::Failure,
        data: None,
        error: None,
        execution_time_ms,
        metadata: None,
    };

    if !result.success {
        step_result.error = result.error;
        return step_result;
    }

    let has_metadata = result.confidence.is_some()
        || result.reasoning.is_some()
        || result.sources.is_some()
        || result.warnings.is_some()
        || result.alternatives.is_some();

    step_result.status = StepStatus::Success;
    step_result.data = result.data;
    if has_metadata {
        step_result.metadata = Some(StepMetadata {
            confidence: result.confidence,
            reasoning: result.reasoning,
            sources: result.sources,
            warnings: result.warnings,
            alternatives: result.alternatives,
        });
    }
    step_result
}

fn pipeline_timeout_error(limit_ms: u64, completed: usize) -> CommandError {
    CommandError::new(
        ErrorCode::PIPELINE_TIMEOUT,
        format!("Pipeline exceeded its {limit_ms}ms timeout after {completed} steps"),
    )
    .with_suggestion("Increase the pipeline timeout or split the work into smaller pipelines")
    .with_retryable(true)
    .with_detail("timeoutMs", Value::from(limit_ms))
    .with_detail("completedSteps", Value::from(completed))
}
