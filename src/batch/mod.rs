//! Batch execution
//!
//! Runs many independent commands in one call with partial-success
//! semantics: a failed command never fails the batch itself. Commands run in
//! windows of `parallelism` concurrent executions; a window is never aborted
//! once started, so `stop_on_error` and `timeout` take effect between
//! windows.

use crate::commands::{CommandContext, CommandError, CommandRegistry, CommandResult};
use crate::error::ErrorCode;
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};

pub mod types;

pub use types::{
    BatchCommand, BatchCommandResult, BatchOptions, BatchRequest, BatchResult, BatchSummary,
    BatchTiming, BatchWarning,
};

/// A command with its final id and position
struct PlannedCommand {
    index: usize,
    id: String,
    command: String,
    input: Value,
}

/// Why the remaining commands will not run
#[derive(Debug, Clone, Copy)]
enum Halt {
    Failure,
    Timeout(u64),
}

impl CommandRegistry {
    /// Executes a batch of commands
    ///
    /// Results come back in request order. Options left unset fall back to
    /// the registry's batch configuration; parallelism is capped at
    /// `batch.max_parallelism`.
    pub async fn execute_batch(
        &self,
        request: BatchRequest,
        ctx: Option<&CommandContext>,
    ) -> BatchResult {
        let started_at = Utc::now().to_rfc3339();
        let start = Instant::now();

        if request.commands.is_empty() {
            warn!("Rejected empty batch request");
            return invalid_batch(started_at);
        }

        let config = &self.config().batch;
        let options = &request.options;
        let window_size = options
            .parallelism
            .unwrap_or(config.default_parallelism)
            .clamp(1, config.max_parallelism.max(1));
        let stop_on_error = options.stop_on_error.unwrap_or(false);
        let timeout_ms = options.timeout_ms.or(config.default_timeout_ms);
        let total = request.commands.len();

        debug!(
            commands = total,
            window_size,
            stop_on_error,
            timeout_ms = ?timeout_ms,
            "Starting batch"
        );

        let mut pending = request
            .commands
            .into_iter()
            .enumerate()
            .map(|(index, cmd)| PlannedCommand {
                index,
                id: cmd.id.unwrap_or_else(|| format!("cmd-{index}")),
                command: cmd.command,
                input: cmd.input,
            });

        let mut results: Vec<BatchCommandResult> = Vec::with_capacity(total);
        let mut halted: Option<Halt> = None;

        loop {
            let window: Vec<PlannedCommand> = pending.by_ref().take(window_size).collect();
            if window.is_empty() {
                break;
            }

            if let Some(halt) = halted {
                results.extend(window.into_iter().map(|planned| halted_result(planned, halt)));
                continue;
            }

            let outcomes = join_all(window.into_iter().map(|planned| self.run_planned(planned, ctx))).await;
            let window_failed = outcomes.iter().any(|r| !r.result.success);
            results.extend(outcomes);

            if stop_on_error && window_failed {
                debug!("Batch command failed, skipping remaining commands");
                halted = Some(Halt::Failure);
            } else if let Some(limit) = timeout_ms {
                let elapsed = start.elapsed().as_millis() as u64;
                if elapsed > limit && results.len() < total {
                    warn!(elapsed_ms = elapsed, limit_ms = limit, "Batch timed out");
                    halted = Some(Halt::Timeout(limit));
                }
            }
        }

        let total_ms = start.elapsed().as_millis() as u64;
        let summary = summarize_batch(&results);
        let confidence = calculate_batch_confidence(&results);
        let reasoning = batch_reasoning(&summary);
        let warnings = collect_warnings(&results);

        info!(
            total = summary.total,
            succeeded = summary.success_count,
            failed = summary.failure_count,
            skipped = summary.skipped_count,
            duration_ms = total_ms,
            "Batch finished"
        );

        BatchResult {
            success: true,
            results,
            summary,
            timing: BatchTiming {
                started_at,
                ended_at: Utc::now().to_rfc3339(),
                total_ms,
                average_ms: Some(total_ms / total as u64),
            },
            confidence,
            reasoning,
            warnings,
            error: None,
        }
    }

    async fn run_planned(
        &self,
        planned: PlannedCommand,
        ctx: Option<&CommandContext>,
    ) -> BatchCommandResult {
        let start = Instant::now();
        let result = self.execute(&planned.command, planned.input, ctx).await;
        BatchCommandResult {
            id: planned.id,
            index: planned.index,
            command: planned.command,
            result,
            duration_ms: start.elapsed().as_millis() as u64,
            skipped: false,
        }
    }
}

fn halted_result(planned: PlannedCommand, halt: Halt) -> BatchCommandResult {
    let error = match halt {
        Halt::Failure => CommandError::new(
            ErrorCode::COMMAND_SKIPPED,
            "Command skipped because an earlier command failed",
        )
        .with_suggestion("Fix the failing command, or run the batch without stop_on_error"),
        Halt::Timeout(limit) => CommandError::new(
            ErrorCode::BATCH_TIMEOUT,
            format!("Batch exceeded its {limit}ms timeout before this command started"),
        )
        .with_suggestion("Increase the batch timeout or split the batch")
        .with_retryable(true)
        .with_detail("timeoutMs", Value::from(limit)),
    };

    BatchCommandResult {
        id: planned.id,
        index: planned.index,
        command: planned.command,
        result: CommandResult::failure(error),
        duration_ms: 0,
        skipped: true,
    }
}

fn invalid_batch(started_at: String) -> BatchResult {
    BatchResult {
        success: false,
        results: Vec::new(),
        summary: BatchSummary::default(),
        timing: BatchTiming {
            started_at,
            ended_at: Utc::now().to_rfc3339(),
            total_ms: 0,
            average_ms: None,
        },
        confidence: 0.0,
        reasoning: "Batch request contained no commands".to_string(),
        warnings: Vec::new(),
        error: Some(
            CommandError::new(
                ErrorCode::INVALID_BATCH_REQUEST,
                "Batch request must contain at least one command",
            )
            .with_suggestion("Provide an array of commands to execute")
            .with_retryable(false),
        ),
    }
}

/// Counts outcomes; `total` always equals the sum of the three counts
pub fn summarize_batch(results: &[BatchCommandResult]) -> BatchSummary {
    let mut summary = BatchSummary {
        total: results.len(),
        ..Default::default()
    };
    for r in results {
        if r.result.success {
            summary.success_count += 1;
        } else if r.skipped {
            summary.skipped_count += 1;
        } else {
            summary.failure_count += 1;
        }
    }
    summary
}

/// Blends the success ratio with the average confidence of successes
///
/// `0.5 * success_ratio + 0.5 * avg_confidence`, where a success without a
/// confidence counts as 1.0. An empty batch scores 1.
pub fn calculate_batch_confidence(results: &[BatchCommandResult]) -> f64 {
    if results.is_empty() {
        return 1.0;
    }

    let confidences: Vec<f64> = results
        .iter()
        .filter(|r| r.result.success)
        .map(|r| r.result.confidence.unwrap_or(1.0))
        .collect();

    let success_ratio = confidences.len() as f64 / results.len() as f64;
    let avg_confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    0.5 * success_ratio + 0.5 * avg_confidence
}

fn batch_reasoning(summary: &BatchSummary) -> String {
    let mut reasoning = format!(
        "Executed {} commands: {} succeeded, {} failed",
        summary.total, summary.success_count, summary.failure_count
    );
    if summary.skipped_count > 0 {
        reasoning.push_str(&format!(", {} skipped", summary.skipped_count));
    }
    reasoning
}

fn collect_warnings(results: &[BatchCommandResult]) -> Vec<BatchWarning> {
    results
        .iter()
        .flat_map(|r| {
            r.result
                .warnings
                .iter()
                .flatten()
                .map(move |warning| BatchWarning {
                    command_id: r.id.clone(),
                    warning: warning.clone(),
                })
        })
        .collect()
}
