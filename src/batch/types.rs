//! Batch request and result types

use crate::commands::{CommandError, CommandResult, Warning};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchCommand {
    /// Defaults to `cmd-{index}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub command: String,
    #[serde(default)]
    pub input: Value,
}

impl BatchCommand {
    pub fn new(command: impl Into<String>, input: Value) -> Self {
        Self {
            id: None,
            command: command.into(),
            input,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    /// Skip everything after the first failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_on_error: Option<bool>,

    /// Wall-clock budget, checked between commands or windows
    #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Commands in flight per window; 1 or less runs sequentially
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub commands: Vec<BatchCommand>,
    #[serde(default)]
    pub options: BatchOptions,
}

impl BatchRequest {
    pub fn new(commands: Vec<BatchCommand>) -> Self {
        Self {
            commands,
            options: BatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchCommandResult {
    pub id: String,
    /// Position in the request
    pub index: usize,
    pub command: String,
    pub result: CommandResult,
    pub duration_ms: u64,
    /// Never started: halted by `stop_on_error` or the batch timeout
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Skipped after an earlier failure or never started before the timeout
    pub skipped_count: usize,
}

impl BatchSummary {
    /// Fraction of commands that succeeded, 0 for an empty batch
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.success_count as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchTiming {
    /// RFC 3339
    pub started_at: String,
    pub ended_at: String,
    pub total_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_ms: Option<u64>,
}

/// A command's warning, tagged with the command it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchWarning {
    pub command_id: String,
    #[serde(flatten)]
    pub warning: Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// The batch ran to completion, even if some commands failed
    pub success: bool,
    pub results: Vec<BatchCommandResult>,
    pub summary: BatchSummary,
    pub timing: BatchTiming,
    pub confidence: f64,
    pub reasoning: String,
    pub warnings: Vec<BatchWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl BatchResult {
    /// Looks up a command's result by id
    pub fn get(&self, id: &str) -> Option<&BatchCommandResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn successful(&self) -> impl Iterator<Item = &BatchCommandResult> {
        self.results.iter().filter(|r| r.result.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &BatchCommandResult> {
        self.results.iter().filter(|r| !r.result.success)
    }
}
