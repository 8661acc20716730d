//! Result types for command execution

use crate::commands::metadata::{Alternative, PlanStep, Source, Warning};
use crate::error::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Result envelope returned by every command
///
/// `data` is meaningful only when `success` is true and `error` only when it
/// is false. Callers branch on `success` and treat the other field
/// defensively.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T = Value> {
    /// Whether the command succeeded
    pub success: bool,

    /// The output data from the command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    /// Structured error if the command failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,

    /// Trust score in 0..=1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanStep>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative<T>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
}

/// Execution metadata attached to a result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> CommandResult<T> {
    fn empty(success: bool, data: Option<T>, error: Option<CommandError>) -> Self {
        Self {
            success,
            data,
            error,
            confidence: None,
            reasoning: None,
            sources: None,
            plan: None,
            alternatives: None,
            warnings: None,
            metadata: None,
        }
    }

    /// Creates a successful result
    pub fn success(data: T) -> Self {
        Self::empty(true, Some(data), None)
    }

    /// Creates a failed result
    pub fn failure(error: CommandError) -> Self {
        Self::empty(false, None, Some(error))
    }

    /// Sets the confidence, clamped to 0..=1
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = Some(sources);
        self
    }

    pub fn with_plan(mut self, plan: Vec<PlanStep>) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Alternative<T>>) -> Self {
        self.alternatives = Some(alternatives);
        self
    }

    /// Appends a single warning
    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warnings.get_or_insert_with(Vec::new).push(warning);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<Warning>) -> Self {
        self.warnings = Some(warnings);
        self
    }

    pub fn with_metadata(mut self, metadata: ResultMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Checks if the result indicates success
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Checks if the result indicates failure
    pub fn is_failure(&self) -> bool {
        !self.success
    }

    /// Error code of a failed result
    pub fn error_code(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.error.as_ref().map(|e| e.code.as_str())
    }

    /// Converts to a `Result`, synthesizing an error for a malformed failure
    pub fn into_result(self) -> Result<T, CommandError> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (true, None, _) => Err(CommandError::internal(
                "Command reported success without data",
            )),
            (false, _, Some(error)) => Err(error),
            (false, _, None) => Err(CommandError::internal(
                "Command reported failure without an error",
            )),
        }
    }
}

/// Creates a successful result
pub fn success<T>(data: T) -> CommandResult<T> {
    CommandResult::success(data)
}

/// Creates a failed result
pub fn failure<T>(error: CommandError) -> CommandResult<T> {
    CommandResult::failure(error)
}

/// Actionable error carried inside a failed [`CommandResult`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    /// Machine-readable code, see [`ErrorCode`]
    pub code: String,

    pub message: String,

    /// What the caller can do about it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<CommandError>>,
}

impl CommandError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            retryable: None,
            details: None,
            cause: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Adds one entry to `details`
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_cause(mut self, cause: CommandError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Resource lookup miss inside a handler
    pub fn not_found(resource: &str, id: &str) -> Self {
        Self::new(
            ErrorCode::NOT_FOUND,
            format!("{resource} with ID '{id}' not found"),
        )
        .with_suggestion(format!(
            "Verify the {} ID exists and try again",
            resource.to_lowercase()
        ))
        .with_retryable(false)
        .with_detail("resourceType", Value::String(resource.to_string()))
        .with_detail("resourceId", Value::String(id.to_string()))
    }

    pub fn validation(message: impl Into<String>, suggestion: Option<&str>) -> Self {
        let error = Self::new(ErrorCode::VALIDATION_ERROR, message).with_retryable(false);
        match suggestion {
            Some(s) => error.with_suggestion(s),
            None => error.with_suggestion("Check the input and try again"),
        }
    }

    pub fn rate_limited(retry_after_secs: Option<u64>) -> Self {
        let error = Self::new(ErrorCode::RATE_LIMITED, "Rate limit exceeded").with_retryable(true);
        match retry_after_secs {
            Some(secs) => error
                .with_suggestion(format!("Wait {secs} seconds and try again"))
                .with_detail("retryAfterSeconds", Value::from(secs)),
            None => error.with_suggestion("Wait a moment and try again"),
        }
    }

    pub fn timeout(operation: &str, timeout_ms: u64) -> Self {
        Self::new(
            ErrorCode::TIMEOUT,
            format!("Operation '{operation}' timed out after {timeout_ms}ms"),
        )
        .with_suggestion("Try again with a simpler request or a longer timeout")
        .with_retryable(true)
        .with_detail("operationName", Value::String(operation.to_string()))
        .with_detail("timeoutMs", Value::from(timeout_ms))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::INTERNAL_ERROR, message)
            .with_suggestion("Please try again. If this persists, report the issue.")
            .with_retryable(true)
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}
