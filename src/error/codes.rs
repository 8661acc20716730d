/// Error code registry for switchyard
///
/// Codes are stable strings carried in [`CommandError::code`](crate::CommandError).
/// They are organized by the layer that produces them:
/// - Registry: lookup, exposure and handler failures
/// - Batch: request validation, skip cascades and wall-clock timeouts
/// - Pipeline: pipeline-level timeouts
/// - Streaming: cancellation and consumer-side invariant checks
/// - Handler-facing: conventional codes handlers return themselves
///
/// Handlers are free to introduce their own codes; the set is open.
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Registry
    pub const COMMAND_NOT_FOUND: &'static str = "COMMAND_NOT_FOUND";
    pub const COMMAND_NOT_EXPOSED: &'static str = "COMMAND_NOT_EXPOSED";
    pub const COMMAND_EXECUTION_ERROR: &'static str = "COMMAND_EXECUTION_ERROR";

    // Batch
    pub const INVALID_BATCH_REQUEST: &'static str = "INVALID_BATCH_REQUEST";
    pub const COMMAND_SKIPPED: &'static str = "COMMAND_SKIPPED";
    pub const BATCH_TIMEOUT: &'static str = "BATCH_TIMEOUT";

    // Pipeline
    pub const PIPELINE_TIMEOUT: &'static str = "PIPELINE_TIMEOUT";

    // Streaming
    pub const STREAM_ABORTED: &'static str = "STREAM_ABORTED";
    pub const STREAM_ENDED_UNEXPECTEDLY: &'static str = "STREAM_ENDED_UNEXPECTEDLY";

    // Handler-facing
    pub const VALIDATION_ERROR: &'static str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const RATE_LIMITED: &'static str = "RATE_LIMITED";
    pub const TIMEOUT: &'static str = "TIMEOUT";
    pub const INTERNAL_ERROR: &'static str = "INTERNAL_ERROR";
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: &str) -> &'static str {
    match code {
        ErrorCode::COMMAND_NOT_FOUND => "No command is registered under the requested name",
        ErrorCode::COMMAND_NOT_EXPOSED => "Command is not exposed to the invoking interface",
        ErrorCode::COMMAND_EXECUTION_ERROR => "Command handler raised an error",
        ErrorCode::INVALID_BATCH_REQUEST => "Batch request is malformed or empty",
        ErrorCode::COMMAND_SKIPPED => "Command skipped after an earlier failure",
        ErrorCode::BATCH_TIMEOUT => "Batch exceeded its wall-clock timeout",
        ErrorCode::PIPELINE_TIMEOUT => "Pipeline exceeded its wall-clock timeout",
        ErrorCode::STREAM_ABORTED => "Stream was cancelled by its consumer",
        ErrorCode::STREAM_ENDED_UNEXPECTEDLY => "Stream ended without a terminal chunk",
        ErrorCode::VALIDATION_ERROR => "Input failed validation",
        ErrorCode::NOT_FOUND => "Requested resource does not exist",
        ErrorCode::RATE_LIMITED => "Rate limit exceeded",
        ErrorCode::TIMEOUT => "Operation timed out",
        ErrorCode::INTERNAL_ERROR => "Internal error",
        _ => "Unknown error code",
    }
}

/// Whether a code is one the core itself manufactures
pub fn is_core_error_code(code: &str) -> bool {
    matches!(
        code,
        ErrorCode::COMMAND_NOT_FOUND
            | ErrorCode::COMMAND_NOT_EXPOSED
            | ErrorCode::COMMAND_EXECUTION_ERROR
            | ErrorCode::INVALID_BATCH_REQUEST
            | ErrorCode::COMMAND_SKIPPED
            | ErrorCode::BATCH_TIMEOUT
            | ErrorCode::PIPELINE_TIMEOUT
            | ErrorCode::STREAM_ABORTED
            | ErrorCode::STREAM_ENDED_UNEXPECTEDLY
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(
            describe_error_code("BATCH_TIMEOUT"),
            "Batch exceeded its wall-clock timeout"
        );
        assert_eq!(
            describe_error_code(ErrorCode::STREAM_ABORTED),
            "Stream was cancelled by its consumer"
        );
        assert_eq!(describe_error_code("SOMETHING_ELSE"), "Unknown error code");
    }

    #[test]
    fn test_core_codes() {
        assert!(is_core_error_code(ErrorCode::COMMAND_SKIPPED));
        assert!(is_core_error_code(ErrorCode::STREAM_ENDED_UNEXPECTEDLY));
        assert!(!is_core_error_code(ErrorCode::VALIDATION_ERROR));
        assert!(!is_core_error_code("TODO_NOT_FOUND"));
    }
}
