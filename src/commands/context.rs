//! Execution context for command handlers

use crate::streaming::AbortSignal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Surface a command invocation arrives through
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Interface {
    Palette,
    Mcp,
    Agent,
    Cli,
}

impl Interface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interface::Palette => "palette",
            Interface::Mcp => "mcp",
            Interface::Agent => "agent",
            Interface::Cli => "cli",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context provided to command handlers during execution
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    /// Invoking interface; when set, exposure is enforced
    pub interface: Option<Interface>,

    /// Correlation id copied into result metadata
    pub trace_id: Option<String>,

    /// Advisory deadline for the handler
    pub timeout_ms: Option<u64>,

    /// Cancellation signal, honored by streaming execution
    pub signal: Option<AbortSignal>,

    /// Caller-defined fields passed through to handlers
    pub extra: Map<String, Value>,
}

impl CommandContext {
    /// Creates an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the invoking interface
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Sets the trace id
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Attaches a cancellation signal
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Adds a caller-defined field
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Whether the attached signal has fired
    pub fn is_aborted(&self) -> bool {
        self.signal.as_ref().is_some_and(|s| s.is_aborted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::AbortController;
    use serde_json::json;

    #[test]
    fn test_context_builder() {
        let ctx = CommandContext::new()
            .with_interface(Interface::Mcp)
            .with_trace_id("trace-1")
            .with_extra("user", json!("ada"));
        assert_eq!(ctx.interface, Some(Interface::Mcp));
        assert_eq!(ctx.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(ctx.extra["user"], "ada");
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn test_context_sees_abort() {
        let controller = AbortController::new();
        let ctx = CommandContext::new().with_signal(controller.signal());
        controller.abort();
        assert!(ctx.is_aborted());
    }

    #[test]
    fn test_interface_wire_names() {
        assert_eq!(serde_json::to_value(Interface::Palette).unwrap(), "palette");
        assert_eq!(Interface::Cli.to_string(), "cli");
        let parsed: Interface = serde_json::from_value(json!("agent")).unwrap();
        assert_eq!(parsed, Interface::Agent);
    }
}
