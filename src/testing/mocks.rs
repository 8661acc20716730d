//! Mock command handlers

use crate::commands::{
    CommandContext, CommandError, CommandHandler, CommandResult, Interface, Warning,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns the same successful payload on every call
#[derive(Debug, Clone)]
pub struct StaticHandler {
    data: Value,
    confidence: Option<f64>,
    reasoning: Option<String>,
    warnings: Vec<Warning>,
}

impl StaticHandler {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            confidence: None,
            reasoning: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warnings.push(warning);
        self
    }
}

#[async_trait]
impl CommandHandler for StaticHandler {
    async fn handle(&self, _input: Value, _ctx: &CommandContext) -> Result<CommandResult> {
        let mut result = CommandResult::success(self.data.clone());
        if let Some(confidence) = self.confidence {
            result = result.with_confidence(confidence);
        }
        if let Some(reasoning) = &self.reasoning {
            result = result.with_reasoning(reasoning.clone());
        }
        if !self.warnings.is_empty() {
            result = result.with_warnings(self.warnings.clone());
        }
        Ok(result)
    }
}

/// Returns its input as the payload
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn handle(&self, input: Value, _ctx: &CommandContext) -> Result<CommandResult> {
        Ok(CommandResult::success(input))
    }
}

/// Returns a failed result with a fixed error code
#[derive(Debug, Clone)]
pub struct FailingHandler {
    code: String,
    message: String,
    retryable: bool,
}

impl FailingHandler {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

#[async_trait]
impl CommandHandler for FailingHandler {
    async fn handle(&self, _input: Value, _ctx: &CommandContext) -> Result<CommandResult> {
        let error = CommandError::new(self.code.clone(), self.message.clone())
            .with_retryable(self.retryable);
        Ok(CommandResult::failure(error))
    }
}

/// Returns `Err` instead of a result
#[derive(Debug, Clone)]
pub struct ErroringHandler {
    message: String,
}

impl ErroringHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl CommandHandler for ErroringHandler {
    async fn handle(&self, _input: Value, _ctx: &CommandContext) -> Result<CommandResult> {
        Err(anyhow!("{}", self.message))
    }
}

#[derive(Debug, Clone)]
pub struct PanickingHandler {
    message: String,
}

impl PanickingHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl CommandHandler for PanickingHandler {
    async fn handle(&self, _input: Value, _ctx: &CommandContext) -> Result<CommandResult> {
        panic!("{}", self.message);
    }
}

/// Sleeps before succeeding
#[derive(Debug, Clone)]
pub struct DelayedHandler {
    delay: Duration,
    data: Value,
}

impl DelayedHandler {
    pub fn new(delay: Duration, data: Value) -> Self {
        Self { delay, data }
    }
}

#[async_trait]
impl CommandHandler for DelayedHandler {
    async fn handle(&self, _input: Value, _ctx: &CommandContext) -> Result<CommandResult> {
        tokio::time::sleep(self.delay).await;
        Ok(CommandResult::success(self.data.clone()))
    }
}

/// A single observed invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub input: Value,
    pub trace_id: Option<String>,
    pub interface: Option<Interface>,
}

/// Echoes its input and records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl CommandHandler for RecordingHandler {
    async fn handle(&self, input: Value, ctx: &CommandContext) -> Result<CommandResult> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                input: input.clone(),
                trace_id: ctx.trace_id.clone(),
                interface: ctx.interface,
            });
        Ok(CommandResult::success(input))
    }
}
