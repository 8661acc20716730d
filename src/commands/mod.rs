//! Command handler architecture
//!
//! Every action is a named command with JSON input and a [`CommandResult`]
//! output. Handlers implement [`CommandHandler`] and are registered in a
//! [`CommandRegistry`] through a [`CommandDefinition`], which also carries the
//! command's parameters, tags and exposure policy.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;

pub mod bootstrap;
pub mod context;
pub mod definition;
pub mod metadata;
pub mod registry;
pub mod result;

pub use context::{CommandContext, Interface};
pub use definition::{CommandDefinition, CommandParameter, ExposePolicy, ParamType, ToolSchema};
pub use metadata::{
    Alternative, PlanStep, PlanStepStatus, Source, SourceType, Warning, WarningSeverity,
};
pub use registry::{CommandRegistry, CommandRegistryBuilder, TagMatch};
pub use result::{failure, success, CommandError, CommandResult, ResultMetadata};

/// Core trait that all command handlers must implement
///
/// Business failures are returned as a failed [`CommandResult`]. An `Err`
/// signals an unexpected fault; the registry converts it into a
/// `COMMAND_EXECUTION_ERROR` result.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, input: Value, ctx: &CommandContext) -> anyhow::Result<CommandResult>;
}

/// Handler backed by an async closure, see [`handler_fn`]
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Value, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<CommandResult>> + Send + 'static,
{
    async fn handle(&self, input: Value, ctx: &CommandContext) -> anyhow::Result<CommandResult> {
        (self.f)(input, ctx.clone()).await
    }
}

/// Adapts an async closure into a [`CommandHandler`]
///
/// ```
/// use switchyard::commands::{handler_fn, CommandResult};
/// use serde_json::json;
///
/// let handler = handler_fn(|input, _ctx| async move {
///     Ok(CommandResult::success(json!({ "echo": input })))
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Value, CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<CommandResult>> + Send + 'static,
{
    FnHandler { f }
}
