//! # Switchyard
//!
//! Command-execution core for agent-first applications. Every action is a
//! named command taking JSON input and returning a [`CommandResult`] that
//! carries trust metadata (confidence, reasoning, sources, warnings) next to
//! its data.
//!
//! ## Usage
//!
//! ```no_run
//! use serde_json::json;
//! use switchyard::commands::{handler_fn, CommandDefinition, CommandRegistry, CommandResult};
//!
//! # async fn run() -> switchyard::error::Result<()> {
//! let mut registry = CommandRegistry::new();
//! registry.register(CommandDefinition::new(
//!     "greet",
//!     "Say hello",
//!     handler_fn(|input, _ctx| async move {
//!         let name = input["name"].as_str().unwrap_or("world").to_string();
//!         Ok(CommandResult::success(json!({ "greeting": format!("hello {name}") })))
//!     }),
//! ))?;
//!
//! let result = registry.execute("greet", json!({"name": "Ada"}), None).await;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - `commands` - Result model, command definitions, the registry and its
//!   introspection commands (help, docs, schema)
//! - `batch` - Fan-out execution with partial success
//! - `pipeline` - Sequential chaining with variables and conditional steps
//! - `streaming` - Chunked delivery with cooperative cancellation
//! - `handoff` - Connection details for commands that move to another channel
//! - `app` - Configuration loading and logging setup
//! - `error` - Crate errors and the standard error codes
//! - `testing` - Mock handlers and fixtures for tests and benchmarks
pub mod app;
pub mod batch;
pub mod commands;
pub mod error;
pub mod handoff;
pub mod pipeline;
pub mod streaming;

pub mod testing;

pub use app::{init_logging, AppConfig};
pub use batch::{BatchCommand, BatchOptions, BatchRequest, BatchResult};
pub use commands::{
    failure, handler_fn, success, CommandContext, CommandDefinition, CommandError,
    CommandHandler, CommandRegistry, CommandResult, Interface,
};
pub use error::{ErrorCode, SwitchyardError};
pub use handoff::{is_handoff, HandoffProtocol, HandoffResult};
pub use pipeline::{create_pipeline, PipelineCondition, PipelineRequest, PipelineResult, PipelineStep};
pub use streaming::{AbortController, AbortSignal, StreamChunk};
