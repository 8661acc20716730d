//! Prebuilt registries and requests for tests and benchmarks

use super::mocks::{EchoHandler, FailingHandler, StaticHandler};
use crate::app::AppConfig;
use crate::batch::{BatchCommand, BatchRequest};
use crate::commands::{
    CommandDefinition, CommandParameter, CommandRegistry, CommandRegistryBuilder, ExposePolicy,
    ParamType,
};
use crate::pipeline::{PipelineCondition, PipelineRequest, PipelineStep};
use serde_json::json;

/// A small todo-style registry:
///
/// - `users.get` returns a fixed user with confidence 0.95
/// - `orders.list` returns two orders with confidence 0.8
/// - `orders.fail` always fails with `ORDER_MISSING`
/// - `echo` returns its input and is exposed everywhere
/// - `todo.create` is a mutation with a required `title`
pub fn sample_registry() -> CommandRegistry {
    sample_registry_with_config(AppConfig::default())
}

pub fn sample_registry_with_config(config: AppConfig) -> CommandRegistry {
    let builder = CommandRegistryBuilder::new()
        .with_config(config)
        .register(
            CommandDefinition::new(
                "users.get",
                "Look up a user",
                StaticHandler::new(json!({"id": 42, "name": "Ada", "active": true}))
                    .with_confidence(0.95)
                    .with_reasoning("Found user by id"),
            )
            .category("users")
            .tags(["users", "read"]),
        )
        .register(
            CommandDefinition::new(
                "orders.list",
                "List orders for a user",
                StaticHandler::new(json!([{"id": 1, "total": 20}, {"id": 2, "total": 5}]))
                    .with_confidence(0.8)
                    .with_reasoning("Listed recent orders"),
            )
            .category("orders")
            .tags(["orders", "read"]),
        )
        .register(
            CommandDefinition::new(
                "orders.fail",
                "Always fails",
                FailingHandler::new("ORDER_MISSING", "no orders found"),
            )
            .category("orders"),
        )
        .register(
            CommandDefinition::new("echo", "Echo the input", EchoHandler).expose(ExposePolicy::ALL),
        )
        .register(
            CommandDefinition::new("todo.create", "Create a todo", EchoHandler)
                .parameter(CommandParameter::required(
                    "title",
                    ParamType::String,
                    "Todo title",
                ))
                .parameter(
                    CommandParameter::optional("priority", ParamType::String, "Priority")
                        .with_enum(vec![json!("low"), json!("high")])
                        .with_default(json!("low")),
                )
                .mutation(true)
                .tags(["todo", "write"]),
        );

    match builder.build() {
        Ok(registry) => registry,
        Err(e) => panic!("sample registry has duplicate commands: {e}"),
    }
}

/// A batch of `size` echo commands with ids `cmd-{n}`
pub fn echo_batch(size: usize) -> BatchRequest {
    BatchRequest::new(
        (0..size)
            .map(|n| BatchCommand::new("echo", json!({"n": n})))
            .collect(),
    )
}

/// users.get, then orders.list keyed on the user, then a conditional echo
pub fn user_orders_pipeline() -> PipelineRequest {
    PipelineRequest::new(vec![
        PipelineStep::new("users.get").alias("user"),
        PipelineStep::new("orders.list")
            .input(json!({"userId": "$prev.id"}))
            .alias("orders"),
        PipelineStep::new("echo")
            .input(json!({"name": "$steps.user.name", "count": "$prev.length"}))
            .when(PipelineCondition::gt("$prev.length", 0.0)),
    ])
}
