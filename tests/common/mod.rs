//! Common test utilities and helpers

#![allow(dead_code)]

use serde_json::Value;
use std::sync::Once;
use switchyard::app::AppConfig;
use switchyard::commands::{
    CommandContext, CommandDefinition, CommandHandler, CommandRegistry, Interface,
};

static LOGGING: Once = Once::new();

/// Installs a quiet subscriber once per test binary
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("warn")
            .with_test_writer()
            .try_init();
    });
}

/// Builder for registries assembled inline in a test
pub struct RegistryBuilder {
    config: AppConfig,
    definitions: Vec<CommandDefinition>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            definitions: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a command with a generated description
    pub fn command(mut self, name: &str, handler: impl CommandHandler + 'static) -> Self {
        self.definitions.push(CommandDefinition::new(
            name,
            format!("{name} test command"),
            handler,
        ));
        self
    }

    pub fn definition(mut self, definition: CommandDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn build(self) -> CommandRegistry {
        init_test_logging();
        let mut registry = CommandRegistry::with_config(self.config);
        for definition in self.definitions {
            registry
                .register(definition)
                .expect("test commands must have unique names");
        }
        registry
    }
}

pub fn ctx_for(interface: Interface) -> CommandContext {
    CommandContext::new()
        .with_interface(interface)
        .with_trace_id(format!("test-{}", interface))
}

/// The `data` of a successful value, panicking with the error otherwise
pub fn expect_data(result: &switchyard::CommandResult) -> &Value {
    match (&result.data, &result.error) {
        (Some(data), None) if result.success => data,
        _ => panic!("expected success, got {:?}", result.error),
    }
}
