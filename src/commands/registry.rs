//! Command registry for managing, discovering and executing commands

use super::{
    CommandContext, CommandDefinition, CommandError, CommandResult, Interface, ResultMetadata,
};
use crate::app::config::AppConfig;
use crate::error::{ErrorCode, SwitchyardError};
use crate::handoff::is_handoff_command;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Similarity threshold for "did you mean" suggestions
const SIMILARITY_THRESHOLD: f64 = 0.4;
const MAX_SUGGESTIONS: usize = 3;

/// How [`CommandRegistry::list_by_tags`] combines the requested tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatch {
    /// Every requested tag must be present
    #[default]
    All,
    /// At least one requested tag must be present
    Any,
}

/// Registry that owns every command definition
///
/// Populated once at startup through `&mut self` registration and read-only
/// afterwards; share it behind an `Arc` for concurrent execution.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<CommandDefinition>>,
    config: AppConfig,
}

impl CommandRegistry {
    /// Creates a new empty registry with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry using the given configuration
    pub fn with_config(config: AppConfig) -> Self {
        Self {
            commands: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registers a command; a name collision keeps the first definition
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), SwitchyardError> {
        if self.commands.contains_key(&definition.name) {
            return Err(SwitchyardError::DuplicateCommand {
                name: definition.name,
            });
        }
        debug!(command = %definition.name, "Registered command");
        self.commands
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Gets a command by name
    pub fn get(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.commands.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Lists all commands sorted by name
    pub fn list(&self) -> Vec<Arc<CommandDefinition>> {
        self.filtered(|_| true)
    }

    /// Lists registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn list_by_category(&self, category: &str) -> Vec<Arc<CommandDefinition>> {
        self.filtered(|def| def.category.as_deref() == Some(category))
    }

    /// Commands the given interface is allowed to invoke
    pub fn list_for_interface(&self, interface: Interface) -> Vec<Arc<CommandDefinition>> {
        self.filtered(|def| def.is_exposed_to(interface))
    }

    /// Commands flagged or tagged as handoffs
    pub fn list_handoff_commands(&self) -> Vec<Arc<CommandDefinition>> {
        self.filtered(is_handoff_command)
    }

    /// Lists commands by tag
    ///
    /// An empty query matches nothing, and neither does a command without tags.
    pub fn list_by_tags(&self, tags: &[&str], mode: TagMatch) -> Vec<Arc<CommandDefinition>> {
        if tags.is_empty() {
            return Vec::new();
        }
        self.filtered(|def| {
            if def.tags.is_empty() {
                return false;
            }
            match mode {
                TagMatch::All => tags.iter().all(|t| def.has_tag(t)),
                TagMatch::Any => tags.iter().any(|t| def.has_tag(t)),
            }
        })
    }

    fn filtered<P>(&self, predicate: P) -> Vec<Arc<CommandDefinition>>
    where
        P: Fn(&CommandDefinition) -> bool,
    {
        let mut defs: Vec<Arc<CommandDefinition>> = self
            .commands
            .values()
            .filter(|def| predicate(def))
            .cloned()
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Executes a command by name
    ///
    /// Never panics and never returns `Err`: lookup misses, exposure denials,
    /// handler errors and handler panics all come back as failed results.
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        ctx: Option<&CommandContext>,
    ) -> CommandResult {
        debug!(command = name, "Executing command");

        let Some(definition) = self.commands.get(name) else {
            warn!(command = name, "Command not found");
            return CommandResult::failure(self.not_found_error(name));
        };

        if let Some(interface) = ctx.and_then(|c| c.interface) {
            if !definition.is_exposed_to(interface) {
                warn!(command = name, %interface, "Command not exposed to interface");
                return CommandResult::failure(not_exposed_error(name, interface));
            }
        }

        let mut input = input;
        if self.config.registry.validate_input {
            definition.apply_defaults(&mut input);
            if let Err(error) = definition.validate_input(&input) {
                debug!(command = name, error = %error, "Input validation failed");
                return CommandResult::failure(error);
            }
        }

        let default_ctx;
        let ctx = match ctx {
            Some(ctx) => ctx,
            None => {
                default_ctx = CommandContext::default();
                &default_ctx
            }
        };

        let start = Instant::now();
        let outcome = AssertUnwindSafe(definition.handler.handle(input, ctx))
            .catch_unwind()
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(command = name, error = %err, "Command handler returned an error");
                CommandResult::failure(execution_error(name, &err.to_string(), Some(&err)))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(command = name, panic = %message, "Command handler panicked");
                CommandResult::failure(execution_error(name, &message, None))
            }
        };

        fill_metadata(result, elapsed_ms, ctx, definition)
    }

    fn not_found_error(&self, name: &str) -> CommandError {
        let similar = find_similar_names(name, self.commands.keys().map(String::as_str));
        let error = CommandError::new(
            ErrorCode::COMMAND_NOT_FOUND,
            format!("Command '{name}' not found"),
        )
        .with_retryable(false);

        if similar.is_empty() {
            return error.with_suggestion("List the registered commands to see what is available");
        }

        let quoted: Vec<String> = similar.iter().map(|s| format!("'{s}'")).collect();
        error
            .with_suggestion(format!(
                "Did you mean {}? List the registered commands to see what is available",
                quoted.join(" or ")
            ))
            .with_detail(
                "similar",
                Value::Array(similar.into_iter().map(Value::String).collect()),
            )
    }
}

fn not_exposed_error(name: &str, interface: Interface) -> CommandError {
    CommandError::new(
        ErrorCode::COMMAND_NOT_EXPOSED,
        format!("Command '{name}' is not exposed to the '{interface}' interface"),
    )
    .with_suggestion(format!(
        "Invoke '{name}' from an interface it is exposed to, or add '{interface}' to its expose policy"
    ))
    .with_retryable(false)
    .with_detail("command", Value::String(name.to_string()))
    .with_detail("interface", Value::String(interface.to_string()))
}

fn execution_error(name: &str, message: &str, err: Option<&anyhow::Error>) -> CommandError {
    let error = CommandError::new(ErrorCode::COMMAND_EXECUTION_ERROR, message)
        .with_suggestion("Check the command input and try again")
        .with_detail("command", Value::String(name.to_string()));
    match err {
        Some(err) => error.with_detail("stack", Value::String(format!("{err:?}"))),
        None => error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Command handler panicked".to_string()
    }
}

fn fill_metadata(
    mut result: CommandResult,
    elapsed_ms: u64,
    ctx: &CommandContext,
    definition: &CommandDefinition,
) -> CommandResult {
    let metadata = result.metadata.get_or_insert_with(ResultMetadata::default);
    metadata.execution_time_ms.get_or_insert(elapsed_ms);
    if metadata.trace_id.is_none() {
        metadata.trace_id = ctx.trace_id.clone();
    }
    if metadata.command_version.is_none() {
        metadata.command_version = definition.version.clone();
    }
    result
}

/// Normalized edit-distance similarity in 0..=1, case-insensitive
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a == b {
        return 1.0;
    }
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    1.0 - prev[b.len()] as f64 / max_len as f64
}

fn find_similar_names<'a>(requested: &str, available: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(&str, f64)> = available
        .map(|name| (name, similarity(requested, name)))
        .filter(|(_, score)| *score >= SIMILARITY_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Builder for assembling a registry at startup
#[derive(Default)]
pub struct CommandRegistryBuilder {
    config: AppConfig,
    definitions: Vec<CommandDefinition>,
}

impl CommandRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Queues a command for registration
    pub fn register(mut self, definition: CommandDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Builds the registry, failing on the first duplicate name
    pub fn build(self) -> Result<CommandRegistry, SwitchyardError> {
        let mut registry = CommandRegistry::with_config(self.config);
        for definition in self.definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{handler_fn, CommandParameter, ExposePolicy, ParamType};
    use crate::testing::{ErroringHandler, PanickingHandler, StaticHandler};
    use serde_json::json;

    fn def(name: &str) -> CommandDefinition {
        CommandDefinition::new(name, "test command", StaticHandler::new(json!({"ok": true})))
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = CommandRegistry::new();
        registry.register(def("todo-create").version("1")).unwrap();

        let err = registry
            .register(def("todo-create").version("2"))
            .unwrap_err();
        assert!(matches!(err, SwitchyardError::DuplicateCommand { ref name } if name == "todo-create"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("todo-create").unwrap().version.as_deref(),
            Some("1")
        );
    }

    #[test]
    fn test_builder_reports_duplicates() {
        let result = CommandRegistryBuilder::new()
            .register(def("a"))
            .register(def("a"))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let registry = CommandRegistry::new();
        let result = registry.execute("missing", json!({}), None).await;
        assert!(result.is_failure());
        let error = result.error.unwrap();
        assert_eq!(error.code, "COMMAND_NOT_FOUND");
        assert_eq!(error.retryable, Some(false));
        assert!(error.suggestion.is_some());
    }

    #[tokio::test]
    async fn test_unknown_command_suggests_similar_names() {
        let mut registry = CommandRegistry::new();
        registry.register(def("todo-create")).unwrap();
        registry.register(def("todo-delete")).unwrap();
        registry.register(def("weather")).unwrap();

        let result = registry.execute("todo-craete", json!({}), None).await;
        let error = result.error.unwrap();
        let suggestion = error.suggestion.unwrap();
        assert!(suggestion.contains("'todo-create'"));
        assert!(!suggestion.contains("weather"));
        assert_eq!(error.details.unwrap()["similar"][0], "todo-create");
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abc", "ABC"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert!((similarity("kitten", "sitting") - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_not_exposed_to_mcp() {
        let mut registry = CommandRegistry::new();
        registry.register(def("todo-create")).unwrap();

        let ctx = CommandContext::new().with_interface(Interface::Mcp);
        let result = registry.execute("todo-create", json!({}), Some(&ctx)).await;
        let error = result.error.unwrap();
        assert_eq!(error.code, "COMMAND_NOT_EXPOSED");
        assert_eq!(error.retryable, Some(false));
        assert!(error.message.contains("todo-create"));
        assert!(error.message.contains("'mcp'"));

        let ctx = CommandContext::new().with_interface(Interface::Palette);
        let result = registry.execute("todo-create", json!({}), Some(&ctx)).await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_explicit_expose_policy() {
        let mut registry = CommandRegistry::new();
        registry
            .register(def("cli-only").expose(ExposePolicy {
                palette: false,
                mcp: false,
                agent: false,
                cli: true,
            }))
            .unwrap();

        let cli = CommandContext::new().with_interface(Interface::Cli);
        assert!(registry.execute("cli-only", json!({}), Some(&cli)).await.is_success());
        let agent = CommandContext::new().with_interface(Interface::Agent);
        assert!(registry.execute("cli-only", json!({}), Some(&agent)).await.is_failure());
    }

    #[tokio::test]
    async fn test_handler_error_becomes_execution_error() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDefinition::new(
                "explode",
                "always errors",
                ErroringHandler::new("database unavailable"),
            ))
            .unwrap();

        let result = registry.execute("explode", json!({}), None).await;
        let error = result.error.unwrap();
        assert_eq!(error.code, "COMMAND_EXECUTION_ERROR");
        assert_eq!(error.message, "database unavailable");
        let details = error.details.unwrap();
        assert_eq!(details["command"], "explode");
        assert!(details["stack"].as_str().unwrap().contains("database unavailable"));
    }

    #[tokio::test]
    async fn test_handler_panic_is_contained() {
        let mut registry = CommandRegistry::new();
        registry
            .register(CommandDefinition::new("panic", "panics", PanickingHandler::new("boom")))
            .unwrap();

        let result = registry.execute("panic", json!({}), None).await;
        let error = result.error.unwrap();
        assert_eq!(error.code, "COMMAND_EXECUTION_ERROR");
        assert_eq!(error.message, "boom");
        assert!(error.details.unwrap().get("stack").is_none());
    }

    #[tokio::test]
    async fn test_metadata_filled_when_missing() {
        let mut registry = CommandRegistry::new();
        registry.register(def("plain").version("2.1.0")).unwrap();
        registry
            .register(CommandDefinition::new(
                "traced",
                "sets its own trace id",
                handler_fn(|_, _| async {
                    Ok(CommandResult::success(json!(1)).with_metadata(ResultMetadata {
                        trace_id: Some("handler-trace".to_string()),
                        ..Default::default()
                    }))
                }),
            ))
            .unwrap();

        let ctx = CommandContext::new().with_trace_id("ctx-trace");
        let result = registry.execute("plain", json!({}), Some(&ctx)).await;
        let metadata = result.metadata.unwrap();
        assert!(metadata.execution_time_ms.is_some());
        assert_eq!(metadata.trace_id.as_deref(), Some("ctx-trace"));
        assert_eq!(metadata.command_version.as_deref(), Some("2.1.0"));

        let result = registry.execute("traced", json!({}), Some(&ctx)).await;
        assert_eq!(
            result.metadata.unwrap().trace_id.as_deref(),
            Some("handler-trace")
        );
    }

    #[tokio::test]
    async fn test_input_validation_is_opt_in() {
        let title = CommandParameter::required("title", ParamType::String, "Title");

        let mut lenient = CommandRegistry::new();
        lenient.register(def("create").parameter(title.clone())).unwrap();
        assert!(lenient.execute("create", json!({}), None).await.is_success());

        let mut config = AppConfig::default();
        config.registry.validate_input = true;
        let mut strict = CommandRegistry::with_config(config);
        strict.register(def("create").parameter(title)).unwrap();
        let result = strict.execute("create", json!({}), None).await;
        assert_eq!(result.error_code(), Some("VALIDATION_ERROR"));
    }

    #[test]
    fn test_list_by_tags() {
        let mut registry = CommandRegistry::new();
        registry.register(def("a").tags(["todo", "write"])).unwrap();
        registry.register(def("b").tags(["todo"])).unwrap();
        registry.register(def("c")).unwrap();

        let names = |defs: Vec<Arc<CommandDefinition>>| {
            defs.iter().map(|d| d.name.clone()).collect::<Vec<_>>()
        };

        assert_eq!(names(registry.list_by_tags(&["todo", "write"], TagMatch::All)), ["a"]);
        assert_eq!(names(registry.list_by_tags(&["write", "todo"], TagMatch::Any)), ["a", "b"]);
        assert!(registry.list_by_tags(&[], TagMatch::Any).is_empty());
        assert!(registry.list_by_tags(&["missing"], TagMatch::Any).is_empty());
    }

    #[test]
    fn test_listing_helpers() {
        let mut registry = CommandRegistry::new();
        registry.register(def("zeta").category("todo")).unwrap();
        registry.register(def("alpha").handoff(true).expose(ExposePolicy::ALL)).unwrap();

        assert_eq!(registry.names(), ["alpha", "zeta"]);
        assert_eq!(registry.list()[0].name, "alpha");
        assert_eq!(registry.list_by_category("todo").len(), 1);
        assert_eq!(registry.list_handoff_commands()[0].name, "alpha");
        assert_eq!(registry.list_for_interface(Interface::Mcp).len(), 1);
        assert_eq!(registry.list_for_interface(Interface::Palette).len(), 2);
        assert!(registry.has("zeta"));
        assert!(!registry.is_empty());
    }
}
