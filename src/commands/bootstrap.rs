//! Introspection commands
//!
//! Three read-only commands describe the registry they were built from:
//! `switchyard.help` lists commands, `switchyard.docs` renders Markdown
//! documentation and `switchyard.schema` exports input schemas. Each handler
//! holds an `Arc` snapshot of the registry, so commands registered after the
//! snapshot (the introspection commands included) are not described.

use super::{
    CommandContext, CommandDefinition, CommandError, CommandHandler, CommandParameter,
    CommandRegistry, CommandResult, ExposePolicy, ParamType, ToolSchema,
};
use crate::error::SwitchyardError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub const BOOTSTRAP_CATEGORY: &str = "bootstrap";
pub const BOOTSTRAP_TAGS: &[&str] = &["bootstrap", "read", "safe"];

pub const HELP_COMMAND: &str = "switchyard.help";
pub const DOCS_COMMAND: &str = "switchyard.docs";
pub const SCHEMA_COMMAND: &str = "switchyard.schema";

/// Introspection definitions describing `registry`
pub fn bootstrap_commands(registry: &Arc<CommandRegistry>) -> Vec<CommandDefinition> {
    vec![
        help_command(Arc::clone(registry)),
        docs_command(Arc::clone(registry)),
        schema_command(Arc::clone(registry)),
    ]
}

impl CommandRegistry {
    /// Adds the introspection commands, describing the registry as it is now
    pub fn with_bootstrap_commands(mut self) -> Result<Self, SwitchyardError> {
        let snapshot = Arc::new(self.clone());
        for definition in bootstrap_commands(&snapshot) {
            self.register(definition)?;
        }
        Ok(self)
    }
}

fn bootstrap_definition(
    name: &str,
    description: &str,
    handler: impl CommandHandler + 'static,
) -> CommandDefinition {
    CommandDefinition::new(name, description, handler)
        .category(BOOTSTRAP_CATEGORY)
        .tags(BOOTSTRAP_TAGS.iter().copied())
        .expose(ExposePolicy::ALL)
        .version("1.0.0")
}

/// Absent or null input means "all defaults"
fn parse_input<T: DeserializeOwned + Default>(input: Value) -> Result<T, CommandError> {
    if input.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(input).map_err(|e| {
        CommandError::validation(
            format!("Invalid input: {e}"),
            Some("Check the command's parameters with switchyard.schema"),
        )
    })
}

fn matching_commands(
    registry: &CommandRegistry,
    command: Option<&str>,
) -> Vec<Arc<CommandDefinition>> {
    let all = registry.list();
    match command {
        Some(name) => all.into_iter().filter(|c| c.name == name).collect(),
        None => all,
    }
}

// ============================================================================
// Help
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HelpFormat {
    #[default]
    Brief,
    Full,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpInput {
    /// Case-insensitive substring matched against name, category and tags
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub format: HelpFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandSummary {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelpOutput {
    pub commands: Vec<CommandSummary>,
    pub total: usize,
    pub filtered: bool,
    /// Commands without a category are grouped under `uncategorized`
    pub grouped_by_category: BTreeMap<String, Vec<CommandSummary>>,
}

pub struct HelpHandler {
    registry: Arc<CommandRegistry>,
}

impl HelpHandler {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }
}

fn matches_filter(definition: &CommandDefinition, needle: &str) -> bool {
    definition.name.to_lowercase().contains(needle)
        || definition
            .category
            .as_ref()
            .is_some_and(|c| c.to_lowercase().contains(needle))
        || definition
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(needle))
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn handle(&self, input: Value, _ctx: &CommandContext) -> anyhow::Result<CommandResult> {
        let input: HelpInput = match parse_input(input) {
            Ok(input) => input,
            Err(error) => return Ok(CommandResult::failure(error)),
        };

        let needle = input.filter.as_ref().map(|f| f.to_lowercase());
        let full = input.format == HelpFormat::Full;
        let mut commands = Vec::new();
        let mut grouped_by_category: BTreeMap<String, Vec<CommandSummary>> = BTreeMap::new();

        for definition in self.registry.list() {
            if let Some(needle) = &needle {
                if !matches_filter(&definition, needle) {
                    continue;
                }
            }

            let summary = CommandSummary {
                name: definition.name.clone(),
                description: definition.description.clone(),
                category: full.then(|| definition.category.clone()).flatten(),
                tags: full.then(|| definition.tags.clone()),
                mutation: full.then_some(definition.mutation),
            };
            grouped_by_category
                .entry(
                    definition
                        .category
                        .clone()
                        .unwrap_or_else(|| "uncategorized".to_string()),
                )
                .or_default()
                .push(summary.clone());
            commands.push(summary);
        }

        let total = commands.len();
        let reasoning = match &input.filter {
            Some(filter) => format!("Found {total} commands matching \"{filter}\""),
            None => format!("Listing all {total} available commands"),
        };
        debug!(total, filtered = input.filter.is_some(), "Listed commands");

        let output = HelpOutput {
            commands,
            total,
            filtered: input.filter.is_some(),
            grouped_by_category,
        };
        Ok(CommandResult::success(serde_json::to_value(output)?)
            .with_confidence(1.0)
            .with_reasoning(reasoning))
    }
}

pub fn help_command(registry: Arc<CommandRegistry>) -> CommandDefinition {
    bootstrap_definition(
        HELP_COMMAND,
        "List available commands, optionally filtered by name, category or tag",
        HelpHandler::new(registry),
    )
    .parameter(CommandParameter::optional(
        "filter",
        ParamType::String,
        "Substring to match against names, categories and tags",
    ))
    .parameter(
        CommandParameter::optional("format", ParamType::String, "Output detail")
            .with_default(json!("brief"))
            .with_enum(vec![json!("brief"), json!("full")]),
    )
}

// ============================================================================
// Docs
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsInput {
    /// Document only this command
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocsOutput {
    pub markdown: String,
    pub command_count: usize,
}

pub struct DocsHandler {
    registry: Arc<CommandRegistry>,
}

impl DocsHandler {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }
}

fn command_markdown(definition: &CommandDefinition) -> String {
    let mut lines = vec![
        format!("### `{}`", definition.name),
        String::new(),
        definition.description.clone(),
        String::new(),
    ];

    if !definition.tags.is_empty() {
        let tags: Vec<String> = definition.tags.iter().map(|t| format!("`{t}`")).collect();
        lines.push(format!("**Tags:** {}", tags.join(", ")));
        lines.push(String::new());
    }

    let mutation = if definition.mutation {
        "Yes"
    } else {
        "No (read-only)"
    };
    lines.push(format!("**Mutation:** {mutation}"));
    lines.push(String::new());

    if !definition.parameters.is_empty() {
        lines.push("**Parameters:**".to_string());
        lines.push(String::new());
        lines.push("| Name | Type | Required | Description |".to_string());
        lines.push("|------|------|----------|-------------|".to_string());
        for param in &definition.parameters {
            lines.push(format!(
                "| {} | {} | {} | {} |",
                param.name,
                param.param_type.as_str(),
                if param.required { "Yes" } else { "No" },
                param.description
            ));
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// Renders definitions grouped by category, `General` for uncategorized ones
fn render_docs(definitions: &[Arc<CommandDefinition>]) -> String {
    let mut by_category: BTreeMap<&str, Vec<&CommandDefinition>> = BTreeMap::new();
    for definition in definitions {
        by_category
            .entry(definition.category.as_deref().unwrap_or("General"))
            .or_default()
            .push(definition.as_ref());
    }

    let mut lines = vec!["# Command Documentation".to_string(), String::new()];
    for (category, mut definitions) in by_category {
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        lines.push(format!("## {category}"));
        lines.push(String::new());
        lines.extend(definitions.into_iter().map(command_markdown));
    }
    lines.join("\n")
}

#[async_trait]
impl CommandHandler for DocsHandler {
    async fn handle(&self, input: Value, _ctx: &CommandContext) -> anyhow::Result<CommandResult> {
        let input: DocsInput = match parse_input(input) {
            Ok(input) => input,
            Err(error) => return Ok(CommandResult::failure(error)),
        };

        let definitions = matching_commands(&self.registry, input.command.as_deref());
        let (markdown, reasoning) = match &input.command {
            Some(name) if definitions.is_empty() => {
                (String::new(), format!("Command \"{name}\" not found"))
            }
            Some(name) => (
                render_docs(&definitions),
                format!("Generated documentation for \"{name}\""),
            ),
            None => (
                render_docs(&definitions),
                format!("Generated documentation for {} commands", definitions.len()),
            ),
        };

        let output = DocsOutput {
            markdown,
            command_count: definitions.len(),
        };
        Ok(CommandResult::success(serde_json::to_value(output)?)
            .with_confidence(1.0)
            .with_reasoning(reasoning))
    }
}

pub fn docs_command(registry: Arc<CommandRegistry>) -> CommandDefinition {
    bootstrap_definition(
        DOCS_COMMAND,
        "Render Markdown documentation for commands",
        DocsHandler::new(registry),
    )
    .parameter(CommandParameter::optional(
        "command",
        ParamType::String,
        "Command to document, or omit for all",
    ))
}

// ============================================================================
// Schema
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchemaFormat {
    #[default]
    Json,
    Typescript,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInput {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub format: SchemaFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEntry {
    pub name: String,
    pub description: String,
    /// Present for the `json` format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolSchema>,
    /// Present for the `typescript` format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typescript: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOutput {
    pub schemas: Vec<SchemaEntry>,
    pub total: usize,
    pub format: SchemaFormat,
}

pub struct SchemaHandler {
    registry: Arc<CommandRegistry>,
}

impl SchemaHandler {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }
}

fn pascal_case(name: &str) -> String {
    name.split(['-', '_', '.'])
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

fn typescript_interface(definition: &CommandDefinition) -> String {
    let mut lines = vec![
        format!("// {}", definition.description),
        format!("interface {}Input {{", pascal_case(&definition.name)),
    ];
    for param in &definition.parameters {
        let ts_type = match param.param_type {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "unknown[]",
            ParamType::Object => "Record<string, unknown>",
        };
        let optional = if param.required { "" } else { "?" };
        lines.push(format!("  {}{optional}: {ts_type};", param.name));
    }
    lines.push("}".to_string());
    lines.join("\n")
}

#[async_trait]
impl CommandHandler for SchemaHandler {
    async fn handle(&self, input: Value, _ctx: &CommandContext) -> anyhow::Result<CommandResult> {
        let input: SchemaInput = match parse_input(input) {
            Ok(input) => input,
            Err(error) => return Ok(CommandResult::failure(error)),
        };

        let schemas: Vec<SchemaEntry> =
            matching_commands(&self.registry, input.command.as_deref())
                .iter()
                .map(|definition| {
                    let (tool, typescript) = match input.format {
                        SchemaFormat::Json => (Some(definition.tool_schema()), None),
                        SchemaFormat::Typescript => (None, Some(typescript_interface(definition))),
                    };
                    SchemaEntry {
                        name: definition.name.clone(),
                        description: definition.description.clone(),
                        tool,
                        typescript,
                    }
                })
                .collect();

        let total = schemas.len();
        let reasoning = match &input.command {
            Some(name) if total == 0 => format!("Command \"{name}\" not found"),
            Some(name) => format!("Exported schema for \"{name}\""),
            None => format!("Exported {total} command schemas"),
        };

        let output = SchemaOutput {
            schemas,
            total,
            format: input.format,
        };
        Ok(CommandResult::success(serde_json::to_value(output)?)
            .with_confidence(1.0)
            .with_reasoning(reasoning))
    }
}

pub fn schema_command(registry: Arc<CommandRegistry>) -> CommandDefinition {
    bootstrap_definition(
        SCHEMA_COMMAND,
        "Export command input schemas as JSON Schema or TypeScript",
        SchemaHandler::new(registry),
    )
    .parameter(CommandParameter::optional(
        "command",
        ParamType::String,
        "Command to export, or omit for all",
    ))
    .parameter(
        CommandParameter::optional("format", ParamType::String, "Schema format")
            .with_default(json!("json"))
            .with_enum(vec![json!("json"), json!("typescript")]),
    )
}
