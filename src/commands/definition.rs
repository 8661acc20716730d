//! Command definitions, exposure policy and parameter schema

use super::context::Interface;
use super::result::CommandError;
use super::CommandHandler;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// Which interfaces may invoke a command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExposePolicy {
    pub palette: bool,
    pub mcp: bool,
    pub agent: bool,
    pub cli: bool,
}

impl ExposePolicy {
    /// Applied when a definition carries no explicit policy
    pub const DEFAULT: ExposePolicy = ExposePolicy {
        palette: true,
        mcp: false,
        agent: true,
        cli: false,
    };

    /// Exposed everywhere
    pub const ALL: ExposePolicy = ExposePolicy {
        palette: true,
        mcp: true,
        agent: true,
        cli: true,
    };

    pub fn allows(&self, interface: Interface) -> bool {
        match interface {
            Interface::Palette => self.palette,
            Interface::Mcp => self.mcp,
            Interface::Agent => self.agent,
            Interface::Cli => self.cli,
        }
    }
}

impl Default for ExposePolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// JSON type a parameter accepts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
            ParamType::Array => value.is_array(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

/// Declared input parameter of a command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl CommandParameter {
    /// Adds a required parameter
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    /// Adds an optional parameter
    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// JSON Schema fragment for this parameter
    pub fn json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::from(self.param_type.as_str()));
        schema.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        if let Some(default) = &self.default {
            schema.insert("default".to_string(), default.clone());
        }
        if let Some(values) = &self.enum_values {
            schema.insert("enum".to_string(), Value::Array(values.clone()));
        }
        Value::Object(schema)
    }
}

/// Name, description and input schema of a command, as tool listings expect
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A registered command
///
/// Definitions are shared as `Arc<CommandDefinition>` once registered and are
/// never mutated afterwards.
#[derive(Clone)]
pub struct CommandDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<CommandParameter>,
    pub handler: Arc<dyn CommandHandler>,
    pub tags: Vec<String>,
    /// Whether the command changes state
    pub mutation: bool,
    pub expose: Option<ExposePolicy>,
    pub version: Option<String>,
    pub category: Option<String>,
    /// Whether the command returns a handoff result
    pub handoff: bool,
}

impl CommandDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self::with_handler(name, description, Arc::new(handler))
    }

    /// Creates a definition around an already shared handler
    pub fn with_handler(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler,
            tags: Vec::new(),
            mutation: false,
            expose: None,
            version: None,
            category: None,
            handoff: false,
        }
    }

    pub fn parameter(mut self, parameter: CommandParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn mutation(mut self, mutation: bool) -> Self {
        self.mutation = mutation;
        self
    }

    pub fn expose(mut self, policy: ExposePolicy) -> Self {
        self.expose = Some(policy);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn handoff(mut self, handoff: bool) -> Self {
        self.handoff = handoff;
        self
    }

    /// Exposure policy in effect, falling back to [`ExposePolicy::DEFAULT`]
    pub fn effective_expose(&self) -> ExposePolicy {
        self.expose.unwrap_or(ExposePolicy::DEFAULT)
    }

    pub fn is_exposed_to(&self, interface: Interface) -> bool {
        self.effective_expose().allows(interface)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// JSON Schema of the input object built from the declared parameters
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn tool_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    /// Validates input against the declared parameters
    ///
    /// Only declared parameters are checked; unknown keys pass through. A
    /// non-object input is accepted when no parameter is required.
    pub fn validate_input(&self, input: &Value) -> Result<(), CommandError> {
        let fields = input.as_object();

        for param in &self.parameters {
            let value = fields.and_then(|f| f.get(&param.name));

            let value = match value {
                Some(v) if !v.is_null() => v,
                _ if param.required => {
                    return Err(CommandError::validation(
                        format!("Missing required parameter: {}", param.name),
                        Some(&format!(
                            "Provide '{}' ({})",
                            param.name,
                            param.param_type.as_str()
                        )),
                    )
                    .with_detail("parameter", Value::String(param.name.clone())));
                }
                _ => continue,
            };

            if !param.param_type.accepts(value) {
                return Err(CommandError::validation(
                    format!(
                        "Parameter '{}' must be of type {}",
                        param.name,
                        param.param_type.as_str()
                    ),
                    None,
                )
                .with_detail("parameter", Value::String(param.name.clone())));
            }

            if let Some(allowed) = &param.enum_values {
                if !allowed.contains(value) {
                    return Err(CommandError::validation(
                        format!("Parameter '{}' has an unsupported value", param.name),
                        Some(&format!(
                            "Use one of: {}",
                            allowed
                                .iter()
                                .map(|v| v.to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        )),
                    )
                    .with_detail("parameter", Value::String(param.name.clone())));
                }
            }
        }

        Ok(())
    }

    /// Fills declared defaults for absent keys of an object input
    pub fn apply_defaults(&self, input: &mut Value) {
        let Some(fields) = input.as_object_mut() else {
            return;
        };
        for param in &self.parameters {
            if let Some(default) = &param.default {
                fields
                    .entry(param.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }
    }
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("tags", &self.tags)
            .field("mutation", &self.mutation)
            .field("expose", &self.expose)
            .field("version", &self.version)
            .field("category", &self.category)
            .field("handoff", &self.handoff)
            .finish_non_exhaustive()
    }
}
