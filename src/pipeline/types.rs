//! Pipeline request, step and result types

use super::condition::PipelineCondition;
use crate::commands::{Alternative, CommandError, Source, Warning};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One command invocation inside a pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStep {
    pub command: String,

    /// Input template; strings starting with `$` are variable references
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    /// Name later steps use in `$steps.<alias>`
    #[serde(default, rename = "as", skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Step runs only when this holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<PipelineCondition>,

    /// Forward the step's chunks to the pipeline observer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl PipelineStep {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            input: None,
            alias: None,
            when: None,
            stream: None,
        }
    }

    pub fn input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn when(mut self, condition: PipelineCondition) -> Self {
        self.when = Some(condition);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    /// Keep going after a failed step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_on_failure: Option<bool>,

    /// Wall-clock budget, checked between steps
    #[serde(default, rename = "timeout", skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    /// Generated (uuid v4) when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Available to steps as `$input`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,

    pub steps: Vec<PipelineStep>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PipelineOptions>,
}

impl PipelineRequest {
    pub fn new(steps: Vec<PipelineStep>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_input(mut self, input: Value) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Builds a pipeline request from steps and options
pub fn create_pipeline(steps: Vec<PipelineStep>, options: Option<PipelineOptions>) -> PipelineRequest {
    PipelineRequest {
        options,
        ..PipelineRequest::new(steps)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failure,
    Skipped,
}

/// Trust metadata copied from a successful step's result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub command: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StepMetadata>,
}

impl StepResult {
    /// A step that did not run
    pub fn skipped(index: usize, step: &PipelineStep) -> Self {
        Self {
            index,
            alias: step.alias.clone(),
            command: step.command.clone(),
            status: StepStatus::Skipped,
            data: None,
            error: None,
            execution_time_ms: 0,
            metadata: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// Confidence this step contributes, 1.0 when unreported
    pub fn confidence(&self) -> f64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.confidence)
            .unwrap_or(1.0)
    }
}

/// Read-only view of the pipeline state a step resolves against
///
/// Rebuilt before every step; `steps` holds every recorded step so far,
/// skipped ones included, so `$steps[n]` lines up with step indices.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineContext<'a> {
    pub pipeline_input: Option<&'a Value>,
    /// Last executed step; skipped steps never replace it
    pub previous_result: Option<&'a StepResult>,
    pub steps: &'a [StepResult],
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        pipeline_input: Option<&'a Value>,
        previous_result: Option<&'a StepResult>,
        steps: &'a [StepResult],
    ) -> Self {
        Self {
            pipeline_input,
            previous_result,
            steps,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepConfidence {
    pub step: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub command: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepReasoning {
    pub step_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_alias: Option<String>,
    pub command: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineWarning {
    #[serde(flatten)]
    pub warning: Warning,
    pub step_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSource {
    #[serde(flatten)]
    pub source: Source,
    pub step_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineAlternative {
    #[serde(flatten)]
    pub alternative: Alternative,
    pub step_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_alias: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineMetadata {
    pub confidence: f64,
    pub confidence_breakdown: Vec<StepConfidence>,
    pub reasoning: Vec<StepReasoning>,
    pub warnings: Vec<PipelineWarning>,
    pub sources: Vec<PipelineSource>,
    pub alternatives: Vec<PipelineAlternative>,
    pub execution_time_ms: u64,
    pub completed_steps: usize,
    pub failed_steps: usize,
    pub skipped_steps: usize,
    pub total_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub id: String,
    /// False only when the pipeline stopped on an error
    pub success: bool,
    /// Data of the last successful step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
    pub metadata: PipelineMetadata,
    pub steps: Vec<StepResult>,
}

impl PipelineResult {
    /// Looks up a recorded step by alias
    pub fn step(&self, alias: &str) -> Option<&StepResult> {
        self.steps
            .iter()
            .find(|s| s.alias.as_deref() == Some(alias))
    }
}
