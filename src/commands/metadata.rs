//! Trust metadata carried by command results
//!
//! Sources, plan steps, alternatives and warnings let a result explain where
//! it came from and how far it should be trusted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where a piece of information came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub name: String,

    #[serde(rename = "type")]
    pub source_type: SourceType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed_at: Option<String>,

    /// Relevance score, clamped to 0..=1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    File,
    Database,
    Api,
    Knowledge,
    User,
    Other,
}

impl Source {
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            url: None,
            accessed_at: None,
            relevance: None,
            snippet: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_accessed_at(mut self, timestamp: impl Into<String>) -> Self {
        self.accessed_at = Some(timestamp.into());
        self
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = Some(relevance.clamp(0.0, 1.0));
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

/// One step of a multi-step plan a command reports back
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub step: u32,
    pub description: String,
    #[serde(default)]
    pub status: PlanStepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlanStep {
    pub fn new(step: u32, description: impl Into<String>) -> Self {
        Self {
            step,
            description: description.into(),
            status: PlanStepStatus::Pending,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_status(mut self, status: PlanStepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Record an error; the step becomes `Failed`
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.status = PlanStepStatus::Failed;
        self
    }
}

/// A result the command considered but did not choose
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alternative<T = Value> {
    pub data: T,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl<T> Alternative<T> {
    pub fn new(data: T, reason: impl Into<String>) -> Self {
        Self {
            data,
            reason: reason.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Info,
    Low,
    Medium,
    High,
}

/// Non-fatal issue attached to a result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<WarningSeverity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl Warning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: None,
            context: None,
        }
    }

    pub fn with_severity(mut self, severity: WarningSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_relevance_is_clamped() {
        let source = Source::new("docs", SourceType::Url)
            .with_url("https://example.com")
            .with_relevance(1.7);
        assert_eq!(source.relevance, Some(1.0));
        assert_eq!(source.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_plan_step_error_marks_failed() {
        let step = PlanStep::new(2, "write file")
            .with_status(PlanStepStatus::Running)
            .with_error("disk full");
        assert_eq!(step.status, PlanStepStatus::Failed);
        assert_eq!(step.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_warning_serialization() {
        let warning = Warning::new("STALE", "cache older than 1h")
            .with_severity(WarningSeverity::Low)
            .with_context("ageSeconds", json!(4000));
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["code"], "STALE");
        assert_eq!(value["severity"], "low");
        assert_eq!(value["context"]["ageSeconds"], 4000);
    }

    #[test]
    fn test_alternative_confidence_clamped() {
        let alt = Alternative::new(json!({"id": 2}), "lower score").with_confidence(-0.3);
        assert_eq!(alt.confidence, Some(0.0));
    }
}
