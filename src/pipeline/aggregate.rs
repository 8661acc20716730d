//! Pipeline metadata aggregation
//!
//! Pipelines keep per-step provenance: reasoning, warnings, sources and
//! alternatives are concatenated and attributed to their step rather than
//! summarized. Confidence follows the weakest successful step.

use super::types::{
    PipelineAlternative, PipelineMetadata, PipelineSource, PipelineWarning, StepConfidence,
    StepReasoning, StepResult, StepStatus,
};

/// Minimum confidence over successful steps; 0 when none succeeded
pub fn aggregate_pipeline_confidence(steps: &[StepResult]) -> f64 {
    steps
        .iter()
        .filter(|s| s.is_success())
        .map(StepResult::confidence)
        .reduce(f64::min)
        .unwrap_or(0.0)
}

pub fn aggregate_pipeline_reasoning(steps: &[StepResult]) -> Vec<StepReasoning> {
    steps
        .iter()
        .filter(|s| s.is_success())
        .filter_map(|s| {
            let reasoning = s.metadata.as_ref()?.reasoning.as_ref()?;
            Some(StepReasoning {
                step_index: s.index,
                step_alias: s.alias.clone(),
                command: s.command.clone(),
                reasoning: reasoning.clone(),
            })
        })
        .collect()
}

pub fn aggregate_pipeline_warnings(steps: &[StepResult]) -> Vec<PipelineWarning> {
    steps
        .iter()
        .flat_map(|s| {
            let warnings = s.metadata.as_ref().and_then(|m| m.warnings.as_ref());
            warnings.into_iter().flatten().map(move |w| PipelineWarning {
                warning: w.clone(),
                step_index: s.index,
                step_alias: s.alias.clone(),
            })
        })
        .collect()
}

pub fn aggregate_pipeline_sources(steps: &[StepResult]) -> Vec<PipelineSource> {
    steps
        .iter()
        .flat_map(|s| {
            let sources = s.metadata.as_ref().and_then(|m| m.sources.as_ref());
            sources.into_iter().flatten().map(move |source| PipelineSource {
                source: source.clone(),
                step_index: s.index,
                step_alias: s.alias.clone(),
            })
        })
        .collect()
}

pub fn aggregate_pipeline_alternatives(steps: &[StepResult]) -> Vec<PipelineAlternative> {
    steps
        .iter()
        .flat_map(|s| {
            let alternatives = s.metadata.as_ref().and_then(|m| m.alternatives.as_ref());
            alternatives.into_iter().flatten().map(move |alt| PipelineAlternative {
                alternative: alt.clone(),
                step_index: s.index,
                step_alias: s.alias.clone(),
            })
        })
        .collect()
}

/// Per-step confidence for every successful step
pub fn build_confidence_breakdown(steps: &[StepResult]) -> Vec<StepConfidence> {
    steps
        .iter()
        .filter(|s| s.is_success())
        .map(|s| StepConfidence {
            step: s.index,
            alias: s.alias.clone(),
            command: s.command.clone(),
            confidence: s.confidence(),
            reasoning: s.metadata.as_ref().and_then(|m| m.reasoning.clone()),
        })
        .collect()
}

pub fn build_pipeline_metadata(steps: &[StepResult], execution_time_ms: u64) -> PipelineMetadata {
    let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();

    PipelineMetadata {
        confidence: aggregate_pipeline_confidence(steps),
        confidence_breakdown: build_confidence_breakdown(steps),
        reasoning: aggregate_pipeline_reasoning(steps),
        warnings: aggregate_pipeline_warnings(steps),
        sources: aggregate_pipeline_sources(steps),
        alternatives: aggregate_pipeline_alternatives(steps),
        execution_time_ms,
        completed_steps: count(StepStatus::Success),
        failed_steps: count(StepStatus::Failure),
        skipped_steps: count(StepStatus::Skipped),
        total_steps: steps.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Source, SourceType, Warning};
    use crate::pipeline::types::StepMetadata;

    fn step(index: usize, status: StepStatus, metadata: Option<StepMetadata>) -> StepResult {
        StepResult {
            index,
            alias: Some(format!("s{index}")),
            command: "cmd".to_string(),
            status,
            data: None,
            error: None,
            execution_time_ms: 1,
            metadata,
        }
    }

    fn with_confidence(confidence: f64) -> Option<StepMetadata> {
        Some(StepMetadata {
            confidence: Some(confidence),
            ..Default::default()
        })
    }

    #[test]
    fn test_confidence_is_weakest_link() {
        let steps = vec![
            step(0, StepStatus::Success, with_confidence(0.95)),
            step(1, StepStatus::Success, with_confidence(0.80)),
            step(2, StepStatus::Success, with_confidence(0.90)),
        ];
        assert_eq!(aggregate_pipeline_confidence(&steps), 0.80);
    }

    #[test]
    fn test_confidence_ignores_failed_and_defaults_missing() {
        let steps = vec![
            step(0, StepStatus::Success, None),
            step(1, StepStatus::Failure, with_confidence(0.1)),
            step(2, StepStatus::Skipped, None),
        ];
        assert_eq!(aggregate_pipeline_confidence(&steps), 1.0);

        let failed = vec![step(0, StepStatus::Failure, None)];
        assert_eq!(aggregate_pipeline_confidence(&failed), 0.0);
        assert_eq!(aggregate_pipeline_confidence(&[]), 0.0);
    }

    #[test]
    fn test_provenance_is_attributed() {
        let steps = vec![
            step(
                0,
                StepStatus::Success,
                Some(StepMetadata {
                    reasoning: Some("looked it up".to_string()),
                    warnings: Some(vec![Warning::new("W1", "first")]),
                    sources: Some(vec![Source::new("db", SourceType::Database)]),
                    ..Default::default()
                }),
            ),
            step(
                1,
                StepStatus::Success,
                Some(StepMetadata {
                    warnings: Some(vec![Warning::new("W2", "second"), Warning::new("W3", "third")]),
                    ..Default::default()
                }),
            ),
        ];

        let reasoning = aggregate_pipeline_reasoning(&steps);
        assert_eq!(reasoning.len(), 1);
        assert_eq!(reasoning[0].step_alias.as_deref(), Some("s0"));

        let warnings = aggregate_pipeline_warnings(&steps);
        let codes: Vec<_> = warnings.iter().map(|w| (w.step_index, w.warning.code.as_str())).collect();
        assert_eq!(codes, [(0, "W1"), (1, "W2"), (1, "W3")]);

        let sources = aggregate_pipeline_sources(&steps);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].step_index, 0);
        assert!(aggregate_pipeline_alternatives(&steps).is_empty());
    }

    #[test]
    fn test_build_pipeline_metadata_counts() {
        let steps = vec![
            step(0, StepStatus::Success, with_confidence(0.7)),
            step(1, StepStatus::Failure, None),
            step(2, StepStatus::Skipped, None),
        ];
        let metadata = build_pipeline_metadata(&steps, 42);
        assert_eq!(metadata.completed_steps, 1);
        assert_eq!(metadata.failed_steps, 1);
        assert_eq!(metadata.skipped_steps, 1);
        assert_eq!(metadata.total_steps, 3);
        assert_eq!(metadata.execution_time_ms, 42);
        assert_eq!(metadata.confidence_breakdown.len(), 1);
        assert_eq!(metadata.confidence_breakdown[0].confidence, 0.7);
    }
}
