//! Property tests for the pure aggregation and resolution functions
//!
//! These tests verify:
//! - Batch summaries always account for every command
//! - Batch confidence stays in bounds and never drops when a failure turns into a success
//! - Condition combinators obey De Morgan's laws
//! - `$prev.path` resolution agrees with direct path lookup

use proptest::prelude::*;
use serde_json::{json, Value};
use switchyard::batch::{calculate_batch_confidence, summarize_batch, BatchCommandResult};
use switchyard::commands::{CommandError, CommandResult};
use switchyard::error::ErrorCode;
use switchyard::pipeline::{
    evaluate_condition, get_nested_value, resolve_variable, PipelineCondition, PipelineContext,
    StepResult, StepStatus,
};

// ============================================================================
// Batch aggregation
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success(Option<f64>),
    Failure,
    Skipped,
    TimedOut,
}

fn outcome_strategy() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        proptest::option::of(0.0f64..=1.0).prop_map(Outcome::Success),
        Just(Outcome::Failure),
        Just(Outcome::Skipped),
        Just(Outcome::TimedOut),
    ]
}

fn batch_result(index: usize, outcome: Outcome) -> BatchCommandResult {
    let result = match outcome {
        Outcome::Success(confidence) => {
            let result = CommandResult::success(json!(index));
            match confidence {
                Some(c) => result.with_confidence(c),
                None => result,
            }
        }
        Outcome::Failure => CommandResult::failure(CommandError::new("BROKEN", "failed")),
        Outcome::Skipped => {
            CommandResult::failure(CommandError::new(ErrorCode::COMMAND_SKIPPED, "skipped"))
        }
        Outcome::TimedOut => {
            CommandResult::failure(CommandError::new(ErrorCode::BATCH_TIMEOUT, "timed out"))
        }
    };
    BatchCommandResult {
        id: format!("cmd-{index}"),
        index,
        command: "test".to_string(),
        result,
        duration_ms: 0,
        skipped: matches!(outcome, Outcome::Skipped | Outcome::TimedOut),
    }
}

fn batch_results(outcomes: &[Outcome]) -> Vec<BatchCommandResult> {
    outcomes
        .iter()
        .enumerate()
        .map(|(i, o)| batch_result(i, *o))
        .collect()
}

proptest! {
    #[test]
    fn prop_summary_accounts_for_every_command(
        outcomes in prop::collection::vec(outcome_strategy(), 0..40)
    ) {
        let summary = summarize_batch(&batch_results(&outcomes));
        prop_assert_eq!(summary.total, outcomes.len());
        prop_assert_eq!(
            summary.total,
            summary.success_count + summary.failure_count + summary.skipped_count
        );
    }

    #[test]
    fn prop_batch_confidence_in_bounds(
        outcomes in prop::collection::vec(outcome_strategy(), 0..40)
    ) {
        let confidence = calculate_batch_confidence(&batch_results(&outcomes));
        prop_assert!((0.0..=1.0).contains(&confidence));
    }

    #[test]
    fn prop_all_failed_batch_has_zero_confidence(count in 1usize..30) {
        let outcomes = vec![Outcome::Failure; count];
        prop_assert_eq!(calculate_batch_confidence(&batch_results(&outcomes)), 0.0);
    }

    #[test]
    fn prop_fixing_a_failure_never_lowers_confidence(
        confidence in 0.0f64..=1.0,
        successes in 0usize..10,
        failures in 1usize..10,
    ) {
        let mut outcomes = vec![Outcome::Success(Some(confidence)); successes];
        outcomes.extend(vec![Outcome::Failure; failures]);
        let before = calculate_batch_confidence(&batch_results(&outcomes));

        let last = outcomes.len() - 1;
        outcomes[last] = Outcome::Success(Some(confidence));
        let after = calculate_batch_confidence(&batch_results(&outcomes));

        prop_assert!(after + 1e-12 >= before, "{} < {}", after, before);
    }
}

#[test]
fn test_empty_batch_confidence_is_one() {
    assert_eq!(calculate_batch_confidence(&[]), 1.0);
}

// ============================================================================
// Conditions and variables
// ============================================================================

fn step_with(data: Value) -> StepResult {
    StepResult {
        index: 0,
        alias: Some("only".to_string()),
        command: "test".to_string(),
        status: StepStatus::Success,
        data: Some(data),
        error: None,
        execution_time_ms: 0,
        metadata: None,
    }
}

fn reference() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("$prev.id"),
        Just("$prev.status"),
        Just("$prev.score"),
        Just("$prev.missing"),
        Just("$input.flag"),
    ]
    .prop_map(|r| r.to_string())
}

fn leaf_condition() -> impl Strategy<Value = PipelineCondition> {
    prop_oneof![
        reference().prop_map(PipelineCondition::exists),
        (reference(), prop_oneof![Just(json!("active")), Just(json!(7)), Just(json!(null))])
            .prop_map(|(r, v)| PipelineCondition::eq(r, v)),
        (reference(), -10.0f64..10.0).prop_map(|(r, n)| PipelineCondition::gt(r, n)),
        (reference(), -10.0f64..10.0).prop_map(|(r, n)| PipelineCondition::lte(r, n)),
    ]
}

fn condition_strategy() -> impl Strategy<Value = PipelineCondition> {
    leaf_condition().prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..3).prop_map(PipelineCondition::and),
            prop::collection::vec(inner.clone(), 0..3).prop_map(PipelineCondition::or),
            inner.prop_map(PipelineCondition::not),
        ]
    })
}

fn record_strategy() -> impl Strategy<Value = Value> {
    (
        proptest::option::of(0i64..20),
        prop_oneof![Just("active"), Just("inactive")],
        -10.0f64..10.0,
    )
        .prop_map(|(id, status, score)| match id {
            Some(id) => json!({"id": id, "status": status, "score": score}),
            None => json!({"status": status, "score": score}),
        })
}

proptest! {
    #[test]
    fn prop_de_morgan_and(
        a in condition_strategy(),
        b in condition_strategy(),
        record in record_strategy(),
        flag in any::<bool>(),
    ) {
        let input = json!({"flag": flag});
        let steps = vec![step_with(record)];
        let ctx = PipelineContext::new(Some(&input), steps.first(), &steps);

        let negated_and = PipelineCondition::not(PipelineCondition::and(vec![a.clone(), b.clone()]));
        let or_of_negations = PipelineCondition::or(vec![
            PipelineCondition::not(a.clone()),
            PipelineCondition::not(b.clone()),
        ]);
        prop_assert_eq!(
            evaluate_condition(&negated_and, &ctx),
            evaluate_condition(&or_of_negations, &ctx)
        );

        let both = PipelineCondition::and(vec![a.clone(), b.clone()]);
        prop_assert_eq!(
            evaluate_condition(&both, &ctx),
            evaluate_condition(&a, &ctx) && evaluate_condition(&b, &ctx)
        );
    }

    #[test]
    fn prop_de_morgan_or(
        a in condition_strategy(),
        b in condition_strategy(),
        record in record_strategy(),
    ) {
        let steps = vec![step_with(record)];
        let ctx = PipelineContext::new(None, steps.first(), &steps);

        let negated_or = PipelineCondition::not(PipelineCondition::or(vec![a.clone(), b.clone()]));
        let and_of_negations = PipelineCondition::and(vec![
            PipelineCondition::not(a),
            PipelineCondition::not(b),
        ]);
        prop_assert_eq!(
            evaluate_condition(&negated_or, &ctx),
            evaluate_condition(&and_of_negations, &ctx)
        );
    }

    #[test]
    fn prop_condition_wire_form_is_stable(condition in condition_strategy()) {
        let value = serde_json::to_value(&condition).unwrap();
        let parsed: PipelineCondition = serde_json::from_value(value).unwrap();
        prop_assert_eq!(parsed, condition);
    }
}

fn nested_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn path_strategy() -> impl Strategy<Value = String> {
    let segment = ("[a-c]", proptest::option::of(0usize..4)).prop_map(|(key, index)| match index {
        Some(i) => format!("{key}[{i}]"),
        None => key,
    });
    prop::collection::vec(segment, 1..4).prop_map(|segments| segments.join("."))
}

proptest! {
    #[test]
    fn prop_prev_reference_matches_nested_lookup(data in nested_value(), path in path_strategy()) {
        let steps = vec![step_with(data.clone())];
        let ctx = PipelineContext::new(None, steps.first(), &steps);

        prop_assert_eq!(
            resolve_variable(&format!("$prev.{path}"), &ctx),
            get_nested_value(&data, &path)
        );
        prop_assert_eq!(
            resolve_variable(&format!("$steps.only.{path}"), &ctx),
            get_nested_value(&data, &path)
        );
    }
}

#[test]
fn test_indexed_lookup() {
    let data = json!({"items": ["a", "b", "c"]});
    assert_eq!(get_nested_value(&data, "items[2]"), Some(json!("c")));
    assert_eq!(get_nested_value(&data, "items[3]"), None);
}
