//! Step conditions
//!
//! On the wire a condition is an object with exactly one operator key:
//!
//! ```json
//! {"$and": [{"$exists": "$prev.id"}, {"$eq": ["$prev.status", "active"]}]}
//! ```

use super::types::PipelineContext;
use super::variables::resolve_variable;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineCondition {
    /// Reference resolves to something other than undefined or null
    Exists(String),
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, f64),
    Gte(String, f64),
    Lt(String, f64),
    Lte(String, f64),
    And(Vec<PipelineCondition>),
    Or(Vec<PipelineCondition>),
    Not(Box<PipelineCondition>),
}

impl PipelineCondition {
    pub fn exists(reference: impl Into<String>) -> Self {
        Self::Exists(reference.into())
    }

    pub fn eq(reference: impl Into<String>, expected: Value) -> Self {
        Self::Eq(reference.into(), expected)
    }

    pub fn ne(reference: impl Into<String>, expected: Value) -> Self {
        Self::Ne(reference.into(), expected)
    }

    pub fn gt(reference: impl Into<String>, threshold: f64) -> Self {
        Self::Gt(reference.into(), threshold)
    }

    pub fn gte(reference: impl Into<String>, threshold: f64) -> Self {
        Self::Gte(reference.into(), threshold)
    }

    pub fn lt(reference: impl Into<String>, threshold: f64) -> Self {
        Self::Lt(reference.into(), threshold)
    }

    pub fn lte(reference: impl Into<String>, threshold: f64) -> Self {
        Self::Lte(reference.into(), threshold)
    }

    pub fn and(conditions: Vec<PipelineCondition>) -> Self {
        Self::And(conditions)
    }

    pub fn or(conditions: Vec<PipelineCondition>) -> Self {
        Self::Or(conditions)
    }

    pub fn not(condition: PipelineCondition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Parses the single-key wire form
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;
        if fields.len() != 1 {
            return None;
        }
        let (key, operand) = fields.iter().next()?;

        let condition = match key.as_str() {
            "$exists" => Self::Exists(operand.as_str()?.to_string()),
            "$eq" => {
                let (reference, expected) = reference_pair(operand)?;
                Self::Eq(reference, expected.clone())
            }
            "$ne" => {
                let (reference, expected) = reference_pair(operand)?;
                Self::Ne(reference, expected.clone())
            }
            "$gt" => numeric_pair(operand).map(|(r, n)| Self::Gt(r, n))?,
            "$gte" => numeric_pair(operand).map(|(r, n)| Self::Gte(r, n))?,
            "$lt" => numeric_pair(operand).map(|(r, n)| Self::Lt(r, n))?,
            "$lte" => numeric_pair(operand).map(|(r, n)| Self::Lte(r, n))?,
            "$and" => Self::And(condition_list(operand)?),
            "$or" => Self::Or(condition_list(operand)?),
            "$not" => Self::Not(Box::new(Self::from_value(operand)?)),
            _ => return None,
        };
        Some(condition)
    }

    /// Renders the single-key wire form
    pub fn to_value(&self) -> Value {
        let (key, operand) = match self {
            Self::Exists(r) => ("$exists", Value::String(r.clone())),
            Self::Eq(r, v) => ("$eq", Value::Array(vec![Value::String(r.clone()), v.clone()])),
            Self::Ne(r, v) => ("$ne", Value::Array(vec![Value::String(r.clone()), v.clone()])),
            Self::Gt(r, n) => ("$gt", numeric_operand(r, *n)),
            Self::Gte(r, n) => ("$gte", numeric_operand(r, *n)),
            Self::Lt(r, n) => ("$lt", numeric_operand(r, *n)),
            Self::Lte(r, n) => ("$lte", numeric_operand(r, *n)),
            Self::And(cs) => ("$and", Value::Array(cs.iter().map(Self::to_value).collect())),
            Self::Or(cs) => ("$or", Value::Array(cs.iter().map(Self::to_value).collect())),
            Self::Not(c) => ("$not", c.to_value()),
        };
        let mut fields = Map::new();
        fields.insert(key.to_string(), operand);
        Value::Object(fields)
    }
}

fn reference_pair(operand: &Value) -> Option<(String, &Value)> {
    match operand.as_array()?.as_slice() {
        [Value::String(reference), expected] => Some((reference.clone(), expected)),
        _ => None,
    }
}

fn numeric_pair(operand: &Value) -> Option<(String, f64)> {
    let (reference, threshold) = reference_pair(operand)?;
    Some((reference, threshold.as_f64()?))
}

fn numeric_operand(reference: &str, threshold: f64) -> Value {
    Value::Array(vec![Value::String(reference.to_string()), Value::from(threshold)])
}

fn condition_list(operand: &Value) -> Option<Vec<PipelineCondition>> {
    operand
        .as_array()?
        .iter()
        .map(PipelineCondition::from_value)
        .collect()
}

impl Serialize for PipelineCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineCondition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).ok_or_else(|| {
            D::Error::custom("expected a condition object with exactly one operator key")
        })
    }
}

/// Whether `value` is a well-formed condition
pub fn is_pipeline_condition(value: &Value) -> bool {
    PipelineCondition::from_value(value).is_some()
}

/// Evaluates a condition against the current pipeline state
pub fn evaluate_condition(condition: &PipelineCondition, ctx: &PipelineContext<'_>) -> bool {
    match condition {
        PipelineCondition::Exists(r) => {
            matches!(resolve_variable(r, ctx), Some(v) if !v.is_null())
        }
        PipelineCondition::Eq(r, expected) => strict_equals(resolve_variable(r, ctx).as_ref(), expected),
        PipelineCondition::Ne(r, expected) => {
            !strict_equals(resolve_variable(r, ctx).as_ref(), expected)
        }
        PipelineCondition::Gt(r, n) => compare(r, ctx, |v| v > *n),
        PipelineCondition::Gte(r, n) => compare(r, ctx, |v| v >= *n),
        PipelineCondition::Lt(r, n) => compare(r, ctx, |v| v < *n),
        PipelineCondition::Lte(r, n) => compare(r, ctx, |v| v <= *n),
        PipelineCondition::And(cs) => cs.iter().all(|c| evaluate_condition(c, ctx)),
        PipelineCondition::Or(cs) => cs.iter().any(|c| evaluate_condition(c, ctx)),
        PipelineCondition::Not(c) => !evaluate_condition(c, ctx),
    }
}

fn compare<F>(reference: &str, ctx: &PipelineContext<'_>, op: F) -> bool
where
    F: Fn(f64) -> bool,
{
    resolve_variable(reference, ctx)
        .and_then(|v| v.as_f64())
        .is_some_and(op)
}

/// Undefined equals nothing; numbers compare by value regardless of representation
fn strict_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(actual) => values_equal(actual, expected),
        None => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{StepResult, StepStatus};
    use serde_json::json;

    fn prev(data: Value) -> StepResult {
        StepResult {
            index: 0,
            alias: None,
            command: "get".to_string(),
            status: StepStatus::Success,
            data: Some(data),
            error: None,
            execution_time_ms: 0,
            metadata: None,
        }
    }

    fn eval(condition: Value, data: Value) -> bool {
        let step = prev(data);
        let steps = [step.clone()];
        let ctx = PipelineContext::new(None, Some(&step), &steps);
        let condition = PipelineCondition::from_value(&condition).expect("valid condition");
        evaluate_condition(&condition, &ctx)
    }

    #[test]
    fn test_is_pipeline_condition() {
        assert!(is_pipeline_condition(&json!({"$exists": "$prev.id"})));
        assert!(is_pipeline_condition(&json!({"$gt": ["$prev.n", 3]})));
        assert!(is_pipeline_condition(&json!({"$not": {"$eq": ["$prev.a", null]}})));
        assert!(is_pipeline_condition(&json!({"$and": []})));

        assert!(!is_pipeline_condition(&json!({})));
        assert!(!is_pipeline_condition(&json!({"$exists": "$a", "$eq": ["$a", 1]})));
        assert!(!is_pipeline_condition(&json!({"$regex": "x"})));
        assert!(!is_pipeline_condition(&json!({"$gt": ["$prev.n", "3"]})));
        assert!(!is_pipeline_condition(&json!({"$eq": ["$prev.n"]})));
        assert!(!is_pipeline_condition(&json!({"$and": [{"$bogus": 1}]})));
        assert!(!is_pipeline_condition(&json!("$exists")));
    }

    #[test]
    fn test_exists() {
        assert!(eval(json!({"$exists": "$prev.id"}), json!({"id": 0})));
        assert!(eval(json!({"$exists": "$prev.flag"}), json!({"flag": false})));
        assert!(!eval(json!({"$exists": "$prev.id"}), json!({"id": null})));
        assert!(!eval(json!({"$exists": "$prev.id"}), json!({})));
    }

    #[test]
    fn test_strict_equality() {
        let data = json!({"status": "active", "count": 2, "gone": null, "tags": ["a"]});
        assert!(eval(json!({"$eq": ["$prev.status", "active"]}), data.clone()));
        assert!(eval(json!({"$eq": ["$prev.count", 2.0]}), data.clone()));
        assert!(!eval(json!({"$eq": ["$prev.count", "2"]}), data.clone()));
        assert!(eval(json!({"$eq": ["$prev.gone", null]}), data.clone()));
        assert!(!eval(json!({"$eq": ["$prev.missing", null]}), data.clone()));
        assert!(eval(json!({"$ne": ["$prev.missing", null]}), data.clone()));
        assert!(eval(json!({"$eq": ["$prev.tags", ["a"]]}), data));
    }

    #[test]
    fn test_numeric_comparisons() {
        let data = json!({"n": 5, "s": "10"});
        assert!(eval(json!({"$gt": ["$prev.n", 4]}), data.clone()));
        assert!(eval(json!({"$gte": ["$prev.n", 5]}), data.clone()));
        assert!(eval(json!({"$lt": ["$prev.n", 5.5]}), data.clone()));
        assert!(eval(json!({"$lte": ["$prev.n", 5]}), data.clone()));
        assert!(!eval(json!({"$gt": ["$prev.s", 1]}), data.clone()));
        assert!(!eval(json!({"$lt": ["$prev.missing", 100]}), data));
    }

    #[test]
    fn test_logical_operators() {
        let data = json!({"id": 1, "status": "active"});
        let both = json!({"$and": [{"$exists": "$prev.id"}, {"$eq": ["$prev.status", "active"]}]});
        assert!(eval(both.clone(), data.clone()));
        assert!(!eval(json!({"$not": both}), data.clone()));
        assert!(eval(
            json!({"$or": [{"$exists": "$prev.nope"}, {"$eq": ["$prev.id", 1]}]}),
            data.clone()
        ));
        assert!(eval(json!({"$and": []}), data.clone()));
        assert!(!eval(json!({"$or": []}), data));
    }

    #[test]
    fn test_serde_round_trip_preserves_wire_form() {
        let wire = json!({"$or": [{"$lt": ["$prev.n", 3.0]}, {"$not": {"$exists": "$input.x"}}]});
        let condition: PipelineCondition = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(
            condition,
            PipelineCondition::or(vec![
                PipelineCondition::lt("$prev.n", 3.0),
                PipelineCondition::not(PipelineCondition::exists("$input.x")),
            ])
        );
        assert_eq!(serde_json::to_value(&condition).unwrap(), wire);

        let err = serde_json::from_value::<PipelineCondition>(json!({"a": 1, "b": 2}));
        assert!(err.is_err());
    }
}
