//! Variable references in pipeline step inputs
//!
//! A reference is a string starting with `$`:
//! - `$input`, `$prev`, `$first` and their `.path` forms
//! - `$steps[n]` and `$steps[n].path` for positional lookup
//! - `$steps.alias` and `$steps.alias.path` for lookup by alias
//!
//! Paths are dot separated and each segment may carry one index
//! (`items[2].name`). Anything malformed resolves to `None` (undefined).

use super::types::PipelineContext;
use serde_json::{Map, Value};
use tracing::trace;

/// Resolves a single reference against the context
///
/// Strings without a leading `$` are literals and come back unchanged.
pub fn resolve_variable(reference: &str, ctx: &PipelineContext<'_>) -> Option<Value> {
    if !reference.starts_with('$') {
        return Some(Value::String(reference.to_string()));
    }

    let resolved = match reference {
        "$prev" => ctx.previous_result.and_then(|s| s.data.clone()),
        "$first" => ctx.steps.first().and_then(|s| s.data.clone()),
        "$input" => ctx.pipeline_input.cloned(),
        _ => resolve_prefixed(reference, ctx),
    };

    trace!(reference, defined = resolved.is_some(), "Resolved pipeline variable");
    resolved
}

fn resolve_prefixed(reference: &str, ctx: &PipelineContext<'_>) -> Option<Value> {
    if let Some(rest) = reference.strip_prefix("$steps[") {
        let (digits, remainder) = rest.split_once(']')?;
        let index: usize = digits.parse().ok()?;
        let data = ctx.steps.get(index)?.data.as_ref()?;
        return match remainder {
            "" => Some(data.clone()),
            _ => get_nested_value(data, remainder.strip_prefix('.')?),
        };
    }

    if let Some(rest) = reference.strip_prefix("$steps.") {
        let (alias, path) = match rest.split_once('.') {
            Some((alias, path)) => (alias, Some(path)),
            None => (rest, None),
        };
        let step = ctx
            .steps
            .iter()
            .find(|s| s.alias.as_deref() == Some(alias))?;
        let data = step.data.as_ref()?;
        return match path {
            Some(path) => get_nested_value(data, path),
            None => Some(data.clone()),
        };
    }

    if let Some(path) = reference.strip_prefix("$prev.") {
        let data = ctx.previous_result?.data.as_ref()?;
        return get_nested_value(data, path);
    }

    if let Some(path) = reference.strip_prefix("$first.") {
        let data = ctx.steps.first()?.data.as_ref()?;
        return get_nested_value(data, path);
    }

    if let Some(path) = reference.strip_prefix("$input.") {
        return get_nested_value(ctx.pipeline_input?, path);
    }

    None
}

/// Walks a dotted path through a JSON value
///
/// Returns `None` on a missing key, a null intermediate, an index into a
/// non-array or past its end. `length` on an array or string yields its
/// length.
pub fn get_nested_value(value: &Value, path: &str) -> Option<Value> {
    let mut current = value;
    let segments: Vec<&str> = path.split('.').collect();

    for (position, segment) in segments.iter().enumerate() {
        let (key, index) = parse_segment(segment)?;

        if index.is_none() && key == "length" && position == segments.len() - 1 {
            if let Some(len) = length_of(current) {
                return Some(Value::from(len));
            }
        }

        current = current.as_object()?.get(key)?;

        if let Some(index) = index {
            current = current.as_array()?.get(index)?;
        }
    }

    Some(current.clone())
}

/// Splits `name[idx]` into its parts; a segment without brackets has no index
fn parse_segment(segment: &str) -> Option<(&str, Option<usize>)> {
    match segment.strip_suffix(']') {
        Some(head) => {
            let (name, index) = head.split_once('[')?;
            if name.is_empty() {
                return None;
            }
            Some((name, Some(index.parse().ok()?)))
        }
        None => Some((segment, None)),
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

/// Rewrites every reference inside `input`
///
/// Undefined references become `null` at the top level and inside arrays,
/// and drop their key inside objects.
pub fn resolve_variables(input: &Value, ctx: &PipelineContext<'_>) -> Value {
    resolve_value(input, ctx).unwrap_or(Value::Null)
}

fn resolve_value(input: &Value, ctx: &PipelineContext<'_>) -> Option<Value> {
    match input {
        Value::String(s) if s.starts_with('$') => resolve_variable(s, ctx),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| resolve_value(item, ctx).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(fields) => {
            let resolved: Map<String, Value> = fields
                .iter()
                .filter_map(|(key, value)| resolve_value(value, ctx).map(|v| (key.clone(), v)))
                .collect();
            Some(Value::Object(resolved))
        }
        other => Some(other.clone()),
    }
}
