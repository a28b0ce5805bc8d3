// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Condition expression evaluation.
//!
//! Condition blocks carry a [`ConditionExpression`] tree. Evaluation resolves
//! leaf mapping values against the run context, applies the operators, and
//! reduces the tree to a boolean. Comparison is type-coerced the way JSON
//! APIs expect: `"5"` equals `5`, truthiness follows JavaScript-like rules.

use crate::context::RunContext;
use crate::error::EngineError;
use nusoma_dsl::{ConditionArgument, ConditionExpression, ConditionOperation, ConditionOperator};
use serde_json::Value;

/// Evaluate a condition expression against the run context.
pub fn evaluate(
    block_id: &str,
    expr: &ConditionExpression,
    ctx: &RunContext,
) -> Result<bool, EngineError> {
    match expr {
        ConditionExpression::Value(mapping) => {
            let value = ctx.resolve(block_id, mapping)?;
            Ok(is_truthy(&value))
        }
        ConditionExpression::Operation(op) => evaluate_operation(block_id, op, ctx),
    }
}

fn evaluate_operation(
    block_id: &str,
    operation: &ConditionOperation,
    ctx: &RunContext,
) -> Result<bool, EngineError> {
    let args = &operation.arguments;

    match operation.op {
        ConditionOperator::And => {
            for arg in args {
                if !eval_argument_bool(block_id, arg, ctx)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        ConditionOperator::Or => {
            for arg in args {
                if eval_argument_bool(block_id, arg, ctx)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        ConditionOperator::Not => {
            let arg = single_arg(block_id, &operation.op, args)?;
            Ok(!eval_argument_bool(block_id, arg, ctx)?)
        }

        ConditionOperator::Eq => {
            let (l, r) = binary_values(block_id, &operation.op, args, ctx)?;
            Ok(values_equal(&l, &r))
        }
        ConditionOperator::Ne => {
            let (l, r) = binary_values(block_id, &operation.op, args, ctx)?;
            Ok(!values_equal(&l, &r))
        }
        ConditionOperator::Gt => numeric_compare(block_id, &operation.op, args, ctx, |l, r| l > r),
        ConditionOperator::Gte => {
            numeric_compare(block_id, &operation.op, args, ctx, |l, r| l >= r)
        }
        ConditionOperator::Lt => numeric_compare(block_id, &operation.op, args, ctx, |l, r| l < r),
        ConditionOperator::Lte => {
            numeric_compare(block_id, &operation.op, args, ctx, |l, r| l <= r)
        }

        ConditionOperator::StartsWith => {
            string_compare(block_id, &operation.op, args, ctx, |l, r| l.starts_with(r))
        }
        ConditionOperator::EndsWith => {
            string_compare(block_id, &operation.op, args, ctx, |l, r| l.ends_with(r))
        }
        ConditionOperator::Contains => {
            let (l, r) = binary_values(block_id, &operation.op, args, ctx)?;
            match &l {
                Value::String(haystack) => Ok(match &r {
                    Value::String(needle) => haystack.contains(needle.as_str()),
                    other => haystack.contains(&value_as_string(other)),
                }),
                Value::Array(items) => Ok(items.iter().any(|item| values_equal(item, &r))),
                Value::Object(map) => match &r {
                    Value::String(key) => Ok(map.contains_key(key)),
                    _ => Ok(false),
                },
                _ => Ok(false),
            }
        }
        ConditionOperator::In => membership(block_id, &operation.op, args, ctx, false),
        ConditionOperator::NotIn => membership(block_id, &operation.op, args, ctx, true),

        ConditionOperator::IsDefined => {
            let arg = single_arg(block_id, &operation.op, args)?;
            Ok(!eval_argument(block_id, arg, ctx)?.is_null())
        }
        ConditionOperator::IsEmpty => {
            let arg = single_arg(block_id, &operation.op, args)?;
            Ok(is_empty(&eval_argument(block_id, arg, ctx)?))
        }
        ConditionOperator::IsNotEmpty => {
            let arg = single_arg(block_id, &operation.op, args)?;
            Ok(!is_empty(&eval_argument(block_id, arg, ctx)?))
        }
    }
}

/// Evaluate one argument to a JSON value. Nested expressions reduce to a
/// boolean; leaf values resolve through the context. Unresolvable references
/// evaluate to null rather than failing, so `isDefined` can test them.
fn eval_argument(
    block_id: &str,
    arg: &ConditionArgument,
    ctx: &RunContext,
) -> Result<Value, EngineError> {
    match arg {
        ConditionArgument::Expression(expr) => Ok(Value::Bool(evaluate(block_id, expr, ctx)?)),
        ConditionArgument::Value(mapping) => match ctx.resolve(block_id, mapping) {
            Ok(value) => Ok(value),
            Err(EngineError::MappingError { message, .. })
                if message.contains("did not resolve") =>
            {
                Ok(Value::Null)
            }
            Err(err) => Err(err),
        },
    }
}

fn eval_argument_bool(
    block_id: &str,
    arg: &ConditionArgument,
    ctx: &RunContext,
) -> Result<bool, EngineError> {
    Ok(is_truthy(&eval_argument(block_id, arg, ctx)?))
}

fn single_arg<'a>(
    block_id: &str,
    op: &ConditionOperator,
    args: &'a [ConditionArgument],
) -> Result<&'a ConditionArgument, EngineError> {
    match args {
        [arg] => Ok(arg),
        _ => Err(arity_error(block_id, op, 1, args.len())),
    }
}

fn binary_values(
    block_id: &str,
    op: &ConditionOperator,
    args: &[ConditionArgument],
    ctx: &RunContext,
) -> Result<(Value, Value), EngineError> {
    match args {
        [left, right] => Ok((
            eval_argument(block_id, left, ctx)?,
            eval_argument(block_id, right, ctx)?,
        )),
        _ => Err(arity_error(block_id, op, 2, args.len())),
    }
}

fn numeric_compare(
    block_id: &str,
    op: &ConditionOperator,
    args: &[ConditionArgument],
    ctx: &RunContext,
    cmp: fn(f64, f64) -> bool,
) -> Result<bool, EngineError> {
    let (l, r) = binary_values(block_id, op, args, ctx)?;
    match (to_number(&l), to_number(&r)) {
        (Some(lf), Some(rf)) => Ok(cmp(lf, rf)),
        _ => Err(EngineError::MappingError {
            block_id: block_id.to_string(),
            message: format!("operator '{:?}' requires numeric operands", op),
        }),
    }
}

fn string_compare(
    block_id: &str,
    op: &ConditionOperator,
    args: &[ConditionArgument],
    ctx: &RunContext,
    cmp: fn(&str, &str) -> bool,
) -> Result<bool, EngineError> {
    let (l, r) = binary_values(block_id, op, args, ctx)?;
    Ok(cmp(&value_as_string(&l), &value_as_string(&r)))
}

fn membership(
    block_id: &str,
    op: &ConditionOperator,
    args: &[ConditionArgument],
    ctx: &RunContext,
    negate: bool,
) -> Result<bool, EngineError> {
    let (needle, haystack) = binary_values(block_id, op, args, ctx)?;
    let found = match &haystack {
        Value::Array(items) => items.iter().any(|item| values_equal(item, &needle)),
        Value::String(s) => s.contains(&value_as_string(&needle)),
        Value::Object(map) => match &needle {
            Value::String(key) => map.contains_key(key),
            _ => false,
        },
        _ => false,
    };
    Ok(found != negate)
}

fn arity_error(block_id: &str, op: &ConditionOperator, expected: usize, got: usize) -> EngineError {
    EngineError::MappingError {
        block_id: block_id.to_string(),
        message: format!(
            "operator '{:?}' expects {} argument(s), got {}",
            op, expected, got
        ),
    }
}

/// Check if two JSON values are equal.
///
/// Performs type-coerced equality comparison:
/// - Numbers are compared numerically (i64 vs f64 handled)
/// - Strings are compared as strings
/// - Arrays and objects use structural equality
/// - Strings coerce against numbers (`"5"` equals `5`)
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,

        (Value::Bool(l), Value::Bool(r)) => l == r,

        // Compare as f64 for consistency across i64/u64/f64
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(lf), Some(rf)) => (lf - rf).abs() < f64::EPSILON,
            _ => false,
        },

        (Value::String(l), Value::String(r)) => l == r,

        (Value::Array(l), Value::Array(r)) => {
            if l.len() != r.len() {
                return false;
            }
            l.iter().zip(r.iter()).all(|(a, b)| values_equal(a, b))
        }

        (Value::Object(l), Value::Object(r)) => {
            if l.len() != r.len() {
                return false;
            }
            l.iter()
                .all(|(k, v)| r.get(k).is_some_and(|rv| values_equal(v, rv)))
        }

        // String to number coercion (common in JSON APIs)
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            if let Ok(parsed) = s.parse::<f64>()
                && let Some(num) = n.as_f64()
            {
                return (parsed - num).abs() < f64::EPSILON;
            }
            false
        }

        _ => false,
    }
}

/// Check if a JSON value is "truthy".
///
/// `null`, `false`, `0`, `""`, `[]`, and `{}` are falsy; everything else
/// is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i != 0
            } else if let Some(f) = n.as_f64() {
                f != 0.0
            } else {
                true
            }
        }
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Convert a JSON value to an f64. Strings parse, booleans map to 1.0/0.0,
/// null/arrays/objects return None.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
