//! Expression evaluation.

use std::cmp::Ordering;

use semver::Version;

use super::ExpressionError;
use super::ast::{Expression, Lambda, Member, MemberKind};
use super::context::EvaluationContext;
use super::member::MemberRegistry;
use super::value::{Value, coerced_cmp, coerced_eq};

impl Expression {
    /// Evaluate this expression against `ctx`.
    pub fn evaluate(&self, ctx: &mut EvaluationContext) -> Result<Value, ExpressionError> {
        match self {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(name) => ctx
                .value(name)
                .cloned()
                .ok_or_else(|| ExpressionError::UnboundVariable(name.clone())),
            Expression::Parameter(index) => ctx.parameter(*index).cloned(),
            Expression::Member(member) => evaluate_member(member, ctx),
            Expression::At { target, key } => {
                let target = target.evaluate(ctx)?;
                let key = key.evaluate(ctx)?;
                evaluate_at(target, key)
            }
            Expression::Equals { lhs, rhs, negate } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                Ok(Value::Bool(coerced_eq(&lhs, &rhs) != *negate))
            }
            Expression::Compare {
                lhs,
                rhs,
                less,
                equal_ok,
                unordered,
            } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                let result = evaluate_compare(&lhs, &rhs, *less, *equal_ok, *unordered);
                Ok(Value::Bool(result))
            }
            Expression::Not(operand) => Ok(Value::Bool(!operand.is_true(ctx)?)),
            Expression::And(operands) => {
                for operand in operands {
                    if !operand.is_true(ctx)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expression::Or(operands) => {
                for operand in operands {
                    if operand.is_true(ctx)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expression::All { collection, lambda } => {
                let items = evaluate_collection(collection, ctx)?;
                for item in items {
                    if !apply_lambda(lambda, item, ctx)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Ok(Value::Bool(true))
            }
            Expression::Exists { collection, lambda } => {
                let items = evaluate_collection(collection, ctx)?;
                for item in items {
                    if apply_lambda(lambda, item, ctx)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            }
            Expression::Matches { lhs, rhs } => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                evaluate_matches(&lhs, &rhs).map(Value::Bool)
            }
        }
    }

    /// Evaluate and require a boolean result.
    pub fn is_true(&self, ctx: &mut EvaluationContext) -> Result<bool, ExpressionError> {
        match self.evaluate(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExpressionError::NotBoolean {
                expression: self.to_string(),
                found: other.tag(),
            }),
        }
    }
}

fn apply_lambda(
    lambda: &Lambda,
    item: Value,
    ctx: &mut EvaluationContext,
) -> Result<bool, ExpressionError> {
    ctx.push(&lambda.variable, item);
    let result = lambda.body.is_true(ctx);
    ctx.pop();
    result
}

fn evaluate_collection(
    collection: &Expression,
    ctx: &mut EvaluationContext,
) -> Result<Vec<Value>, ExpressionError> {
    match collection.evaluate(ctx)? {
        Value::Collection(items) => Ok(items),
        Value::Map(map) => Ok(map.into_values().map(Value::String).collect()),
        other => Err(ExpressionError::NotCollection {
            expression: collection.to_string(),
            found: other.tag(),
        }),
    }
}

fn evaluate_member(member: &Member, ctx: &mut EvaluationContext) -> Result<Value, ExpressionError> {
    let target = member.target.evaluate(ctx)?;
    match &member.kind {
        MemberKind::Empty => match &target {
            Value::Collection(items) => Ok(Value::Bool(items.is_empty())),
            Value::Map(map) => Ok(Value::Bool(map.is_empty())),
            Value::String(s) => Ok(Value::Bool(s.is_empty())),
            other => Err(ExpressionError::NoSuchMember {
                name: "empty".to_string(),
                tag: other.tag(),
            }),
        },
        MemberKind::Length => {
            let len = match &target {
                Value::Collection(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::String(s) => s.chars().count(),
                other => {
                    return Err(ExpressionError::NoSuchMember {
                        name: "length".to_string(),
                        tag: other.tag(),
                    });
                }
            };
            Ok(Value::Integer(i64::try_from(len).unwrap_or(i64::MAX)))
        }
        MemberKind::Dynamic { name, accessor } => {
            if let Some(value) = accessor.as_ref().and_then(|a| a.apply(&target)) {
                return Ok(value);
            }
            MemberRegistry::standard()
                .resolve(target.tag(), name)
                .and_then(|a| a.apply(&target))
                .ok_or_else(|| ExpressionError::NoSuchMember {
                    name: name.clone(),
                    tag: target.tag(),
                })
        }
    }
}

fn evaluate_at(target: Value, key: Value) -> Result<Value, ExpressionError> {
    match (target, key) {
        (Value::Map(map), Value::String(key)) => {
            Ok(map.get(&key).cloned().map(Value::String).unwrap_or(Value::Null))
        }
        (Value::Unit(unit), Value::String(key)) => {
            Ok(unit.property(&key).map(Value::from).unwrap_or(Value::Null))
        }
        (Value::Collection(items), Value::Integer(index)) => Ok(usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i).cloned())
            .unwrap_or(Value::Null)),
        (Value::Null, _) => Ok(Value::Null),
        (target, key) => Err(ExpressionError::TypeMismatch {
            operation: "[]",
            lhs: target.tag(),
            rhs: key.tag(),
        }),
    }
}

fn evaluate_compare(
    lhs: &Value,
    rhs: &Value,
    less: bool,
    equal_ok: bool,
    unordered: bool,
) -> bool {
    // Null never orders, and neither do values without a common type.
    let ordering = if lhs.is_null() || rhs.is_null() {
        None
    } else {
        coerced_cmp(lhs, rhs)
    };
    match ordering {
        None => unordered,
        Some(Ordering::Equal) => equal_ok,
        Some(Ordering::Less) => less,
        Some(Ordering::Greater) => !less,
    }
}

fn evaluate_matches(lhs: &Value, rhs: &Value) -> Result<bool, ExpressionError> {
    match (lhs, rhs) {
        (Value::Null, _) => Ok(false),
        (Value::String(s), Value::Pattern(pattern)) => Ok(pattern.is_match(s)),
        (Value::String(s), Value::String(pattern)) => {
            Ok(super::value::SimplePattern::new(pattern.as_str()).is_match(s))
        }
        (Value::Version(version), Value::VersionRange(range)) => Ok(range.matches(version)),
        (Value::String(s), Value::VersionRange(range)) => {
            Ok(Version::parse(s.trim()).is_ok_and(|v| range.matches(&v)))
        }
        (Value::Map(_) | Value::Unit(_), Value::Filter(filter)) => filter.matches(lhs),
        (Value::Collection(items), _) => {
            for item in items {
                if evaluate_matches(item, rhs)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        (lhs, rhs) => Err(ExpressionError::TypeMismatch {
            operation: "~=",
            lhs: lhs.tag(),
            rhs: rhs.tag(),
        }),
    }
}
