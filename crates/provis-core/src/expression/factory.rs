//! Construction of expression trees.
//!
//! Every builder applies its algebraic simplification at construction time,
//! so two trees describing the same predicate compare equal and evaluation
//! never walks a redundant `Not`.

use indexmap::IndexSet;

use super::ExpressionError;
use super::ast::{Expression, Lambda, Member, MemberKind, VARIABLE_EVERYTHING, VARIABLE_THIS};
use super::bound::{AnyExpression, ContextExpression, MatchExpression};
use super::context::EvaluationContext;
use super::filter::LdapFilter;
use super::member::MemberRegistry;
use super::value::Value;

/// Which n-ary combinator [`ExpressionFactory::normalize`] builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Junction {
    And,
    Or,
}

pub struct ExpressionFactory;

impl ExpressionFactory {
    /// `collection.all(lambda)`
    pub fn all(collection: Expression, lambda: Lambda) -> Expression {
        Expression::All {
            collection: Box::new(collection),
            lambda,
        }
    }

    /// `collection.exists(lambda)`
    pub fn exists(collection: Expression, lambda: Lambda) -> Expression {
        Expression::Exists {
            collection: Box::new(collection),
            lambda,
        }
    }

    /// Conjunction. No operands yields `TRUE`, one operand yields itself.
    pub fn and(mut operands: Vec<Expression>) -> Expression {
        match operands.len() {
            0 => Expression::TRUE,
            1 => operands.remove(0),
            _ => Expression::And(operands),
        }
    }

    /// Disjunction.
    ///
    /// No operands yields `TRUE`, the same as [`and`](Self::and). An empty
    /// disjunction would logically be false; existing callers rely on the
    /// `TRUE` result, so it is kept.
    pub fn or(mut operands: Vec<Expression>) -> Expression {
        match operands.len() {
            0 => Expression::TRUE,
            1 => operands.remove(0),
            _ => Expression::Or(operands),
        }
    }

    /// Flatten nested junctions of the same kind and drop duplicate operands
    /// (first occurrence wins) before applying the `and`/`or` rules.
    pub fn normalize(operands: Vec<Expression>, junction: Junction) -> Expression {
        let mut flat = IndexSet::new();
        for operand in operands {
            match (junction, operand) {
                (Junction::And, Expression::And(nested)) | (Junction::Or, Expression::Or(nested)) => {
                    flat.extend(nested)
                }
                (_, other) => {
                    flat.insert(other);
                }
            }
        }
        let flat: Vec<Expression> = flat.into_iter().collect();
        match junction {
            Junction::And => Self::and(flat),
            Junction::Or => Self::or(flat),
        }
    }

    /// `target[key]`
    pub fn at(target: Expression, key: Expression) -> Expression {
        Expression::At {
            target: Box::new(target),
            key: Box::new(key),
        }
    }

    pub fn constant(value: impl Into<Value>) -> Expression {
        Expression::Literal(value.into())
    }

    pub fn equals(lhs: Expression, rhs: Expression) -> Expression {
        Expression::Equals {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            negate: false,
        }
    }

    pub fn greater(lhs: Expression, rhs: Expression) -> Expression {
        Self::compare(lhs, rhs, false, false)
    }

    pub fn greater_equal(lhs: Expression, rhs: Expression) -> Expression {
        Self::compare(lhs, rhs, false, true)
    }

    pub fn less(lhs: Expression, rhs: Expression) -> Expression {
        Self::compare(lhs, rhs, true, false)
    }

    pub fn less_equal(lhs: Expression, rhs: Expression) -> Expression {
        Self::compare(lhs, rhs, true, true)
    }

    fn compare(lhs: Expression, rhs: Expression, less: bool, equal_ok: bool) -> Expression {
        Expression::Compare {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            less,
            equal_ok,
            unordered: false,
        }
    }

    /// Positional parameter `$index`.
    pub fn indexed_parameter(index: usize) -> Expression {
        Expression::Parameter(index)
    }

    pub fn lambda(variable: &str, body: Expression) -> Lambda {
        Lambda {
            variable: variable.to_string(),
            body: Box::new(body),
        }
    }

    /// `lhs ~= rhs`: wildcard pattern, version range or LDAP filter match.
    pub fn matches(lhs: Expression, rhs: Expression) -> Expression {
        Expression::Matches {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `target.name`
    ///
    /// `empty` and `length` are built-in. Other names go through the member
    /// registry; when `target` is a literal the accessor is resolved here.
    pub fn member(target: Expression, name: &str) -> Expression {
        let kind = match name {
            "empty" => MemberKind::Empty,
            "length" => MemberKind::Length,
            _ => {
                let accessor = match &target {
                    Expression::Literal(value) => {
                        MemberRegistry::standard().resolve(value.tag(), name)
                    }
                    _ => None,
                };
                MemberKind::Dynamic {
                    name: name.to_string(),
                    accessor,
                }
            }
        };
        Expression::Member(Member {
            target: Box::new(target),
            kind,
        })
    }

    /// Logical negation with the invertible forms rewritten in place.
    pub fn not(operand: Expression) -> Expression {
        match operand {
            Expression::Equals { lhs, rhs, negate } => Expression::Equals {
                lhs,
                rhs,
                negate: !negate,
            },
            Expression::Compare {
                lhs,
                rhs,
                less,
                equal_ok,
                unordered,
            } => Expression::Compare {
                lhs,
                rhs,
                less: !less,
                equal_ok: !equal_ok,
                unordered: !unordered,
            },
            Expression::Not(inner) => *inner,
            other => Expression::Not(Box::new(other)),
        }
    }

    pub fn variable(name: &str) -> Expression {
        Expression::Variable(name.to_string())
    }

    pub fn this_variable() -> Expression {
        Self::variable(VARIABLE_THIS)
    }

    pub fn everything_variable() -> Expression {
        Self::variable(VARIABLE_EVERYTHING)
    }

    /// Parse an LDAP filter into a literal usable as a `matches` operand.
    pub fn filter(text: &str) -> Result<Expression, ExpressionError> {
        Ok(Self::constant(LdapFilter::parse(text)?))
    }

    pub fn create_context(parameters: Vec<Value>) -> EvaluationContext {
        EvaluationContext::new(parameters)
    }

    pub fn create_context_with_variables<I, S>(
        variables: I,
        parameters: Vec<Value>,
    ) -> EvaluationContext
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        EvaluationContext::with_variables(variables, parameters)
    }

    /// Wrap an expression for repeated evaluation with fresh parameters.
    ///
    /// A match-bound expression has frozen parameters and cannot be turned
    /// back into a context-bound one.
    pub fn context_expression(
        expression: impl Into<AnyExpression>,
    ) -> Result<ContextExpression, ExpressionError> {
        match expression.into() {
            AnyExpression::Plain(expression) => Ok(ContextExpression::new(expression)),
            AnyExpression::Context(context) => Ok(context),
            AnyExpression::Match(_) => Err(ExpressionError::Argument(
                "a match expression cannot be used as a context expression".to_string(),
            )),
        }
    }

    /// Freeze `parameters` into a match-bound expression.
    ///
    /// Passing an already match-bound expression is allowed only without new
    /// parameters, in which case it is returned unchanged.
    pub fn match_expression(
        expression: impl Into<AnyExpression>,
        parameters: Vec<Value>,
    ) -> Result<MatchExpression, ExpressionError> {
        match expression.into() {
            AnyExpression::Plain(expression) => Ok(MatchExpression::new(expression, parameters)),
            AnyExpression::Match(bound) if parameters.is_empty() => Ok(bound),
            AnyExpression::Match(_) => Err(ExpressionError::Argument(
                "a match expression already has frozen parameters".to_string(),
            )),
            AnyExpression::Context(_) => Err(ExpressionError::Argument(
                "a context expression cannot be used as a match expression".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ExpressionFactory as F;
    use super::*;

    fn x() -> Expression {
        F::variable("x")
    }

    #[test]
    fn not_flips_equality_in_place() {
        let negated = F::not(F::equals(x(), F::constant(1)));
        assert!(matches!(negated, Expression::Equals { negate: true, .. }));
        assert_eq!(F::not(negated), F::equals(x(), F::constant(1)));
    }

    #[test]
    fn not_complements_comparisons() {
        assert!(matches!(
            F::not(F::less(x(), F::constant(3))),
            Expression::Compare {
                less: false,
                equal_ok: true,
                unordered: true,
                ..
            }
        ));
        assert!(matches!(
            F::not(F::greater(x(), F::constant(3))),
            Expression::Compare {
                less: true,
                equal_ok: true,
                unordered: true,
                ..
            }
        ));
        let lt = F::less(x(), F::constant(3));
        assert_eq!(F::not(F::not(lt.clone())), lt);
    }

    #[test]
    fn double_negation_is_removed() {
        let inner = F::member(x(), "empty");
        assert_eq!(F::not(F::not(inner.clone())), inner);
    }

    #[test]
    fn empty_and_single_junctions_collapse() {
        assert_eq!(F::and(vec![]), Expression::TRUE);
        assert_eq!(F::or(vec![]), Expression::TRUE);
        assert_eq!(F::and(vec![x()]), x());
        assert_eq!(F::or(vec![x()]), x());
    }

    #[test]
    fn normalize_flattens_and_dedupes() {
        let a = F::equals(x(), F::constant(1));
        let b = F::equals(x(), F::constant(2));
        let nested = F::and(vec![a.clone(), b.clone()]);

        let normalized = F::normalize(vec![nested, a.clone()], Junction::And);
        assert_eq!(normalized, Expression::And(vec![a.clone(), b.clone()]));

        let mixed = F::normalize(vec![F::or(vec![a.clone(), b.clone()]), a.clone()], Junction::And);
        assert_eq!(mixed, Expression::And(vec![Expression::Or(vec![a.clone(), b]), a]));
    }

    #[test]
    fn member_on_literal_resolves_accessor() {
        let expr = F::member(F::constant(semver::Version::new(1, 2, 3)), "minor");
        match expr {
            Expression::Member(Member {
                kind: MemberKind::Dynamic { accessor, .. },
                ..
            }) => assert!(accessor.is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn binding_mode_conversions() {
        let plain = F::equals(F::this_variable(), F::indexed_parameter(0));
        let bound = F::match_expression(plain.clone(), vec![Value::from("a")]).unwrap();

        assert!(matches!(
            F::context_expression(bound.clone()),
            Err(ExpressionError::Argument(_))
        ));
        assert!(matches!(
            F::match_expression(bound.clone(), vec![Value::from("b")]),
            Err(ExpressionError::Argument(_))
        ));
        assert_eq!(F::match_expression(bound.clone(), vec![]).unwrap(), bound);

        let context = F::context_expression(plain).unwrap();
        assert!(matches!(
            F::match_expression(context, vec![]),
            Err(ExpressionError::Argument(_))
        ));
    }
}
