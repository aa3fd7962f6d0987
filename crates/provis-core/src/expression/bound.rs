//! The two binding modes of a built expression.

use super::ExpressionError;
use super::ast::Expression;
use super::context::EvaluationContext;
use super::value::Value;

/// An expression with frozen parameters, evaluated per candidate with `this`
/// bound to it.
///
/// Equality and hashing cover both the tree and the parameters, so a match
/// expression can key a cache of query results.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MatchExpression {
    expression: Expression,
    parameters: Vec<Value>,
}

impl MatchExpression {
    pub(crate) fn new(expression: Expression, parameters: Vec<Value>) -> Self {
        Self {
            expression,
            parameters,
        }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// A fresh context holding the frozen parameters.
    pub fn create_context(&self) -> EvaluationContext {
        EvaluationContext::new(self.parameters.clone())
    }

    pub fn is_match(&self, candidate: &Value) -> Result<bool, ExpressionError> {
        let mut ctx = self.create_context();
        self.is_match_in(&mut ctx, candidate)
    }

    /// Rebind `this` in an existing context and evaluate.
    pub fn is_match_in(
        &self,
        ctx: &mut EvaluationContext,
        candidate: &Value,
    ) -> Result<bool, ExpressionError> {
        ctx.set_this(candidate.clone());
        self.expression.is_true(ctx)
    }
}

/// An expression evaluated once against a whole candidate collection bound
/// to `everything`, with parameters supplied per use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextExpression {
    expression: Expression,
}

impl ContextExpression {
    pub(crate) fn new(expression: Expression) -> Self {
        Self { expression }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn evaluate(
        &self,
        parameters: Vec<Value>,
        everything: Value,
    ) -> Result<Value, ExpressionError> {
        let mut ctx = EvaluationContext::new(parameters);
        ctx.set_everything(everything);
        self.expression.evaluate(&mut ctx)
    }
}

/// Any built expression, as accepted by the binding conversions.
#[derive(Debug, Clone)]
pub enum AnyExpression {
    Plain(Expression),
    Match(MatchExpression),
    Context(ContextExpression),
}

impl From<Expression> for AnyExpression {
    fn from(expression: Expression) -> Self {
        AnyExpression::Plain(expression)
    }
}

impl From<MatchExpression> for AnyExpression {
    fn from(expression: MatchExpression) -> Self {
        AnyExpression::Match(expression)
    }
}

impl From<ContextExpression> for AnyExpression {
    fn from(expression: ContextExpression) -> Self {
        AnyExpression::Context(expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionFactory as F;

    #[test]
    fn match_expression_binds_this_and_parameters() {
        let expr = F::match_expression(
            F::equals(F::this_variable(), F::indexed_parameter(0)),
            vec![Value::from("a")],
        )
        .unwrap();
        assert!(expr.is_match(&Value::from("a")).unwrap());
        assert!(!expr.is_match(&Value::from("b")).unwrap());
    }

    #[test]
    fn context_expression_sees_everything() {
        let expr = F::context_expression(F::member(F::everything_variable(), "length")).unwrap();
        let everything = Value::Collection(vec![Value::Integer(1), Value::Integer(2)]);
        assert_eq!(expr.evaluate(vec![], everything).unwrap(), Value::Integer(2));
    }

    #[test]
    fn frozen_parameters_take_part_in_equality() {
        let tree = F::equals(F::this_variable(), F::indexed_parameter(0));
        let a = F::match_expression(tree.clone(), vec![Value::from("a")]).unwrap();
        let b = F::match_expression(tree, vec![Value::from("b")]).unwrap();
        assert_ne!(a, b);
    }
}
