//! Evaluation contexts: positional parameters plus variable bindings.

use super::ExpressionError;
use super::ast::{VARIABLE_EVERYTHING, VARIABLE_THIS};
use super::value::Value;

/// Bindings visible while an expression is evaluated.
///
/// `this` and `everything` are always registered. Quantifiers push a binding
/// for their lambda variable per element and pop it afterwards, so lookups
/// search from the most recent binding backwards.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    parameters: Vec<Value>,
    bindings: Vec<(String, Value)>,
}

impl Default for EvaluationContext {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl EvaluationContext {
    pub fn new(parameters: Vec<Value>) -> Self {
        Self {
            parameters,
            bindings: vec![
                (VARIABLE_THIS.to_string(), Value::Null),
                (VARIABLE_EVERYTHING.to_string(), Value::Null),
            ],
        }
    }

    /// Create a context with extra named variables, each initially bound to
    /// the given value.
    pub fn with_variables<I, S>(variables: I, parameters: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut ctx = Self::new(parameters);
        for (name, value) in variables {
            ctx.set_value(name, value);
        }
        ctx
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Result<&Value, ExpressionError> {
        self.parameters
            .get(index)
            .ok_or(ExpressionError::ParameterOutOfRange {
                index,
                len: self.parameters.len(),
            })
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Rebind the innermost binding of `name`, or register it.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.bindings.iter_mut().rev().find(|(n, _)| *n == name) {
            Some(binding) => binding.1 = value,
            None => self.bindings.push((name, value)),
        }
    }

    pub fn set_this(&mut self, value: Value) {
        self.set_value(VARIABLE_THIS, value);
    }

    pub fn set_everything(&mut self, value: Value) {
        self.set_value(VARIABLE_EVERYTHING, value);
    }

    pub(crate) fn push(&mut self, name: &str, value: Value) {
        self.bindings.push((name.to_string(), value));
    }

    pub(crate) fn pop(&mut self) {
        self.bindings.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_variables_are_pre_registered() {
        let ctx = EvaluationContext::default();
        assert_eq!(ctx.value(VARIABLE_THIS), Some(&Value::Null));
        assert_eq!(ctx.value(VARIABLE_EVERYTHING), Some(&Value::Null));
        assert_eq!(ctx.value("other"), None);
    }

    #[test]
    fn pushed_bindings_shadow_until_popped() {
        let mut ctx = EvaluationContext::with_variables([("x", Value::Integer(1))], Vec::new());
        ctx.push("x", Value::Integer(2));
        assert_eq!(ctx.value("x"), Some(&Value::Integer(2)));
        ctx.pop();
        assert_eq!(ctx.value("x"), Some(&Value::Integer(1)));
    }

    #[test]
    fn parameter_out_of_range_is_an_error() {
        let ctx = EvaluationContext::new(vec![Value::from("a")]);
        assert_eq!(ctx.parameter(0).unwrap(), &Value::from("a"));
        assert!(matches!(
            ctx.parameter(3),
            Err(ExpressionError::ParameterOutOfRange { index: 3, len: 1 })
        ));
    }
}
