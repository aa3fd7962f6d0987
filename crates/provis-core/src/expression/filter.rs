//! LDAP-style filters (`(&(os=linux)(arch=x86_64))`).
//!
//! A filter is parsed once into an ordinary expression tree over `this`, which
//! is then evaluated against a property map or an installable unit.

use std::fmt;

use semver::Version;

use super::ExpressionError;
use super::ast::Expression;
use super::context::EvaluationContext;
use super::factory::ExpressionFactory as F;
use super::value::{SimplePattern, Value};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LdapFilter {
    text: String,
    expression: Expression,
}

impl LdapFilter {
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let mut parser = Parser {
            text,
            chars: text.chars().collect(),
            pos: 0,
        };
        parser.skip_whitespace();
        let expression = parser.parse_filter()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(Self {
            text: text.trim().to_string(),
            expression,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The compiled expression; `this` is the filtered map or unit.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Evaluate against a map or unit value.
    pub fn matches(&self, target: &Value) -> Result<bool, ExpressionError> {
        let mut ctx = EvaluationContext::default();
        ctx.set_this(target.clone());
        self.expression.is_true(&mut ctx)
    }
}

impl fmt::Display for LdapFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    Approx,
    GreaterEqual,
    LessEqual,
}

struct Parser<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> ExpressionError {
        ExpressionError::InvalidFilter {
            filter: self.text.to_string(),
            position: self.pos,
            reason: reason.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ExpressionError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn parse_filter(&mut self) -> Result<Expression, ExpressionError> {
        self.expect('(')?;
        self.skip_whitespace();
        let expression = match self.peek() {
            Some('&') => {
                self.pos += 1;
                F::and(self.parse_filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                F::or(self.parse_filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_whitespace();
                F::not(self.parse_filter()?)
            }
            Some(_) => self.parse_item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(expression)
    }

    fn parse_filter_list(&mut self) -> Result<Vec<Expression>, ExpressionError> {
        let mut operands = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some('(') {
                break;
            }
            operands.push(self.parse_filter()?);
        }
        Ok(operands)
    }

    fn parse_item(&mut self) -> Result<Expression, ExpressionError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '<' | '>' | '~' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attribute: String = self.chars[start..self.pos].iter().collect();
        let attribute = attribute.trim().to_string();
        if attribute.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let operator = match (self.peek(), self.chars.get(self.pos + 1).copied()) {
            (Some('='), _) => {
                self.pos += 1;
                Operator::Equal
            }
            (Some('~'), Some('=')) => {
                self.pos += 2;
                Operator::Approx
            }
            (Some('>'), Some('=')) => {
                self.pos += 2;
                Operator::GreaterEqual
            }
            (Some('<'), Some('=')) => {
                self.pos += 2;
                Operator::LessEqual
            }
            _ => return Err(self.error("expected one of '=', '~=', '>=', '<='")),
        };

        // Each value char is tagged with whether it was escaped.
        let mut value: Vec<(char, bool)> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated filter value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in filter value")),
                Some('\\') => {
                    self.pos += 1;
                    let escaped = self
                        .peek()
                        .ok_or_else(|| self.error("dangling escape in filter value"))?;
                    value.push((escaped, true));
                    self.pos += 1;
                }
                Some(c) => {
                    value.push((c, false));
                    self.pos += 1;
                }
            }
        }

        let lhs = F::at(F::this_variable(), F::constant(attribute));
        let literal: String = value.iter().map(|(c, _)| *c).collect();
        let has_wildcard = value.iter().any(|(c, escaped)| *c == '*' && !escaped);
        // Only unescaped stars stay wildcards once the value becomes a pattern.
        let pattern: String = value
            .iter()
            .map(|(c, escaped)| {
                if *c == '*' && !escaped {
                    "*".to_string()
                } else {
                    SimplePattern::escape(&c.to_string())
                }
            })
            .collect();

        Ok(match operator {
            Operator::Equal if has_wildcard && value.len() == 1 => {
                F::not(F::equals(lhs, F::constant(Value::Null)))
            }
            Operator::Equal if has_wildcard => {
                F::matches(lhs, F::constant(SimplePattern::new(pattern)))
            }
            Operator::Equal => F::equals(lhs, F::constant(literal)),
            Operator::Approx => F::matches(
                lhs,
                F::constant(SimplePattern::case_insensitive(pattern.trim())),
            ),
            Operator::GreaterEqual => F::greater_equal(lhs, F::constant(typed_literal(&literal))),
            Operator::LessEqual => F::less_equal(lhs, F::constant(typed_literal(&literal))),
        })
    }
}

/// Ordering operands are typed so that `(size>=10)` compares numerically and
/// `(version>=1.2.0)` compares as versions.
fn typed_literal(literal: &str) -> Value {
    let trimmed = literal.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(v) = Version::parse(trimmed) {
        return Value::Version(v);
    }
    Value::String(literal.to_string())
}
