//! Expression tree nodes.
//!
//! Nodes are immutable values with structural equality and hashing, so a
//! frozen [`MatchExpression`](super::MatchExpression) can serve as a cache key.
//! Build them through [`ExpressionFactory`](super::ExpressionFactory), which
//! applies the algebraic simplifications the evaluator relies on.

use std::fmt;

use super::member::Accessor;
use super::value::Value;

/// Name of the variable bound to the current candidate.
pub const VARIABLE_THIS: &str = "this";

/// Name of the variable bound to the whole candidate collection.
pub const VARIABLE_EVERYTHING: &str = "everything";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Literal(Value),
    Variable(String),
    /// Positional lookup in the context's parameter list.
    Parameter(usize),
    Member(Member),
    At {
        target: Box<Expression>,
        key: Box<Expression>,
    },
    Equals {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        negate: bool,
    },
    /// `less` / `equal_ok` encode `<`, `<=`, `>` and `>=`. `unordered` is
    /// the result when the operands have no common ordering (a missing value
    /// or incomparable types); negation flips it with the other two flags.
    Compare {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        less: bool,
        equal_ok: bool,
        unordered: bool,
    },
    Not(Box<Expression>),
    And(Vec<Expression>),
    Or(Vec<Expression>),
    All {
        collection: Box<Expression>,
        lambda: Lambda,
    },
    Exists {
        collection: Box<Expression>,
        lambda: Lambda,
    },
    Matches {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

impl Expression {
    /// The shared `true` literal.
    pub const TRUE: Expression = Expression::Literal(Value::Bool(true));

    pub const FALSE: Expression = Expression::Literal(Value::Bool(false));

    pub fn is_true_literal(&self) -> bool {
        matches!(self, Expression::Literal(Value::Bool(true)))
    }

    /// Binding strength used when printing; higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            Expression::Or(_) => 1,
            Expression::And(_) => 2,
            Expression::Equals { .. } | Expression::Compare { .. } | Expression::Matches { .. } => 3,
            Expression::Not(_) => 4,
            _ => 5,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() <= parent {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// A variable bound per element by a quantifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Lambda {
    pub variable: String,
    pub body: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Member {
    pub target: Box<Expression>,
    pub kind: MemberKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Built-in `empty` pseudo-member.
    Empty,
    /// Built-in `length` pseudo-member.
    Length,
    /// Registry-dispatched member. `accessor` is filled in at build time when
    /// the target's type is known.
    Dynamic {
        name: String,
        accessor: Option<Accessor>,
    },
}

impl MemberKind {
    pub fn name(&self) -> &str {
        match self {
            MemberKind::Empty => "empty",
            MemberKind::Length => "length",
            MemberKind::Dynamic { name, .. } => name,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let own = self.precedence();
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Variable(name) => f.write_str(name),
            Expression::Parameter(index) => write!(f, "${}", index),
            Expression::Member(member) => {
                member.target.fmt_operand(f, 4)?;
                write!(f, ".{}", member.kind.name())
            }
            Expression::At { target, key } => {
                target.fmt_operand(f, 4)?;
                write!(f, "[{}]", key)
            }
            Expression::Equals { lhs, rhs, negate } => {
                lhs.fmt_operand(f, own)?;
                f.write_str(if *negate { " != " } else { " == " })?;
                rhs.fmt_operand(f, own)
            }
            Expression::Compare {
                lhs,
                rhs,
                less,
                equal_ok,
                unordered,
            } => {
                // Negated comparisons print as `!(positive form)`.
                let (less, equal_ok) = if *unordered {
                    (!less, !equal_ok)
                } else {
                    (*less, *equal_ok)
                };
                let op = match (less, equal_ok) {
                    (true, false) => " < ",
                    (true, true) => " <= ",
                    (false, false) => " > ",
                    (false, true) => " >= ",
                };
                if *unordered {
                    f.write_str("!(")?;
                }
                lhs.fmt_operand(f, own)?;
                f.write_str(op)?;
                rhs.fmt_operand(f, own)?;
                if *unordered {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Expression::Not(operand) => {
                f.write_str("!")?;
                operand.fmt_operand(f, own)
            }
            Expression::And(operands) | Expression::Or(operands) => {
                let sep = if matches!(self, Expression::And(_)) {
                    " && "
                } else {
                    " || "
                };
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    operand.fmt_operand(f, own)?;
                }
                Ok(())
            }
            Expression::All { collection, lambda } => {
                collection.fmt_operand(f, 4)?;
                write!(f, ".all({} | {})", lambda.variable, lambda.body)
            }
            Expression::Exists { collection, lambda } => {
                collection.fmt_operand(f, 4)?;
                write!(f, ".exists({} | {})", lambda.variable, lambda.body)
            }
            Expression::Matches { lhs, rhs } => {
                lhs.fmt_operand(f, own)?;
                f.write_str(" ~= ")?;
                rhs.fmt_operand(f, own)
            }
        }
    }
}
