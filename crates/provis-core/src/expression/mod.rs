//! Predicate and selector expressions over units and property maps.
//!
//! Trees are built with [`ExpressionFactory`], bound either as a
//! [`MatchExpression`] (frozen parameters, evaluated per candidate) or as a
//! [`ContextExpression`] (evaluated once over `everything`), and evaluated
//! against an [`EvaluationContext`].

pub mod ast;
pub mod bound;
pub mod context;
mod eval;
pub mod factory;
pub mod filter;
pub mod member;
pub mod value;

pub use ast::{Expression, Lambda, Member, MemberKind, VARIABLE_EVERYTHING, VARIABLE_THIS};
pub use bound::{AnyExpression, ContextExpression, MatchExpression};
pub use context::EvaluationContext;
pub use factory::{ExpressionFactory, Junction};
pub use filter::LdapFilter;
pub use member::{Accessor, MemberRegistry};
pub use value::{SimplePattern, TypeTag, Value};

/// Errors raised while building or evaluating expressions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    /// Wrong binding mode handed to a conversion.
    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    #[error("parameter ${index} out of range ({len} supplied)")]
    ParameterOutOfRange { index: usize, len: usize },

    #[error("no member '{name}' on {tag}")]
    NoSuchMember { name: String, tag: TypeTag },

    #[error("cannot apply '{operation}' to {lhs} and {rhs}")]
    TypeMismatch {
        operation: &'static str,
        lhs: TypeTag,
        rhs: TypeTag,
    },

    #[error("'{expression}' evaluated to {found}, expected a boolean")]
    NotBoolean { expression: String, found: TypeTag },

    #[error("'{expression}' evaluated to {found}, expected a collection")]
    NotCollection { expression: String, found: TypeTag },

    #[error("invalid filter '{filter}' at offset {position}: {reason}")]
    InvalidFilter {
        filter: String,
        position: usize,
        reason: String,
    },
}
