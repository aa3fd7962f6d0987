//! Runtime values produced and consumed by expression evaluation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use semver::{Version, VersionReq};

use crate::metadata::InstallableUnit;
use crate::properties::PropertyStore;

use super::filter::LdapFilter;

/// Type discriminant of a [`Value`], used as the member dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    Null,
    Bool,
    Integer,
    String,
    Version,
    VersionRange,
    Pattern,
    Filter,
    Unit,
    Map,
    Collection,
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Null => "null",
            TypeTag::Bool => "boolean",
            TypeTag::Integer => "integer",
            TypeTag::String => "string",
            TypeTag::Version => "version",
            TypeTag::VersionRange => "version range",
            TypeTag::Pattern => "pattern",
            TypeTag::Filter => "filter",
            TypeTag::Unit => "installable unit",
            TypeTag::Map => "map",
            TypeTag::Collection => "collection",
        };
        f.write_str(name)
    }
}

/// A dynamically typed evaluation value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
    Version(Version),
    VersionRange(VersionReq),
    Pattern(SimplePattern),
    Filter(Arc<LdapFilter>),
    Unit(InstallableUnit),
    Map(BTreeMap<String, String>),
    Collection(Vec<Value>),
}

impl Value {
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Bool,
            Value::Integer(_) => TypeTag::Integer,
            Value::String(_) => TypeTag::String,
            Value::Version(_) => TypeTag::Version,
            Value::VersionRange(_) => TypeTag::VersionRange,
            Value::Pattern(_) => TypeTag::Pattern,
            Value::Filter(_) => TypeTag::Filter,
            Value::Unit(_) => TypeTag::Unit,
            Value::Map(_) => TypeTag::Map,
            Value::Collection(_) => TypeTag::Collection,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_unit(&self) -> Option<&InstallableUnit> {
        match self {
            Value::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    /// Wrap a sequence of units as a collection value.
    pub fn units<I>(units: I) -> Self
    where
        I: IntoIterator<Item = InstallableUnit>,
    {
        Value::Collection(units.into_iter().map(Value::Unit).collect())
    }

    /// Copy a property store into a map value.
    pub fn from_properties(properties: &PropertyStore) -> Self {
        Value::Map(
            properties
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Version> for Value {
    fn from(value: Version) -> Self {
        Value::Version(value)
    }
}

impl From<VersionReq> for Value {
    fn from(value: VersionReq) -> Self {
        Value::VersionRange(value)
    }
}

impl From<SimplePattern> for Value {
    fn from(value: SimplePattern) -> Self {
        Value::Pattern(value)
    }
}

impl From<LdapFilter> for Value {
    fn from(value: LdapFilter) -> Self {
        Value::Filter(Arc::new(value))
    }
}

impl From<InstallableUnit> for Value {
    fn from(value: InstallableUnit) -> Self {
        Value::Unit(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
            Value::Version(v) => write!(f, "version('{}')", v),
            Value::VersionRange(r) => write!(f, "range('{}')", r),
            Value::Pattern(p) => write!(f, "/{}/", p.as_str()),
            Value::Filter(filter) => write!(f, "filter('{}')", filter.text()),
            Value::Unit(unit) => write!(f, "unit('{}')", unit),
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}' => '{}'", k, v)?;
                }
                f.write_str("}")
            }
            Value::Collection(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Equality with the string coercions filters rely on.
///
/// A string compared against an integer, boolean or version is parsed into
/// that type first; an unparseable string is simply unequal.
pub(crate) fn coerced_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::String(s), other) | (other, Value::String(s)) if other.tag() != TypeTag::String => {
            match other {
                Value::Integer(i) => s.trim().parse::<i64>().is_ok_and(|p| p == *i),
                Value::Bool(b) => s.trim().parse::<bool>().is_ok_and(|p| p == *b),
                Value::Version(v) => Version::parse(s.trim()).is_ok_and(|p| p == *v),
                _ => false,
            }
        }
        _ => lhs == rhs,
    }
}

/// Ordering with the same coercions as [`coerced_eq`].
///
/// Returns `None` when the two values have no common ordering.
pub(crate) fn coerced_cmp(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Version(a), Value::Version(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::String(s)) => s.trim().parse::<i64>().ok().map(|b| a.cmp(&b)),
        (Value::String(s), Value::Integer(b)) => s.trim().parse::<i64>().ok().map(|a| a.cmp(b)),
        (Value::Version(a), Value::String(s)) => {
            Version::parse(s.trim()).ok().map(|b| a.cmp(&b))
        }
        (Value::String(s), Value::Version(b)) => {
            Version::parse(s.trim()).ok().map(|a| a.cmp(b))
        }
        _ => None,
    }
}

/// Wildcard pattern supporting `*` (any run) and `?` (any single character).
/// A backslash makes the next character literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimplePattern {
    pattern: String,
    ignore_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    AnyRun,
    AnyChar,
    Literal(char),
}

impl SimplePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore_case: false,
        }
    }

    pub fn case_insensitive(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ignore_case: true,
        }
    }

    /// Escape `literal` so every character matches itself.
    pub fn escape(literal: &str) -> String {
        let mut escaped = String::with_capacity(literal.len());
        for c in literal.chars() {
            if matches!(c, '*' | '?' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        if self.ignore_case {
            let text: Vec<char> = candidate.to_lowercase().chars().collect();
            wildcard_match(&tokenize(&self.pattern.to_lowercase()), &text)
        } else {
            let text: Vec<char> = candidate.chars().collect();
            wildcard_match(&tokenize(&self.pattern), &text)
        }
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => Token::AnyRun,
            '?' => Token::AnyChar,
            // A trailing backslash matches itself.
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            other => Token::Literal(other),
        });
    }
    tokens
}

fn wildcard_match(pattern: &[Token], text: &[char]) -> bool {
    let (mut p, mut t) = (0usize, 0usize);
    // Position of the last `*` seen and the text index it currently covers up to.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(Token::AnyChar) => true,
            Some(Token::Literal(c)) => *c == text[t],
            _ => false,
        };
        if step {
            p += 1;
            t += 1;
        } else if pattern.get(p) == Some(&Token::AnyRun) {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, covered)) = backtrack {
            p = star + 1;
            t = covered + 1;
            backtrack = Some((star, covered + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|token| *token == Token::AnyRun)
}
