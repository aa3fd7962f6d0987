//! Queries over installable units.
//!
//! Query kinds form a closed enum. A profile-scoped query needs the profile it
//! runs against; [`Query::perform`] takes it as an argument and passes it down
//! through composites, so no query object ever holds a profile reference.

pub mod result;

use indexmap::IndexSet;
use tracing::debug;

use crate::expression::{ContextExpression, MatchExpression, Value};
use crate::metadata::InstallableUnit;
use crate::profile::Profile;

pub use result::QueryResult;

type Units<'a> = Box<dyn Iterator<Item = InstallableUnit> + 'a>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Every candidate.
    Everything,
    /// Candidates for which the expression holds with `this` bound to them.
    Match(MatchExpression),
    /// A selector evaluated once with `everything` bound to all candidates.
    Context(ContextQuery),
    Composite(CompositeQuery),
    /// Units carrying a per-unit profile property.
    ProfileProperty(ProfilePropertyQuery),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextQuery {
    pub expression: ContextExpression,
    pub parameters: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Each query runs over the output of the previous one.
    Pipe,
    /// Candidates matched by every query.
    Intersection,
    /// Candidates matched by any query, in query order.
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeQuery {
    pub kind: CompositeKind,
    pub queries: Vec<Query>,
}

/// Matches units whose per-unit profile property `key` is set, and equal to
/// `value` when one is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePropertyQuery {
    pub key: String,
    pub value: Option<String>,
}

impl Query {
    pub fn context(expression: ContextExpression, parameters: Vec<Value>) -> Self {
        Query::Context(ContextQuery {
            expression,
            parameters,
        })
    }

    pub fn pipe(queries: Vec<Query>) -> Self {
        Query::Composite(CompositeQuery {
            kind: CompositeKind::Pipe,
            queries,
        })
    }

    pub fn intersection(queries: Vec<Query>) -> Self {
        Query::Composite(CompositeQuery {
            kind: CompositeKind::Intersection,
            queries,
        })
    }

    pub fn union(queries: Vec<Query>) -> Self {
        Query::Composite(CompositeQuery {
            kind: CompositeKind::Union,
            queries,
        })
    }

    pub fn profile_property(key: impl Into<String>, value: Option<&str>) -> Self {
        Query::ProfileProperty(ProfilePropertyQuery {
            key: key.into(),
            value: value.map(str::to_string),
        })
    }

    /// Whether a profile should feed this query the units that carry per-unit
    /// properties rather than its member units.
    pub fn targets_unit_properties(&self) -> bool {
        matches!(self, Query::ProfileProperty(_))
    }

    /// Run the query over `candidates`.
    ///
    /// Evaluation errors count as a non-match for the candidate concerned and
    /// are logged at debug level.
    pub fn perform<'a>(&'a self, candidates: Units<'a>, profile: Option<&'a Profile>) -> Units<'a> {
        match self {
            Query::Everything => candidates,
            Query::Match(expression) => {
                let mut ctx = expression.create_context();
                Box::new(candidates.filter(move |unit| {
                    match expression.is_match_in(&mut ctx, &Value::Unit(unit.clone())) {
                        Ok(matched) => matched,
                        Err(err) => {
                            debug!(unit = %unit, error = %err, "match expression failed");
                            false
                        }
                    }
                }))
            }
            Query::Context(query) => Box::new(perform_context(query, candidates).into_iter()),
            Query::Composite(composite) => perform_composite(composite, candidates, profile),
            Query::ProfileProperty(query) => {
                let Some(profile) = profile else {
                    debug!(key = %query.key, "profile property query run without a profile");
                    return Box::new(std::iter::empty());
                };
                Box::new(candidates.filter(move |unit| {
                    match profile.installable_unit_property(unit, &query.key) {
                        Some(found) => query.value.as_deref().is_none_or(|v| v == found),
                        None => false,
                    }
                }))
            }
        }
    }
}

fn perform_context(query: &ContextQuery, candidates: Units<'_>) -> Vec<InstallableUnit> {
    let everything = Value::units(candidates);
    match query
        .expression
        .evaluate(query.parameters.clone(), everything)
    {
        Ok(Value::Collection(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Unit(unit) => Some(unit),
                _ => None,
            })
            .collect(),
        Ok(Value::Unit(unit)) => vec![unit],
        Ok(other) => {
            debug!(found = %other.tag(), "context query did not select units");
            Vec::new()
        }
        Err(err) => {
            debug!(error = %err, "context query failed");
            Vec::new()
        }
    }
}

fn perform_composite<'a>(
    composite: &'a CompositeQuery,
    candidates: Units<'a>,
    profile: Option<&'a Profile>,
) -> Units<'a> {
    match composite.kind {
        CompositeKind::Pipe => composite
            .queries
            .iter()
            .fold(candidates, |units, query| query.perform(units, profile)),
        CompositeKind::Intersection => {
            let all: Vec<InstallableUnit> = candidates.collect();
            let matched: Vec<IndexSet<InstallableUnit>> = composite
                .queries
                .iter()
                .map(|query| query.perform(Box::new(all.clone().into_iter()), profile).collect())
                .collect();
            Box::new(
                all.into_iter()
                    .filter(move |unit| matched.iter().all(|set| set.contains(unit))),
            )
        }
        CompositeKind::Union => {
            let all: Vec<InstallableUnit> = candidates.collect();
            let mut matched = IndexSet::new();
            for query in &composite.queries {
                matched.extend(query.perform(Box::new(all.clone().into_iter()), profile));
            }
            Box::new(matched.into_iter())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExpressionFactory as F;
    use semver::Version;

    fn units() -> Vec<InstallableUnit> {
        ["a", "b", "c"]
            .iter()
            .map(|id| InstallableUnit::builder(*id, Version::new(1, 0, 0)).build())
            .collect()
    }

    fn id_is(id: &str) -> Query {
        Query::Match(
            F::match_expression(
                F::equals(F::member(F::this_variable(), "id"), F::indexed_parameter(0)),
                vec![Value::from(id)],
            )
            .unwrap(),
        )
    }

    fn ids(query: &Query) -> Vec<String> {
        query
            .perform(Box::new(units().into_iter()), None)
            .map(|u| u.id().to_string())
            .collect()
    }

    #[test]
    fn match_query_filters_candidates() {
        assert_eq!(ids(&id_is("b")), vec!["b"]);
        assert_eq!(ids(&Query::Everything), vec!["a", "b", "c"]);
    }

    #[test]
    fn composites_combine_results() {
        assert_eq!(ids(&Query::union(vec![id_is("c"), id_is("a")])), vec!["c", "a"]);
        assert!(ids(&Query::intersection(vec![id_is("a"), id_is("b")])).is_empty());
        assert_eq!(ids(&Query::pipe(vec![Query::Everything, id_is("a")])), vec!["a"]);
    }

    #[test]
    fn context_query_selects_from_everything() {
        let limit = F::context_expression(F::everything_variable()).unwrap();
        assert_eq!(ids(&Query::context(limit, vec![])).len(), 3);
    }

    #[test]
    fn profile_property_query_without_profile_is_empty() {
        assert!(ids(&Query::profile_property("root", None)).is_empty());
    }
}
