//! Lazy, restartable query results.

use std::cell::OnceCell;
use std::fmt;
use std::hash::Hash;

use indexmap::IndexSet;

type Source<'a, T> = Box<dyn Fn() -> Box<dyn Iterator<Item = T> + 'a> + 'a>;

/// The matches of a query.
///
/// Nothing is evaluated until the result is iterated, and every call to
/// [`iter`](Self::iter) starts a fresh pass over the underlying source. The
/// source may be unbounded; only [`to_set`](Self::to_set),
/// [`to_vec`](Self::to_vec) and [`unmodifiable_set`](Self::unmodifiable_set)
/// drain it.
pub struct QueryResult<'a, T> {
    source: Source<'a, T>,
    view: OnceCell<IndexSet<T>>,
}

impl<'a, T> QueryResult<'a, T>
where
    T: Clone + Eq + Hash + 'a,
{
    pub fn new<F, I>(source: F) -> Self
    where
        F: Fn() -> I + 'a,
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
    {
        Self {
            source: Box::new(move || Box::new(source().into_iter())),
            view: OnceCell::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty)
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::new(move || items.clone())
    }

    /// Pulls at most one element from the source.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = T> + 'a> {
        (self.source)()
    }

    /// A detached copy of the matches, in iteration order without duplicates.
    pub fn to_set(&self) -> IndexSet<T> {
        self.iter().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// A read-only view, materialized on first use and cached afterwards.
    pub fn unmodifiable_set(&self) -> &IndexSet<T> {
        self.view.get_or_init(|| self.to_set())
    }
}

impl<T> fmt::Debug for QueryResult<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("materialized", &self.view.get().is_some())
            .finish_non_exhaustive()
    }
}
