//! Filter declarations and the per-type resolved chain.
//!
//! An action type declares its filters as a list of [`FilterLevel`]s, root
//! first. Each level names the filters it wants to run before and after the
//! responder and may define filter functions. Levels accumulate: a leaf extends
//! the names declared by its ancestors rather than replacing them.
//!
//! Resolving a chain flattens the names root to leaf, keeps the first
//! occurrence of each, and binds every name to the most-derived definition. A
//! name without a definition anywhere in the hierarchy is a configuration
//! error. Resolved chains are cached per concrete action type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use indexmap::{IndexMap, IndexSet};
use trellis_core::{Payload, TrellisError, TrellisResult};

use crate::action::Action;
use crate::context::ActionContext;

/// What a filter yields: `Some` to render that payload and halt the phase.
pub type FilterResult = TrellisResult<Option<Payload>>;

/// A filter bound to an action type.
///
/// Write filters as methods returning a boxed future:
///
/// ```
/// use futures_util::future::{BoxFuture, FutureExt};
/// use trellis_action::{ActionContext, FilterResult};
///
/// struct Books;
///
/// impl Books {
///     fn authenticate<'a>(&'a mut self, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
///         async move { Ok(None) }.boxed()
///     }
/// }
/// ```
pub type FilterFn<A> = for<'a> fn(&'a mut A, &'a mut ActionContext) -> BoxFuture<'a, FilterResult>;

/// One level of an action's hierarchy.
///
/// # Example
///
/// ```
/// use futures_util::future::{BoxFuture, FutureExt};
/// use trellis_action::{ActionContext, FilterLevel, FilterResult};
///
/// struct Books;
///
/// impl Books {
///     fn audit<'a>(&'a mut self, _cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
///         async move { Ok(None) }.boxed()
///     }
/// }
///
/// let level = FilterLevel::<Books>::new("books")
///     .after(["audit"])
///     .filter("audit", Books::audit);
/// assert_eq!(level.after_names(), ["audit"]);
/// ```
pub struct FilterLevel<A> {
    name: &'static str,
    before: Vec<&'static str>,
    after: Vec<&'static str>,
    filters: Vec<(&'static str, FilterFn<A>)>,
}

impl<A> FilterLevel<A> {
    /// Creates an empty level. The name only shows up in diagnostics.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            before: Vec::new(),
            after: Vec::new(),
            filters: Vec::new(),
        }
    }

    /// Declares before-filters, in order.
    #[must_use]
    pub fn before<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.before.extend(names);
        self
    }

    /// Declares after-filters, in order.
    #[must_use]
    pub fn after<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.after.extend(names);
        self
    }

    /// Defines the function behind a filter name.
    #[must_use]
    pub fn filter(mut self, name: &'static str, filter: FilterFn<A>) -> Self {
        self.filters.push((name, filter));
        self
    }

    /// Returns the level name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the before-filter names this level declares.
    #[must_use]
    pub fn before_names(&self) -> &[&'static str] {
        &self.before
    }

    /// Returns the after-filter names this level declares.
    #[must_use]
    pub fn after_names(&self) -> &[&'static str] {
        &self.after
    }
}

impl<A> fmt::Debug for FilterLevel<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterLevel")
            .field("name", &self.name)
            .field("before", &self.before)
            .field("after", &self.after)
            .field(
                "filters",
                &self.filters.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A resolved filter: its name and the function it is bound to.
pub struct BoundFilter<A> {
    name: &'static str,
    filter: FilterFn<A>,
}

impl<A> BoundFilter<A> {
    /// Returns the filter name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes the filter.
    pub fn call<'a>(&self, action: &'a mut A, cx: &'a mut ActionContext) -> BoxFuture<'a, FilterResult> {
        (self.filter)(action, cx)
    }
}

impl<A> Clone for BoundFilter<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            filter: self.filter,
        }
    }
}

impl<A> fmt::Debug for BoundFilter<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundFilter").field(&self.name).finish()
    }
}

/// The flattened before and after filters of one action type.
pub struct FilterChain<A> {
    before: Vec<BoundFilter<A>>,
    after: Vec<BoundFilter<A>>,
}

type ChainCache = DashMap<TypeId, Arc<dyn Any + Send + Sync>>;

fn chain_cache() -> &'static ChainCache {
    static CACHE: OnceLock<ChainCache> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

impl<A: Action> FilterChain<A> {
    /// Returns the cached chain for `A`, resolving it on first use.
    ///
    /// Resolution failures are not cached, so a misconfigured action fails
    /// on every request rather than only the first.
    pub fn of() -> TrellisResult<Arc<Self>> {
        let key = TypeId::of::<A>();
        if let Some(cached) = chain_cache().get(&key) {
            if let Ok(chain) = Arc::clone(cached.value()).downcast::<Self>() {
                return Ok(chain);
            }
        }

        let resolved: Arc<dyn Any + Send + Sync> = Arc::new(Self::resolve(&A::levels())?);
        let stored = Arc::clone(chain_cache().entry(key).or_insert(resolved).value());
        stored.downcast::<Self>().map_err(|_| {
            TrellisError::internal(format!(
                "filter chain cache holds a foreign entry for `{}`",
                std::any::type_name::<A>()
            ))
        })
    }
}

impl<A> FilterChain<A> {
    /// Resolves a chain from levels ordered root to leaf, bypassing the cache.
    pub fn resolve(levels: &[FilterLevel<A>]) -> TrellisResult<Self> {
        let mut definitions: IndexMap<&'static str, FilterFn<A>> = IndexMap::new();
        let mut before = IndexSet::new();
        let mut after = IndexSet::new();

        for level in levels {
            for (name, filter) in &level.filters {
                definitions.insert(*name, *filter);
            }
            before.extend(level.before.iter().copied());
            after.extend(level.after.iter().copied());
        }

        let bind = |names: IndexSet<&'static str>| -> TrellisResult<Vec<BoundFilter<A>>> {
            names
                .into_iter()
                .map(|name| {
                    let filter = definitions.get(name).copied().ok_or_else(|| {
                        let declared_by = levels
                            .iter()
                            .find(|level| level.before.contains(&name) || level.after.contains(&name))
                            .map_or("<unknown>", FilterLevel::name);
                        TrellisError::configuration(format!(
                            "`{declared_by}` declares filter `{name}`, but no level defines it"
                        ))
                    })?;
                    Ok(BoundFilter { name, filter })
                })
                .collect()
        };

        Ok(Self {
            before: bind(before)?,
            after: bind(after)?,
        })
    }

    /// Returns the before-filters in run order.
    #[must_use]
    pub fn before(&self) -> &[BoundFilter<A>] {
        &self.before
    }

    /// Returns the after-filters in run order.
    #[must_use]
    pub fn after(&self) -> &[BoundFilter<A>] {
        &self.after
    }

    /// Returns the before-filter names in run order.
    #[must_use]
    pub fn before_names(&self) -> Vec<&'static str> {
        self.before.iter().map(BoundFilter::name).collect()
    }

    /// Returns the after-filter names in run order.
    #[must_use]
    pub fn after_names(&self) -> Vec<&'static str> {
        self.after.iter().map(BoundFilter::name).collect()
    }
}

impl<A> fmt::Debug for FilterChain<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("before", &self.before_names())
            .field("after", &self.after_names())
            .finish()
    }
}
