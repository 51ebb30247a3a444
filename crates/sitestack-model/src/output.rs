//! Deferred values.
//!
//! An [`Output<T>`] is a value that may only become known after some other
//! resources have been applied. It carries the set of resources it reads so
//! that a dependency edge can be derived from every property reference, and
//! a resolver that computes the value from an [`OutputContext`] once those
//! resources have published their attributes.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::error::ModelError;
use crate::urn::Urn;

/// Attributes published by a provider for one applied resource.
pub type Attributes = BTreeMap<String, String>;

/// Attributes of every resource applied so far, keyed by URN.
#[derive(Debug, Clone, Default)]
pub struct OutputContext {
    resources: HashMap<Urn, Attributes>,
}

impl OutputContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the attributes of an applied resource.
    pub fn insert(&mut self, urn: Urn, attributes: Attributes) {
        self.resources.insert(urn, attributes);
    }

    /// Forget a resource, making every value that reads it unknown again.
    pub fn remove(&mut self, urn: &Urn) -> Option<Attributes> {
        self.resources.remove(urn)
    }

    /// Attributes of a resource, if it has been applied.
    #[must_use]
    pub fn get(&self, urn: &Urn) -> Option<&Attributes> {
        self.resources.get(urn)
    }

    /// Whether the resource has been applied.
    #[must_use]
    pub fn contains(&self, urn: &Urn) -> bool {
        self.resources.contains_key(urn)
    }
}

type Resolver<T> = Arc<dyn Fn(&OutputContext) -> Result<T, ModelError> + Send + Sync>;

/// A deferred value together with the resources it depends on.
pub struct Output<T> {
    dependencies: BTreeSet<Urn>,
    resolver: Resolver<T>,
}

impl<T> Clone for Output<T> {
    fn clone(&self) -> Self {
        Self {
            dependencies: self.dependencies.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> Output<T> {
    /// A value that is known at declaration time.
    #[must_use]
    pub fn known(value: T) -> Self {
        Self {
            dependencies: BTreeSet::new(),
            resolver: Arc::new(move |_| Ok(value.clone())),
        }
    }
}

impl Output<String> {
    /// An attribute of another resource, known once that resource is applied.
    #[must_use]
    pub fn attribute(urn: Urn, name: impl Into<String>) -> Self {
        let name = name.into();
        let dependencies = BTreeSet::from([urn.clone()]);
        Self {
            dependencies,
            resolver: Arc::new(move |ctx| {
                let attributes = ctx.get(&urn).ok_or_else(|| ModelError::Unknown {
                    urn: urn.clone(),
                })?;
                attributes
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| ModelError::MissingAttribute {
                        urn: urn.clone(),
                        attribute: name.clone(),
                    })
            }),
        }
    }
}

impl<T: 'static> Output<T> {
    /// Transform the value once it is known. Dependencies are preserved.
    #[must_use]
    pub fn apply<U, F>(self, f: F) -> Output<U>
    where
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = self.resolver;
        Output {
            dependencies: self.dependencies,
            resolver: Arc::new(move |ctx| inner(ctx).map(&f)),
        }
    }

    /// Fallible variant of [`apply`](Self::apply).
    #[must_use]
    pub fn try_apply<U, F>(self, f: F) -> Output<U>
    where
        F: Fn(T) -> Result<U, ModelError> + Send + Sync + 'static,
    {
        let inner = self.resolver;
        Output {
            dependencies: self.dependencies,
            resolver: Arc::new(move |ctx| inner(ctx).and_then(&f)),
        }
    }

    /// Combine two deferred values; the result depends on both.
    #[must_use]
    pub fn zip<U: 'static>(self, other: Output<U>) -> Output<(T, U)> {
        let mut dependencies = self.dependencies;
        dependencies.extend(other.dependencies);
        let left = self.resolver;
        let right = other.resolver;
        Output {
            dependencies,
            resolver: Arc::new(move |ctx| Ok((left(ctx)?, right(ctx)?))),
        }
    }

    /// Resources this value reads from.
    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<Urn> {
        &self.dependencies
    }

    /// Compute the value from the attributes applied so far.
    ///
    /// # Errors
    /// Returns [`ModelError::Unknown`] while any dependency is unapplied, or
    /// whatever error a transform produced.
    pub fn resolve(&self, ctx: &OutputContext) -> Result<T, ModelError> {
        (self.resolver)(ctx)
    }
}
