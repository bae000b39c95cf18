//! Read-only query surfaces over environment layers.

use std::sync::Arc;

use sift_common::Name;

use crate::dependency::DependencyKey;
use crate::environment::{Derivation, Environment, FactLookup};

/// A read-only view of an environment layer.
///
/// Cheap to copy and safe to hand to concurrent workers. Queries observe the
/// environment as of the last completed update; dependency registration is
/// forwarded to the owning environment, which is where the recording side
/// effect lives. Querying through a view while the owning environment is
/// mid-update is a contract violation and panics.
pub struct ReadOnly<'e, E: ?Sized> {
    env: &'e E,
}

impl<E: ?Sized> Clone for ReadOnly<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for ReadOnly<'_, E> {}

impl<'e, E: ?Sized> ReadOnly<'e, E> {
    pub(crate) fn new(env: &'e E) -> Self {
        Self { env }
    }
}

impl<E: FactLookup> ReadOnly<'_, E> {
    /// Looks up the fact for `key`, computing it on demand.
    ///
    /// If `dependency` is given it is registered as a reader of `key`,
    /// even on a cache hit, so a later change to the fact triggers it.
    pub fn fact(&self, dependency: Option<&DependencyKey>, key: Name) -> Option<Arc<E::Fact>> {
        self.env.fact(dependency, key)
    }
}

impl<'e, D: Derivation> ReadOnly<'e, Environment<D>> {
    /// A view of the upstream layer, for callers chaining queries across
    /// layers without re-deriving handles.
    pub fn upstream(self) -> ReadOnly<'e, D::Upstream> {
        ReadOnly::new(self.env.upstream())
    }
}

/// Upstream reads made on behalf of one local cache entry.
///
/// Every read through this wrapper is tagged with the owning layer's
/// [`DependencyKey::LayerFact`] for the entry being derived, so the upstream
/// layer knows exactly which local entries to name when its facts change.
/// Derivations receive all upstream access through this type; there is no
/// untagged path.
pub struct TrackedReads<'a, U: FactLookup> {
    upstream: &'a U,
    reason: DependencyKey,
}

impl<'a, U: FactLookup> TrackedReads<'a, U> {
    pub(crate) fn new(upstream: &'a U, reason: DependencyKey) -> Self {
        Self { upstream, reason }
    }

    /// Reads an upstream fact, registering this derivation as its reader.
    pub fn fact(&self, key: Name) -> Option<Arc<U::Fact>> {
        self.upstream.fact(Some(&self.reason), key)
    }
}
