//! The generic incremental environment layer.
//!
//! An [`Environment`] caches the facts one [`Derivation`] produces over an
//! upstream layer, records which downstream consumer read which fact, and on
//! upstream change evicts exactly the entries whose upstream reads were
//! invalidated, reporting their readers as this layer's own triggered set.
//! The same machinery serves every derived layer of the checker, from class
//! metadata up through global-name resolution.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use sift_common::Name;
use sift_config::ProjectConfig;
use sift_scheduler::Scheduler;
use tracing::{debug, trace};

use crate::dependency::{DependencyKey, LayerId};
use crate::table::{partition_by_shard, EnvironmentStats, FactTable};
use crate::update::UpdateResult;
use crate::view::{ReadOnly, TrackedReads};

/// The query surface every environment layer exposes to the layer above it
/// and to the type-checking pass itself.
pub trait FactLookup: Send + Sync {
    /// The fact type this layer produces.
    type Fact: Send + Sync + 'static;

    /// Looks up (computing on demand where the layer derives facts) the fact
    /// for `key`.
    ///
    /// If `dependency` is given it is registered as a reader of `key` in
    /// this layer's reverse index, even on a cache hit, so a later change
    /// to the fact triggers the reader.
    fn fact(&self, dependency: Option<&DependencyKey>, key: Name) -> Option<Arc<Self::Fact>>;
}

/// How one layer derives its facts from the layer beneath it.
///
/// One implementation per layer, instantiated with the concrete upstream
/// type so the whole stack is known at compile time. The derivation value
/// itself carries whatever context the layer needs (an interner, resolution
/// tables); it must be pure with respect to upstream state: deriving the
/// same key twice against an unchanged upstream must produce the same fact.
pub trait Derivation: Send + Sync + 'static {
    /// The fact type this layer produces.
    type Fact: Send + Sync + 'static;
    /// The layer beneath this one.
    type Upstream: FactLookup;
    /// Which layer this derivation defines.
    const LAYER: LayerId;

    /// Derives the fact for `key`, or `None` if the key does not resolve.
    ///
    /// All upstream reads go through `upstream`, which tags them with this
    /// layer's identity and `key`; that registration is what lets upstream
    /// invalidation find this entry later. `None` is a legitimate, cacheable
    /// outcome, not an error.
    fn derive(&self, upstream: &TrackedReads<'_, Self::Upstream>, key: Name) -> Option<Self::Fact>;
}

/// One derived, incrementally maintained environment layer.
///
/// Owns its fact cache and reverse index; holds the upstream layer through a
/// shared handle and only ever reads it. All mutation happens inside
/// [`update`](Environment::update) and the lazy-fill path of fact lookup.
/// Readers always observe the state of the last completed update.
pub struct Environment<D: Derivation> {
    derivation: D,
    upstream: Arc<D::Upstream>,
    table: FactTable<D::Fact>,
    /// Held shared by queries and exclusively by updates. `try_*` only:
    /// contention is a driver protocol violation, answered with a panic
    /// rather than a possibly-inconsistent result.
    gate: RwLock<()>,
}

impl<D: Derivation> Environment<D> {
    /// Creates an empty environment over one upstream snapshot.
    pub fn create(derivation: D, upstream: Arc<D::Upstream>) -> Self {
        Self {
            derivation,
            upstream,
            table: FactTable::new(),
            gate: RwLock::new(()),
        }
    }

    /// A read-only view of this environment, valid while no update runs.
    pub fn read_only(&self) -> ReadOnly<'_, Self> {
        ReadOnly::new(self)
    }

    /// The upstream layer this environment derives from.
    pub fn upstream(&self) -> &D::Upstream {
        &self.upstream
    }

    /// Counts of cached facts and reverse-index edges.
    pub fn stats(&self) -> EnvironmentStats {
        self.table.stats()
    }

    /// Applies the upstream layer's update to this layer.
    ///
    /// Extracts the local cache entries named by the upstream triggered set,
    /// evicts them, and returns the union of their registered readers as
    /// this layer's own triggered set, wrapping `upstream_result` for
    /// provenance. Eviction only; nothing is recomputed until queried, so
    /// the cost is proportional to the change, not to the environment.
    ///
    /// An empty upstream triggered set is a no-op that leaves the cache and
    /// reverse index untouched.
    ///
    /// # Panics
    ///
    /// Panics if called while another update or any query on this
    /// environment is in flight.
    pub fn update(
        &self,
        scheduler: &Scheduler,
        config: &ProjectConfig,
        upstream_result: UpdateResult,
    ) -> UpdateResult {
        let Some(_guard) = self.gate.try_write() else {
            panic!(
                "update of {:?} environment started while queries or another update are in flight",
                D::LAYER
            );
        };

        let affected: Vec<Name> = upstream_result
            .triggered()
            .iter()
            .filter_map(|dep| dep.fact_of(D::LAYER))
            .collect();
        if affected.is_empty() {
            return UpdateResult::with_upstream(BTreeSet::new(), upstream_result);
        }

        let affected_count = affected.len();
        let drained = scheduler.map(partition_by_shard(affected), |keys| {
            let mut deps = BTreeSet::new();
            for key in keys {
                deps.append(&mut self.table.evict(key));
            }
            deps
        });

        let mut triggered = BTreeSet::new();
        for mut deps in drained {
            triggered.append(&mut deps);
        }
        debug!(
            layer = ?D::LAYER,
            affected = affected_count,
            triggered = triggered.len(),
            "incremental update"
        );
        if config.check.debug {
            debug!(layer = ?D::LAYER, keys = ?triggered, "triggered dependency keys");
        }
        UpdateResult::with_upstream(triggered, upstream_result)
    }
}

impl<D: Derivation> FactLookup for Environment<D> {
    type Fact = D::Fact;

    fn fact(&self, dependency: Option<&DependencyKey>, key: Name) -> Option<Arc<D::Fact>> {
        let Some(_guard) = self.gate.try_read() else {
            panic!("{:?} environment queried during update", D::LAYER);
        };

        if let Some(dep) = dependency {
            self.table.record(key, dep);
        }

        let cell = self.table.fact_cell(key);
        cell.get_or_init(|| {
            trace!(layer = ?D::LAYER, key = key.as_raw(), "fact cache miss");
            let reason = DependencyKey::LayerFact {
                layer: D::LAYER,
                key,
            };
            let reads = TrackedReads::new(self.upstream.as_ref(), reason);
            self.derivation.derive(&reads, key).map(Arc::new)
        })
        .clone()
    }
}
