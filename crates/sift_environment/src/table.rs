//! Sharded storage for cached facts and the reverse dependency index.
//!
//! One `FactTable` backs one environment layer. It holds the query-key →
//! fact cache (with explicit absent entries) and the query-key → set of
//! dependency keys reverse index that invalidation fans out through. Both
//! maps are sharded by query key so update partitions touch disjoint locks.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use sift_common::Name;

use crate::dependency::DependencyKey;

/// Number of shards per table. Power of two so shard selection is a mask.
const SHARD_COUNT: usize = 16;

/// A lazily computed fact slot.
///
/// The inner `Option` is the cached result: `Some(fact)` or an explicit
/// "known absent". The `OnceLock` gives per-key single-flight: concurrent
/// misses on the same key block on one computation.
pub(crate) type FactCell<F> = Arc<OnceLock<Option<Arc<F>>>>;

struct Shard<F> {
    facts: RwLock<HashMap<Name, FactCell<F>>>,
    readers: RwLock<HashMap<Name, BTreeSet<DependencyKey>>>,
}

impl<F> Shard<F> {
    fn new() -> Self {
        Self {
            facts: RwLock::new(HashMap::new()),
            readers: RwLock::new(HashMap::new()),
        }
    }
}

/// Counts describing one environment layer's cached state.
///
/// Used for introspection and by tests asserting that a no-op update leaves
/// the table untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvironmentStats {
    /// Number of cached facts, explicit absences included.
    pub cached_facts: usize,
    /// Total number of (query key, dependency key) edges in the reverse index.
    pub dependency_edges: usize,
}

/// Groups query keys by table shard.
///
/// Each returned partition maps to a single shard, so an update can hand
/// partitions to separate workers without two workers contending on one
/// shard lock.
pub(crate) fn partition_by_shard(keys: Vec<Name>) -> Vec<Vec<Name>> {
    let mut partitions: Vec<Vec<Name>> = (0..SHARD_COUNT).map(|_| Vec::new()).collect();
    for key in keys {
        partitions[shard_index(key)].push(key);
    }
    partitions.retain(|p| !p.is_empty());
    partitions
}

fn shard_index(key: Name) -> usize {
    key.as_raw() as usize & (SHARD_COUNT - 1)
}

pub(crate) struct FactTable<F> {
    shards: Box<[Shard<F>]>,
}

impl<F> FactTable<F> {
    pub(crate) fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Shard::new()).collect(),
        }
    }

    fn shard(&self, key: Name) -> &Shard<F> {
        &self.shards[shard_index(key)]
    }

    /// Returns the fact cell for `key`, inserting an empty one if absent.
    ///
    /// Callers complete the cell with `OnceLock::get_or_init`; every caller
    /// racing on the same key receives the same cell.
    pub(crate) fn fact_cell(&self, key: Name) -> FactCell<F> {
        let shard = self.shard(key);
        if let Some(cell) = shard.facts.read().get(&key) {
            return Arc::clone(cell);
        }
        Arc::clone(shard.facts.write().entry(key).or_default())
    }

    /// Returns the completed cached result for `key`, if any.
    ///
    /// `None` means "not cached" (never computed, or evicted, or still being
    /// computed); `Some(None)` is a cached explicit absence.
    pub(crate) fn peek(&self, key: Name) -> Option<Option<Arc<F>>> {
        let shard = self.shard(key);
        let facts = shard.facts.read();
        facts.get(&key).and_then(|cell| cell.get().cloned())
    }

    /// Replaces the cached result for `key` with a completed value.
    ///
    /// Used by the root layer, whose facts are published by the driver
    /// rather than derived on demand.
    pub(crate) fn publish(&self, key: Name, fact: Option<Arc<F>>) {
        let cell = OnceLock::new();
        let _ = cell.set(fact);
        self.shard(key).facts.write().insert(key, Arc::new(cell));
    }

    /// Registers `dependency` as a reader of `key`.
    ///
    /// Happens on every dependency-tagged query, cache hit or miss.
    pub(crate) fn record(&self, key: Name, dependency: &DependencyKey) {
        self.shard(key)
            .readers
            .write()
            .entry(key)
            .or_default()
            .insert(*dependency);
    }

    /// Evicts the cached fact for `key` and drains its reverse-index entry.
    ///
    /// Returns the dependency keys that were registered against `key`.
    /// Recomputation re-registers readers fresh as queries recur.
    pub(crate) fn evict(&self, key: Name) -> BTreeSet<DependencyKey> {
        let shard = self.shard(key);
        shard.facts.write().remove(&key);
        shard.readers.write().remove(&key).unwrap_or_default()
    }

    /// Counts completed cache entries and reverse-index edges.
    pub(crate) fn stats(&self) -> EnvironmentStats {
        let mut cached_facts = 0;
        let mut dependency_edges = 0;
        for shard in self.shards.iter() {
            cached_facts += shard
                .facts
                .read()
                .values()
                .filter(|cell| cell.get().is_some())
                .count();
            dependency_edges += shard.readers.read().values().map(BTreeSet::len).sum::<usize>();
        }
        EnvironmentStats {
            cached_facts,
            dependency_edges,
        }
    }
}

impl<F> Default for FactTable<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::LayerId;

    fn dep(raw: u32) -> DependencyKey {
        DependencyKey::CheckModule(Name::from_raw(raw))
    }

    #[test]
    fn fact_cell_is_shared_across_lookups() {
        let table: FactTable<u32> = FactTable::new();
        let key = Name::from_raw(1);
        let a = table.fact_cell(key);
        let b = table.fact_cell(key);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn peek_sees_completed_cells_only() {
        let table: FactTable<u32> = FactTable::new();
        let key = Name::from_raw(1);
        let cell = table.fact_cell(key);
        assert_eq!(table.peek(key), None);
        cell.get_or_init(|| Some(Arc::new(5)));
        assert_eq!(table.peek(key), Some(Some(Arc::new(5))));
    }

    #[test]
    fn explicit_absence_is_cached() {
        let table: FactTable<u32> = FactTable::new();
        let key = Name::from_raw(2);
        table.fact_cell(key).get_or_init(|| None);
        assert_eq!(table.peek(key), Some(None));
    }

    #[test]
    fn publish_overwrites_previous_value() {
        let table: FactTable<u32> = FactTable::new();
        let key = Name::from_raw(3);
        table.publish(key, Some(Arc::new(30)));
        table.publish(key, Some(Arc::new(31)));
        assert_eq!(table.peek(key), Some(Some(Arc::new(31))));
    }

    #[test]
    fn evict_drains_readers() {
        let table: FactTable<u32> = FactTable::new();
        let key = Name::from_raw(4);
        table.publish(key, Some(Arc::new(1)));
        table.record(key, &dep(10));
        table.record(key, &dep(11));
        table.record(key, &dep(10));

        let drained = table.evict(key);
        assert_eq!(drained.len(), 2);
        assert!(drained.contains(&dep(10)));
        assert!(drained.contains(&dep(11)));
        assert_eq!(table.peek(key), None);

        // A second eviction finds nothing left.
        assert!(table.evict(key).is_empty());
    }

    #[test]
    fn record_without_fact_entry_is_kept() {
        // Reads of never-published keys still register their reader, so a
        // later appearance of the key can trigger them.
        let table: FactTable<u32> = FactTable::new();
        let key = Name::from_raw(5);
        table.record(key, &dep(20));
        let drained = table.evict(key);
        assert_eq!(drained.len(), 1);
    }

    #[test]
    fn stats_count_facts_and_edges() {
        let table: FactTable<u32> = FactTable::new();
        table.publish(Name::from_raw(1), Some(Arc::new(1)));
        table.publish(Name::from_raw(2), None);
        table.record(Name::from_raw(1), &dep(10));
        table.record(
            Name::from_raw(1),
            &DependencyKey::LayerFact {
                layer: LayerId::Globals,
                key: Name::from_raw(9),
            },
        );
        table.record(Name::from_raw(2), &dep(10));

        let stats = table.stats();
        assert_eq!(stats.cached_facts, 2);
        assert_eq!(stats.dependency_edges, 3);
    }

    #[test]
    fn partition_covers_all_keys_disjointly() {
        let keys: Vec<Name> = (0..100).map(Name::from_raw).collect();
        let partitions = partition_by_shard(keys.clone());
        let mut seen: Vec<Name> = partitions.iter().flatten().copied().collect();
        seen.sort_unstable();
        let mut expected = keys;
        expected.sort_unstable();
        assert_eq!(seen, expected);
        for partition in &partitions {
            assert!(!partition.is_empty());
            let first = shard_index(partition[0]);
            assert!(partition.iter().all(|k| shard_index(*k) == first));
        }
    }
}
