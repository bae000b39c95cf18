//! The root layer anchoring an environment stack.
//!
//! Source facts are not derived from anything inside the core: the driver
//! translates file edits into identifier-level facts (outside this crate's
//! scope) and publishes them here. Downstream layers read the root exactly
//! like any other layer, so the root keeps the same reverse index and emits
//! the same kind of update result.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use sift_common::Name;
use sift_config::ProjectConfig;
use sift_scheduler::Scheduler;
use tracing::debug;

use crate::dependency::DependencyKey;
use crate::environment::FactLookup;
use crate::table::{partition_by_shard, EnvironmentStats, FactTable};
use crate::update::UpdateResult;
use crate::view::ReadOnly;

/// The root environment of a stack: driver-published facts about top-level
/// identifiers.
///
/// Reads of never-published keys return `None` but still register their
/// dependency, so an identifier that later comes into existence triggers the
/// readers that looked for it. The driver publishes new values for changed
/// identifiers around each [`update`](SourceEnvironment::update) call;
/// `update` itself only evicts and reports readers.
pub struct SourceEnvironment<F> {
    table: FactTable<F>,
    gate: RwLock<()>,
}

impl<F: Send + Sync + 'static> SourceEnvironment<F> {
    /// Creates an empty root environment.
    pub fn new() -> Self {
        Self {
            table: FactTable::new(),
            gate: RwLock::new(()),
        }
    }

    /// Publishes (or replaces) the fact for `key`.
    ///
    /// # Panics
    ///
    /// Panics if called while an update of this environment is in flight.
    pub fn publish(&self, key: Name, fact: F) {
        let Some(_guard) = self.gate.try_read() else {
            panic!("source facts published during update");
        };
        self.table.publish(key, Some(Arc::new(fact)));
    }

    /// A read-only view of this environment, valid while no update runs.
    pub fn read_only(&self) -> ReadOnly<'_, Self> {
        ReadOnly::new(self)
    }

    /// Counts of published facts and reverse-index edges.
    pub fn stats(&self) -> EnvironmentStats {
        self.table.stats()
    }

    /// Applies an identifier-level change set to the root.
    ///
    /// Evicts the entries for all changed keys and returns the union of
    /// their registered readers as the root's triggered set. Changed
    /// identifiers that still exist are expected to be re-published by the
    /// driver after the update completes.
    ///
    /// An empty change set is a no-op that leaves all state untouched.
    ///
    /// # Panics
    ///
    /// Panics if called while another update or any query on this
    /// environment is in flight.
    pub fn update(
        &self,
        scheduler: &Scheduler,
        config: &ProjectConfig,
        changed: &BTreeSet<Name>,
    ) -> UpdateResult {
        let Some(_guard) = self.gate.try_write() else {
            panic!("update of source environment started while queries or another update are in flight");
        };

        if changed.is_empty() {
            return UpdateResult::root(BTreeSet::new());
        }

        let drained = scheduler.map(
            partition_by_shard(changed.iter().copied().collect()),
            |keys| {
                let mut deps = BTreeSet::new();
                for key in keys {
                    deps.append(&mut self.table.evict(key));
                }
                deps
            },
        );

        let mut triggered = BTreeSet::new();
        for mut deps in drained {
            triggered.append(&mut deps);
        }
        debug!(
            changed = changed.len(),
            triggered = triggered.len(),
            "source update"
        );
        if config.check.debug {
            debug!(keys = ?triggered, "triggered dependency keys");
        }
        UpdateResult::root(triggered)
    }
}

impl<F: Send + Sync + 'static> Default for SourceEnvironment<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Send + Sync + 'static> FactLookup for SourceEnvironment<F> {
    type Fact = F;

    fn fact(&self, dependency: Option<&DependencyKey>, key: Name) -> Option<Arc<F>> {
        let Some(_guard) = self.gate.try_read() else {
            panic!("source environment queried during update");
        };
        if let Some(dep) = dependency {
            self.table.record(key, dep);
        }
        self.table.peek(key).flatten()
    }
}
