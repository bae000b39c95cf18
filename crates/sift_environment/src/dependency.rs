//! The closed registry of dependency keys.
//!
//! A dependency key names one downstream unit of work that must be redone
//! when a fact it read changes. The set of variants is closed and known to
//! the whole program: adding a new kind of consumer means adding a variant
//! here, not registering anything at runtime.

use serde::{Deserialize, Serialize};
use sift_common::Name;

/// Identifies one derived layer of the environment stack.
///
/// Layers are listed innermost first. Each derived layer tags its own
/// upstream reads with its `LayerId` so that upstream invalidation can name
/// exactly the cache entries this layer must evict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LayerId {
    /// Class hierarchy resolution (bases, MRO).
    ClassHierarchy,
    /// Class metadata resolution (fields, method tables).
    ClassMetadata,
    /// Attribute resolution over resolved classes.
    Attributes,
    /// Global-name resolution, the outermost derived layer.
    Globals,
}

/// Why a fact was read: the identity of the reader that must redo its work
/// if the fact changes.
///
/// Two keys are equal iff their variant and payload are equal. Keys are
/// totally ordered so triggered sets iterate deterministically, and they
/// serialize stably because dependency sets are occasionally persisted or
/// shipped across process boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyKey {
    /// The named module's body was type-checked and consulted the fact.
    /// Triggering it means "re-check that module".
    CheckModule(Name),
    /// The named layer's cached entry for `key` was derived by reading the
    /// fact. Triggering it means "that cache entry is stale".
    LayerFact {
        /// The layer owning the stale cache entry.
        layer: LayerId,
        /// The query key of the stale cache entry.
        key: Name,
    },
}

impl DependencyKey {
    /// Returns the cache entry named by this key if it belongs to `layer`.
    ///
    /// This is the affected-key extraction used by the update engine: an
    /// upstream triggered set names downstream cache entries through
    /// [`DependencyKey::LayerFact`], and each layer picks out its own.
    pub fn fact_of(&self, layer: LayerId) -> Option<Name> {
        match self {
            DependencyKey::LayerFact { layer: l, key } if *l == layer => Some(*key),
            _ => None,
        }
    }
}
