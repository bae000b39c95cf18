//! The result of one layer's incremental update.

use std::collections::BTreeSet;
use std::sync::Arc;

use sift_common::{InternalError, SiftResult};

use crate::dependency::DependencyKey;

/// The immutable output of one `update` call.
///
/// Holds the set of dependency keys triggered at this layer (the downstream
/// work that must be redone) and the upstream layer's own result, so layers
/// further downstream and top-level diagnostics can walk the full provenance
/// chain of one edit.
///
/// Only `update` creates values of this type; it is consumed by the next
/// layer's `update` and by the re-check driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateResult {
    triggered: BTreeSet<DependencyKey>,
    upstream: Option<Arc<UpdateResult>>,
}

impl UpdateResult {
    /// An update result at the root of the stack, with no upstream.
    pub(crate) fn root(triggered: BTreeSet<DependencyKey>) -> Self {
        Self {
            triggered,
            upstream: None,
        }
    }

    /// An update result wrapping the consumed upstream result.
    pub(crate) fn with_upstream(triggered: BTreeSet<DependencyKey>, upstream: UpdateResult) -> Self {
        Self {
            triggered,
            upstream: Some(Arc::new(upstream)),
        }
    }

    /// The dependency keys triggered at this layer, deduplicated and in a
    /// deterministic order.
    pub fn triggered(&self) -> &BTreeSet<DependencyKey> {
        &self.triggered
    }

    /// Returns `true` if nothing was triggered at this layer.
    pub fn is_empty(&self) -> bool {
        self.triggered.is_empty()
    }

    /// The upstream layer's update result, if this layer has an upstream.
    pub fn upstream(&self) -> Option<&UpdateResult> {
        self.upstream.as_deref()
    }

    /// Serializes this layer's triggered set to bytes.
    ///
    /// Triggered sets are occasionally persisted or shipped to a checker
    /// process running elsewhere; only the local set is encoded, not the
    /// provenance chain.
    pub fn encode_triggered(&self) -> SiftResult<Vec<u8>> {
        bincode::serde::encode_to_vec(&self.triggered, bincode::config::standard())
            .map_err(|e| InternalError::in_operation("encode triggered set", e))
    }

    /// Deserializes a triggered set previously written by
    /// [`encode_triggered`](UpdateResult::encode_triggered).
    pub fn decode_triggered(bytes: &[u8]) -> SiftResult<BTreeSet<DependencyKey>> {
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map(|(set, _)| set)
            .map_err(|e| InternalError::in_operation("decode triggered set", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::LayerId;
    use sift_common::Name;

    fn key(raw: u32) -> DependencyKey {
        DependencyKey::LayerFact {
            layer: LayerId::Globals,
            key: Name::from_raw(raw),
        }
    }

    #[test]
    fn root_has_no_upstream() {
        let result = UpdateResult::root(BTreeSet::from([key(1)]));
        assert!(result.upstream().is_none());
        assert_eq!(result.triggered().len(), 1);
        assert!(!result.is_empty());
    }

    #[test]
    fn provenance_chain_is_preserved() {
        let root = UpdateResult::root(BTreeSet::from([key(1)]));
        let mid = UpdateResult::with_upstream(BTreeSet::from([key(2)]), root.clone());
        let top = UpdateResult::with_upstream(BTreeSet::new(), mid);

        assert!(top.is_empty());
        let mid_ref = top.upstream().unwrap();
        assert_eq!(mid_ref.triggered(), &BTreeSet::from([key(2)]));
        assert_eq!(mid_ref.upstream().unwrap(), &root);
        assert!(mid_ref.upstream().unwrap().upstream().is_none());
    }

    #[test]
    fn triggered_set_round_trips_through_bytes() {
        let triggered = BTreeSet::from([
            key(1),
            key(2),
            DependencyKey::CheckModule(Name::from_raw(3)),
        ]);
        let result = UpdateResult::root(triggered.clone());

        let bytes = result.encode_triggered().unwrap();
        let back = UpdateResult::decode_triggered(&bytes).unwrap();
        assert_eq!(back, triggered);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = UpdateResult::decode_triggered(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(format!("{err}").contains("decode triggered set"));
    }
}
