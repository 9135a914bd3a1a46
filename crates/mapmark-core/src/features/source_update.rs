//! Batching and merging of pending source writes.
//!
//! Every mutation of the feature store is expressed as a [`SourceDiff`]
//! against one source. Outside of a transaction or an atomic window the diff
//! is written right away; inside one it is queued and the queue is folded
//! into a single diff with [`merge_geojson_diff`] when flushed.

use super::data::{FEATURE_ID_PROPERTY, SourceName};
use super::geojson::{Feature, FeatureId};
use crate::adapter::Sources;
use indexmap::IndexMap;

/// Log target for transaction and flush tracing.
pub const LOG_TARGET: &str = "mapmark::source_update";

/// Queue length that triggers an intermediate flush inside a transaction.
pub const MAX_PENDING_DIFFS: usize = 250;

/// Pending `{add, update, remove}` operations against one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceDiff {
    pub add: Vec<Feature>,
    pub update: Vec<Feature>,
    pub remove: Vec<FeatureId>,
}

impl SourceDiff {
    /// A diff adding one feature.
    pub fn add(feature: Feature) -> Self {
        Self {
            add: vec![feature],
            ..Self::default()
        }
    }

    /// A diff updating one feature.
    pub fn update(feature: Feature) -> Self {
        Self {
            update: vec![feature],
            ..Self::default()
        }
    }

    /// A diff removing one feature.
    pub fn remove(id: FeatureId) -> Self {
        Self {
            remove: vec![id],
            ..Self::default()
        }
    }

    /// Check if the diff has no operations.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.update.is_empty() && self.remove.is_empty()
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.add.len() + self.update.len() + self.remove.len()
    }
}

/// Id of a feature inside a diff: the id property, then the GeoJSON id.
pub fn diff_feature_id(feature: &Feature) -> Option<FeatureId> {
    let id = feature
        .property_id(FEATURE_ID_PROPERTY)
        .or_else(|| feature.id.clone());
    if id.is_none() {
        log::warn!(target: LOG_TARGET, "Feature id is missing: {:?}", feature);
    }
    id
}

fn same_id(id: &Option<FeatureId>, feature: &Feature) -> bool {
    id.is_some() && *id == diff_feature_id(feature)
}

/// Fold `next` into `pending`.
///
/// A later remove cancels earlier adds and updates of the same id, a later
/// update replaces an earlier add or update of the same id in place, and the
/// last write for an id always wins.
pub fn merge_geojson_diff(pending: SourceDiff, next: SourceDiff) -> SourceDiff {
    let removed = |feature: &Feature| {
        diff_feature_id(feature).is_some_and(|id| next.remove.contains(&id))
    };

    let mut pending_add: Vec<Feature> = pending.add.into_iter().filter(|f| !removed(f)).collect();
    let mut pending_update: Vec<Feature> =
        pending.update.into_iter().filter(|f| !removed(f)).collect();
    let mut new_updates = Vec::new();

    for updated in next.update {
        let id = diff_feature_id(&updated);
        let add_idx = pending_add.iter().position(|f| same_id(&id, f));
        let update_idx = pending_update.iter().position(|f| same_id(&id, f));

        match (add_idx, update_idx) {
            (None, None) => new_updates.push(updated),
            (add_idx, update_idx) => {
                if let Some(idx) = add_idx {
                    pending_add[idx] = updated.clone();
                }
                if let Some(idx) = update_idx {
                    pending_update[idx] = updated;
                }
            }
        }
    }

    pending_add.extend(next.add);
    pending_update.extend(new_updates);
    let mut remove = pending.remove;
    remove.extend(next.remove);

    SourceDiff {
        add: pending_add,
        update: pending_update,
        remove,
    }
}

/// Per-source queues of pending diffs plus the transaction and atomic state.
#[derive(Debug, Default)]
pub struct SourceUpdateManager {
    queues: IndexMap<SourceName, Vec<SourceDiff>>,
    transaction_active: bool,
    atomic_depth: usize,
}

impl SourceUpdateManager {
    /// Create a manager with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs are written immediately unless an atomic window is open.
    pub fn auto_updates_enabled(&self) -> bool {
        self.atomic_depth == 0
    }

    /// Check if an explicit transaction is open.
    pub fn is_transaction_active(&self) -> bool {
        self.transaction_active
    }

    /// Number of queued diffs for a source.
    pub fn pending_len(&self, source: SourceName) -> usize {
        self.queues.get(&source).map_or(0, Vec::len)
    }

    /// Open the explicit batching window.
    pub fn begin_transaction(&mut self) {
        log::trace!(target: LOG_TARGET, "begin transaction");
        self.transaction_active = true;
    }

    /// Flush every queue and close the batching window.
    pub fn commit(&mut self, sources: &mut Sources) {
        self.intermediate_commit(sources);
        self.transaction_active = false;
        log::trace!(target: LOG_TARGET, "commit");
    }

    /// Queue or write a diff for a source.
    pub fn update_source(&mut self, sources: &mut Sources, source: SourceName, diff: SourceDiff) {
        let queue = self.queues.entry(source).or_default();
        queue.push(diff);

        if self.transaction_active {
            if queue.len() > MAX_PENDING_DIFFS {
                log::trace!(target: LOG_TARGET, "queue for {} exceeded {}, flushing", source, MAX_PENDING_DIFFS);
                self.intermediate_commit(sources);
            }
            return;
        }

        if self.auto_updates_enabled() {
            self.flush_source(sources, source);
        }
    }

    /// Fold and clear the queue of a source. `None` if nothing is left.
    pub fn combined_diff(&mut self, source: SourceName) -> Option<SourceDiff> {
        let diffs = self.queues.get_mut(&source).map(std::mem::take)?;
        let combined = diffs.into_iter().fold(SourceDiff::default(), merge_geojson_diff);
        (!combined.is_empty()).then_some(combined)
    }

    /// Flush every non-empty queue without closing the transaction.
    pub fn intermediate_commit(&mut self, sources: &mut Sources) {
        let pending: Vec<SourceName> = self
            .queues
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(name, _)| *name)
            .collect();

        for source in pending {
            self.flush_source(sources, source);
        }
    }

    fn flush_source(&mut self, sources: &mut Sources, source: SourceName) {
        let Some(diff) = self.combined_diff(source) else {
            return;
        };
        match sources.get_mut(&source) {
            Some(target) => {
                log::trace!(target: LOG_TARGET, "update {}: {} operations", source, diff.len());
                target.update_data(&diff);
            }
            None => log::error!("Missing source \"{}\", dropping {} operations", source, diff.len()),
        }
    }

    /// Open an atomic window; windows nest.
    pub(crate) fn begin_atomic(&mut self) {
        self.atomic_depth += 1;
    }

    /// Close an atomic window.
    ///
    /// Closing the outermost window writes exactly one diff to every source,
    /// empty or not. Inside a transaction the queues stay pending until
    /// [`commit`](Self::commit).
    pub(crate) fn finish_atomic(&mut self, sources: &mut Sources) {
        self.atomic_depth = self.atomic_depth.saturating_sub(1);
        if self.atomic_depth > 0 {
            return;
        }

        if self.transaction_active {
            let names: Vec<SourceName> = sources.keys().copied().collect();
            for name in names {
                self.update_source(sources, name, SourceDiff::default());
            }
            return;
        }

        for (name, source) in sources.iter_mut() {
            let diff = self.combined_diff(*name).unwrap_or_default();
            log::trace!(target: LOG_TARGET, "atomic update {}: {} operations", name, diff.len());
            source.update_data(&diff);
        }
    }
}
