// Snapshot ingestion: per-entity previous/target buffers with derived velocity.

use crate::domain::angle::shortest_arc_deg;
use crate::domain::{EntityId, EntityNetState, EntitySnapshot, TimedPose};
use std::collections::{HashMap, HashSet};

// Floor for the sample window so equal timestamps cannot divide by zero.
const MIN_WINDOW_MS: f64 = 1.0;

/// Which ids a batch introduced and which it dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub spawned: Vec<EntityId>,
    pub purged: Vec<EntityId>,
}

/// Owns the network state of every entity listed in the latest batch.
#[derive(Debug, Clone)]
pub struct SnapshotIngestor<P> {
    entities: HashMap<EntityId, EntityNetState<P>>,
    // Ids in the order the latest batch listed them.
    order: Vec<EntityId>,
}

impl<P> Default for SnapshotIngestor<P> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<P> SnapshotIngestor<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a batch as the newest target for every entity it lists.
    ///
    /// `timestamp_ms` is the authoritative time of the batch. The newest
    /// batch always becomes the target, whatever its timestamp.
    pub fn ingest(
        &mut self,
        batch: impl IntoIterator<Item = EntitySnapshot<P>>,
        timestamp_ms: f64,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        let mut active: HashSet<EntityId> = HashSet::new();
        let mut order = Vec::new();

        for snapshot in batch {
            let EntitySnapshot {
                id,
                pose,
                vx,
                vy,
                payload,
            } = snapshot;

            // Duplicates inside one batch keep the first listing.
            if !active.insert(id.clone()) {
                continue;
            }

            if let Some(state) = self.entities.get_mut(&id) {
                // An unreadable pose keeps the previous samples.
                if let Some(pose) = pose {
                    let window_ms = (timestamp_ms - state.target.timestamp_ms).max(MIN_WINDOW_MS);
                    let window_s = window_ms / 1000.0;

                    state.prev = state.target;
                    state.target = TimedPose { pose, timestamp_ms };

                    let prev = state.prev.pose;
                    state.velocity_x = vx
                        .filter(|v| v.is_finite())
                        .unwrap_or((pose.x - prev.x) / window_s);
                    state.velocity_y = vy
                        .filter(|v| v.is_finite())
                        .unwrap_or((pose.y - prev.y) / window_s);
                    state.angular_velocity =
                        shortest_arc_deg(prev.heading_deg, pose.heading_deg) / window_s;
                }
                state.payload = payload;
            } else if let Some(pose) = pose {
                self.entities
                    .insert(id.clone(), EntityNetState::spawn(pose, timestamp_ms, payload));
                report.spawned.push(id.clone());
            } else {
                active.remove(&id);
                continue;
            }
            order.push(id);
        }

        self.entities.retain(|id, _| {
            let keep = active.contains(id);
            if !keep {
                report.purged.push(id.clone());
            }
            keep
        });
        report.purged.sort();
        self.order = order;
        report
    }

    pub fn get(&self, id: &str) -> Option<&EntityNetState<P>> {
        self.entities.get(id)
    }

    /// Tracked entities in the order of the latest batch.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &EntityNetState<P>)> {
        self.order
            .iter()
            .filter_map(|id| self.entities.get(id).map(|state| (id, state)))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Drops every entity, e.g. on transport teardown. Returns the purged ids.
    pub fn clear(&mut self) -> Vec<EntityId> {
        let mut purged: Vec<EntityId> = self.entities.drain().map(|(id, _)| id).collect();
        purged.sort();
        self.order.clear();
        purged
    }
}
