use super::state::EntityId;

// Port for reading the local monotonic clock, in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

// Port for collaborators that keep per-entity visual state (tire marks,
// particle emitters) and must drop it when an entity leaves the snapshot.
pub trait PurgeHook {
    fn entity_purged(&mut self, id: &EntityId);
}
