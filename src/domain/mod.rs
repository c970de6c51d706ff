// Domain layer: pose math, snapshot/input types and ports.

pub mod angle;
pub mod ports;
pub mod state;
pub mod tuning;

pub use ports::{Clock, PurgeHook};
pub use state::{EntityId, EntityNetState, EntitySnapshot, InputSnapshot, Pose, TimedPose};
pub use tuning::NetTuning;
