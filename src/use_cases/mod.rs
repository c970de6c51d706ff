// Use cases layer: clock sync, latency, input coalescing, snapshot buffering
// and render-time sampling, composed by the per-connection session.

pub mod clock_sync;
pub mod input;
pub mod latency;
pub mod sampler;
pub mod session;
pub mod snapshots;

pub use clock_sync::ClockSynchronizer;
pub use input::{AnalogState, ButtonReading, GamepadReading, InputCoalescer, Key, KeyboardState};
pub use latency::LatencyEstimator;
pub use sampler::{LocalPlayer, RenderSampler, RenderedEntity, SampleTiming};
pub use session::NetSession;
pub use snapshots::{IngestReport, SnapshotIngestor};
