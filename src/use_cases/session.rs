// Per-connection netcode session: owns every component and exposes the
// callbacks a host loop drives (snapshot, pong, device events, timers, frames).

use crate::domain::{Clock, EntityId, EntitySnapshot, InputSnapshot, NetTuning, Pose, PurgeHook};
use crate::use_cases::clock_sync::ClockSynchronizer;
use crate::use_cases::input::{
    AnalogState, GamepadReading, InputCoalescer, Key, KeyboardState, compose_input,
};
use crate::use_cases::latency::LatencyEstimator;
use crate::use_cases::sampler::{LocalPlayer, RenderSampler, RenderedEntity, SampleTiming};
use crate::use_cases::snapshots::{IngestReport, SnapshotIngestor};
use tracing::{debug, info, trace};

pub struct NetSession<C, P> {
    clock: C,
    tuning: NetTuning,
    clock_sync: ClockSynchronizer,
    latency: LatencyEstimator,
    coalescer: InputCoalescer,
    ingestor: SnapshotIngestor<P>,
    sampler: RenderSampler,
    keyboard: KeyboardState,
    analog: AnalogState,
    local_player_id: Option<EntityId>,
    local_prediction: Option<Pose>,
    purge_hook: Option<Box<dyn PurgeHook + Send>>,
}

impl<C, P> NetSession<C, P>
where
    C: Clock,
    P: Clone,
{
    pub fn new(clock: C, tuning: NetTuning) -> Self {
        Self {
            clock,
            clock_sync: ClockSynchronizer::new(tuning.clock_smoothing),
            latency: LatencyEstimator::new(&tuning),
            coalescer: InputCoalescer::new(&tuning),
            ingestor: SnapshotIngestor::new(),
            sampler: RenderSampler::new(&tuning),
            keyboard: KeyboardState::default(),
            analog: AnalogState::default(),
            local_player_id: None,
            local_prediction: None,
            purge_hook: None,
            tuning,
        }
    }

    /// Registers the collaborator that owns per-entity visual effects.
    pub fn with_purge_hook(mut self, hook: Box<dyn PurgeHook + Send>) -> Self {
        self.purge_hook = Some(hook);
        self
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// A fresh connection starts clock sync and input coalescing from scratch.
    pub fn on_connected(&mut self) {
        self.clock_sync.reset();
        self.coalescer.reset();
        info!("session connected");
    }

    /// Transport teardown: no interpolation state may survive a reconnect.
    pub fn on_disconnected(&mut self) {
        let purged = self.ingestor.clear();
        self.notify_purged(&purged);
        self.local_player_id = None;
        self.local_prediction = None;
        info!(purged = purged.len(), "session disconnected; entity state cleared");
    }

    pub fn set_local_player(&mut self, id: impl Into<EntityId>) {
        let id = id.into();
        info!(player_id = %id, "local player assigned");
        self.local_player_id = Some(id);
    }

    pub fn local_player_id(&self) -> Option<&str> {
        self.local_player_id.as_deref()
    }

    /// Latest pose from the host's own prediction of the local car.
    pub fn set_local_prediction(&mut self, pose: Option<Pose>) {
        self.local_prediction = pose;
    }

    /// Snapshot message: feeds the clock filter, then the entity store.
    pub fn ingest_snapshot(
        &mut self,
        batch: Vec<EntitySnapshot<P>>,
        server_time_s: Option<f64>,
    ) -> IngestReport {
        let now = self.clock.now_ms();
        let was_synchronized = self.clock_sync.is_synchronized();
        self.clock_sync.update_offset(server_time_s, now);
        if !was_synchronized && self.clock_sync.is_synchronized() {
            info!(offset_ms = self.clock_sync.offset_ms(), "clock synchronized");
        }

        let timestamp_ms = match server_time_s.filter(|t| t.is_finite()) {
            Some(server_s) => server_s * 1000.0,
            None => self.clock_sync.to_authoritative_ms(now),
        };

        let report = self.ingestor.ingest(batch, timestamp_ms);
        if !report.spawned.is_empty() {
            debug!(spawned = ?report.spawned, "entities spawned");
        }
        if !report.purged.is_empty() {
            debug!(purged = ?report.purged, "entities purged");
            self.notify_purged(&report.purged);
        }
        report
    }

    /// Latency probe reply echoing `client_time_ms`.
    pub fn handle_pong(&mut self, client_time_ms: Option<f64>, server_time_s: Option<f64>) {
        let now = self.clock.now_ms();
        if let Some(sent) = client_time_ms.filter(|t| t.is_finite()) {
            self.latency.update_latency(now - sent);
            trace!(
                rtt_ms = now - sent,
                smoothed_rtt_ms = ?self.latency.smoothed_rtt_ms(),
                interpolation_delay_ms = self.latency.interpolation_delay_ms(),
                "latency sample"
            );
        }
        self.clock_sync.update_offset(server_time_s, now);
    }

    /// Client timestamp to put into the next latency probe.
    pub fn probe_client_time(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn current_input(&self) -> InputSnapshot {
        compose_input(&self.keyboard, &self.analog, &self.tuning)
    }

    /// Key edge from the host. Returns input to transmit, if any.
    pub fn apply_key(&mut self, key: Key, pressed: bool) -> Option<InputSnapshot> {
        if !self.keyboard.apply(key, pressed) {
            return None;
        }
        self.maybe_send_input(false)
    }

    /// Analog state already normalized by the host.
    pub fn set_analog(&mut self, analog: AnalogState) -> Option<InputSnapshot> {
        self.analog = analog;
        self.maybe_send_input(false)
    }

    /// Raw gamepad poll; `None` means no pad is connected.
    pub fn update_gamepad(&mut self, reading: Option<&GamepadReading>) -> Option<InputSnapshot> {
        let analog = AnalogState::from_gamepad(reading, self.tuning.steer_deadzone);
        self.set_analog(analog)
    }

    /// Fixed-rate input timer.
    pub fn input_tick(&mut self) -> Option<InputSnapshot> {
        self.maybe_send_input(true)
    }

    pub fn maybe_send_input(&mut self, force: bool) -> Option<InputSnapshot> {
        let now = self.clock.now_ms();
        let snapshot = self.current_input();
        self.coalescer.maybe_send(force, now, snapshot)
    }

    /// Rendered state for one displayed frame at local `render_time_ms`.
    pub fn tick(&self, render_time_ms: f64) -> Vec<RenderedEntity<P>> {
        let local = self.local_player_id.as_deref().map(|id| LocalPlayer {
            id,
            predicted: self.local_prediction,
        });
        self.sampler
            .sample_at(&self.ingestor, render_time_ms, self.timing(), local)
    }

    pub fn timing(&self) -> SampleTiming {
        SampleTiming {
            clock_offset_ms: self.clock_sync.offset_ms(),
            interpolation_delay_ms: self.latency.interpolation_delay_ms(),
        }
    }

    pub fn smoothed_rtt_ms(&self) -> Option<f64> {
        self.latency.smoothed_rtt_ms()
    }

    pub fn interpolation_delay_ms(&self) -> f64 {
        self.latency.interpolation_delay_ms()
    }

    pub fn clock_offset_ms(&self) -> f64 {
        self.clock_sync.offset_ms()
    }

    pub fn entity_count(&self) -> usize {
        self.ingestor.len()
    }

    fn notify_purged(&mut self, ids: &[EntityId]) {
        if let Some(hook) = self.purge_hook.as_mut() {
            for id in ids {
                hook.entity_purged(id);
            }
        }
    }
}
