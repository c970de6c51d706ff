// Render-time sampling: interpolation, capped extrapolation and
// self-reconciliation of the locally controlled entity.

use crate::domain::angle::{lerp, lerp_angle_deg, normalize_deg};
use crate::domain::{EntityId, EntityNetState, NetTuning, Pose};
use crate::use_cases::snapshots::SnapshotIngestor;

/// Clock inputs for one sample, both in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleTiming {
    pub clock_offset_ms: f64,
    pub interpolation_delay_ms: f64,
}

impl SampleTiming {
    /// Authoritative time at which entities are sampled for `render_time_ms`.
    pub fn sample_time_ms(&self, render_time_ms: f64) -> f64 {
        render_time_ms + self.clock_offset_ms - self.interpolation_delay_ms
    }
}

/// The locally controlled entity and its latest predicted pose, if the host
/// runs its own prediction.
#[derive(Debug, Clone, Copy)]
pub struct LocalPlayer<'a> {
    pub id: &'a str,
    pub predicted: Option<Pose>,
}

/// Pose to display for one entity, with its latest payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEntity<P> {
    pub id: EntityId,
    pub pose: Pose,
    pub is_local: bool,
    pub payload: P,
}

#[derive(Debug, Clone, Copy)]
pub struct RenderSampler {
    extrapolation_limit_ms: f64,
    self_reconcile_blend: f64,
}

impl RenderSampler {
    pub fn new(tuning: &NetTuning) -> Self {
        Self {
            extrapolation_limit_ms: tuning.extrapolation_limit_ms,
            self_reconcile_blend: tuning.self_reconcile_blend,
        }
    }

    /// Network-derived pose of one entity at authoritative `sample_time_ms`.
    pub fn network_pose<P>(&self, state: &EntityNetState<P>, sample_time_ms: f64) -> Pose {
        let window_ms = state.window_ms();
        let prev = state.prev;
        let target = state.target;

        if window_ms > 0.0 && sample_time_ms <= target.timestamp_ms {
            let t = ((sample_time_ms - prev.timestamp_ms) / window_ms).clamp(0.0, 1.0);
            return Pose {
                x: lerp(prev.pose.x, target.pose.x, t),
                y: lerp(prev.pose.y, target.pose.y, t),
                heading_deg: lerp_angle_deg(prev.pose.heading_deg, target.pose.heading_deg, t),
            };
        }

        // Past the newest sample (or no usable window): project forward, then
        // freeze once the ceiling is reached.
        let ahead_ms = (sample_time_ms - target.timestamp_ms)
            .max(0.0)
            .min(self.extrapolation_limit_ms);
        let ahead_s = ahead_ms / 1000.0;
        Pose {
            x: target.pose.x + state.velocity_x * ahead_s,
            y: target.pose.y + state.velocity_y * ahead_s,
            heading_deg: normalize_deg(target.pose.heading_deg + state.angular_velocity * ahead_s),
        }
    }

    /// Moves `predicted` part of the way toward `network` instead of snapping.
    pub fn reconcile(&self, predicted: Pose, network: Pose) -> Pose {
        let blend = self.self_reconcile_blend;
        Pose {
            x: lerp(predicted.x, network.x, blend),
            y: lerp(predicted.y, network.y, blend),
            heading_deg: lerp_angle_deg(predicted.heading_deg, network.heading_deg, blend),
        }
    }

    /// Poses for every tracked entity, in latest-batch order.
    pub fn sample_at<P: Clone>(
        &self,
        store: &SnapshotIngestor<P>,
        render_time_ms: f64,
        timing: SampleTiming,
        local: Option<LocalPlayer<'_>>,
    ) -> Vec<RenderedEntity<P>> {
        let sample_time_ms = timing.sample_time_ms(render_time_ms);

        store
            .iter()
            .map(|(id, state)| {
                let mut pose = self.network_pose(state, sample_time_ms);
                let local = local.filter(|local| local.id == id.as_str());
                if let Some(local) = local {
                    // Without host prediction the latest reported pose stands in.
                    let predicted = local.predicted.unwrap_or(state.target.pose);
                    pose = self.reconcile(predicted, pose);
                }
                RenderedEntity {
                    id: id.clone(),
                    pose,
                    is_local: local.is_some(),
                    payload: state.payload.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntitySnapshot;

    fn car(id: &str, x: f64, y: f64, heading: f64) -> EntitySnapshot<&'static str> {
        EntitySnapshot {
            id: id.to_string(),
            pose: Some(Pose::new(x, y, heading)),
            vx: None,
            vy: None,
            payload: "laps=1",
        }
    }

    fn sampler() -> RenderSampler {
        RenderSampler::new(&NetTuning::default())
    }

    fn no_delay() -> SampleTiming {
        SampleTiming::default()
    }

    fn two_samples(from: (f64, f64, f64), to: (f64, f64, f64)) -> SnapshotIngestor<&'static str> {
        let mut store = SnapshotIngestor::new();
        store.ingest([car("a", from.0, from.1, from.2)], 1_000.0);
        store.ingest([car("a", to.0, to.1, to.2)], 1_100.0);
        store
    }

    #[test]
    fn midpoint_interpolates_linearly() {
        let store = two_samples((0.0, 0.0, 0.0), (10.0, 0.0, 0.0));
        let frame = sampler().sample_at(&store, 1_050.0, no_delay(), None);
        assert_eq!(frame.len(), 1);
        assert!((frame[0].pose.x - 5.0).abs() < 1e-9);
        assert_eq!(frame[0].pose.y, 0.0);
    }

    #[test]
    fn sampling_at_target_timestamp_returns_target_pose() {
        let store = two_samples((0.0, 0.0, 30.0), (7.0, -3.0, 60.0));
        let frame = sampler().sample_at(&store, 1_100.0, no_delay(), None);
        assert_eq!(frame[0].pose, Pose::new(7.0, -3.0, 60.0));
    }

    #[test]
    fn sampling_before_window_clamps_to_prev() {
        let store = two_samples((2.0, 0.0, 0.0), (10.0, 0.0, 0.0));
        let frame = sampler().sample_at(&store, 900.0, no_delay(), None);
        assert_eq!(frame[0].pose.x, 2.0);
    }

    #[test]
    fn heading_interpolates_across_the_seam() {
        let store = two_samples((0.0, 0.0, 170.0), (0.0, 0.0, -170.0));
        let frame = sampler().sample_at(&store, 1_050.0, no_delay(), None);
        let heading = frame[0].pose.heading_deg;
        assert!((heading.abs() - 180.0).abs() < 1e-9, "heading {heading}");
    }

    #[test]
    fn extrapolation_moves_along_velocity_then_freezes() {
        let store = two_samples((0.0, 0.0, 0.0), (10.0, 5.0, 0.0));
        let sampler = sampler();

        let mut last_x = f64::MIN;
        for ahead in [0.0, 10.0, 40.0, 79.0, 80.0] {
            let pose = sampler.sample_at(&store, 1_100.0 + ahead, no_delay(), None)[0].pose;
            assert!(pose.x >= last_x);
            last_x = pose.x;
        }

        let at_ceiling = sampler.sample_at(&store, 1_180.0, no_delay(), None)[0].pose;
        let far_beyond = sampler.sample_at(&store, 5_000.0, no_delay(), None)[0].pose;
        assert_eq!(at_ceiling, far_beyond);
        // 100 units/s for 80 ms.
        assert!((at_ceiling.x - 18.0).abs() < 1e-9);
        assert!((at_ceiling.y - 9.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_entity_renders_its_literal_pose() {
        let mut store = SnapshotIngestor::new();
        store.ingest([car("a", 3.0, 4.0, 45.0)], 1_000.0);
        let frame = sampler().sample_at(&store, 2_000.0, no_delay(), None);
        assert_eq!(frame[0].pose, Pose::new(3.0, 4.0, 45.0));
    }

    #[test]
    fn timing_shifts_sample_time() {
        let store = two_samples((0.0, 0.0, 0.0), (10.0, 0.0, 0.0));
        let timing = SampleTiming {
            clock_offset_ms: 1_000.0,
            interpolation_delay_ms: 25.0,
        };
        // 75 + 1000 - 25 = 1050.
        let frame = sampler().sample_at(&store, 75.0, timing, None);
        assert!((frame[0].pose.x - 5.0).abs() < 1e-9);
    }

    #[test]
    fn local_entity_blends_thirty_five_percent_toward_network() {
        let store = two_samples((0.0, 0.0, 0.0), (10.0, 0.0, 0.0));
        let local = LocalPlayer {
            id: "a",
            predicted: Some(Pose::new(20.0, 10.0, 0.0)),
        };
        let frame = sampler().sample_at(&store, 1_050.0, no_delay(), Some(local));

        // Network pose is (5, 0); 35% of the way from (20, 10).
        let pose = frame[0].pose;
        assert!(frame[0].is_local);
        assert!((pose.x - 14.75).abs() < 1e-9);
        assert!((pose.y - 6.5).abs() < 1e-9);
    }

    #[test]
    fn local_entity_without_prediction_blends_from_latest_report() {
        let store = two_samples((0.0, 0.0, 0.0), (10.0, 0.0, 0.0));
        let local = LocalPlayer {
            id: "a",
            predicted: None,
        };
        let frame = sampler().sample_at(&store, 1_050.0, no_delay(), Some(local));
        // From (10, 0) toward (5, 0).
        assert!((frame[0].pose.x - 8.25).abs() < 1e-9);
    }

    #[test]
    fn remote_entities_are_not_blended_and_keep_payload() {
        let store = two_samples((0.0, 0.0, 0.0), (10.0, 0.0, 0.0));
        let local = LocalPlayer {
            id: "someone-else",
            predicted: Some(Pose::new(100.0, 100.0, 0.0)),
        };
        let frame = sampler().sample_at(&store, 1_050.0, no_delay(), Some(local));
        assert!(!frame[0].is_local);
        assert!((frame[0].pose.x - 5.0).abs() < 1e-9);
        assert_eq!(frame[0].payload, "laps=1");
    }
}
