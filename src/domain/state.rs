// Domain-level snapshot, per-entity network state and input types.

use super::angle::normalize_deg;

pub type EntityId = String;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading_deg: f64) -> Self {
        Self {
            x,
            y,
            heading_deg: normalize_deg(heading_deg),
        }
    }
}

/// One entity record from an authoritative batch.
///
/// `pose` is `None` when the record carried unreadable coordinates; the
/// entity then stays tracked with whatever state it had before.
#[derive(Debug, Clone)]
pub struct EntitySnapshot<P> {
    pub id: EntityId,
    pub pose: Option<Pose>,
    pub vx: Option<f64>,
    pub vy: Option<f64>,
    pub payload: P,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPose {
    pub pose: Pose,
    pub timestamp_ms: f64,
}

/// Two-sample buffer for one entity plus velocities derived from it.
#[derive(Debug, Clone)]
pub struct EntityNetState<P> {
    pub prev: TimedPose,
    pub target: TimedPose,
    // Units per second.
    pub velocity_x: f64,
    pub velocity_y: f64,
    // Degrees per second.
    pub angular_velocity: f64,
    // Latest payload, passed through to rendering.
    pub payload: P,
}

impl<P> EntityNetState<P> {
    pub fn spawn(pose: Pose, timestamp_ms: f64, payload: P) -> Self {
        let sample = TimedPose { pose, timestamp_ms };
        Self {
            prev: sample,
            target: sample,
            velocity_x: 0.0,
            velocity_y: 0.0,
            angular_velocity: 0.0,
            payload,
        }
    }

    pub fn window_ms(&self) -> f64 {
        self.target.timestamp_ms - self.prev.timestamp_ms
    }
}

/// Canonical control intent for one sampling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub handbrake: bool,
    // Legacy discrete flags for consumers that only read booleans.
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputSnapshot {
    /// Stable change-detection key; analog values are rounded to two decimals.
    pub fn signature(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{:.2}|{:.2}|{:.2}",
            self.up as u8,
            self.down as u8,
            self.left as u8,
            self.right as u8,
            self.handbrake as u8,
            self.throttle,
            self.brake,
            self.steer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_new_normalizes_heading() {
        let pose = Pose::new(1.0, 2.0, 270.0);
        assert_eq!(pose.heading_deg, -90.0);
    }

    #[test]
    fn spawned_state_has_empty_window_and_no_velocity() {
        let state = EntityNetState::spawn(Pose::new(3.0, 4.0, 0.0), 1_000.0, ());
        assert_eq!(state.window_ms(), 0.0);
        assert_eq!(state.prev, state.target);
        assert_eq!(state.velocity_x, 0.0);
        assert_eq!(state.angular_velocity, 0.0);
    }

    #[test]
    fn signature_rounds_analog_values() {
        let input = InputSnapshot {
            throttle: 0.456,
            brake: 0.0,
            steer: -1.0,
            handbrake: true,
            up: true,
            down: false,
            left: true,
            right: false,
        };
        assert_eq!(input.signature(), "1|0|1|0|1|0.46|0.00|-1.00");
    }
}
