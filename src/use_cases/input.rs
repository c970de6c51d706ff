// Input fusion and outbound input coalescing.

use crate::domain::{InputSnapshot, NetTuning};

/// Keys the racing controls react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Shift,
    Char(char),
}

/// Held state of the discrete (keyboard) controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub handbrake: bool,
}

impl KeyboardState {
    /// Applies a key edge. Returns false when the key is not bound.
    pub fn apply(&mut self, key: Key, pressed: bool) -> bool {
        let slot = match key {
            Key::ArrowUp | Key::Char('w' | 'W') => &mut self.up,
            Key::ArrowDown | Key::Char('s' | 'S') => &mut self.down,
            Key::ArrowLeft | Key::Char('a' | 'A') => &mut self.left,
            Key::ArrowRight | Key::Char('d' | 'D') => &mut self.right,
            Key::Shift => &mut self.handbrake,
            Key::Char(_) => return false,
        };
        *slot = pressed;
        true
    }
}

/// Continuous control state, already normalized to control ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalogState {
    pub throttle: f64,
    pub brake: f64,
    pub steer: f64,
    pub handbrake: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ButtonReading {
    pub value: f64,
    pub pressed: bool,
}

/// Raw standard-mapping gamepad reading as reported by the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GamepadReading {
    pub axes: Vec<f64>,
    pub buttons: Vec<ButtonReading>,
}

const STEER_AXIS: usize = 0;
const BRAKE_AXIS: usize = 2;
const THROTTLE_AXIS: usize = 5;
const BRAKE_BUTTON: usize = 6;
const THROTTLE_BUTTON: usize = 7;
const HANDBRAKE_BUTTONS: [usize; 3] = [0, 1, 2];

impl AnalogState {
    /// Maps a gamepad reading; `None` (no pad connected) is neutral.
    pub fn from_gamepad(reading: Option<&GamepadReading>, steer_deadzone: f64) -> Self {
        let Some(pad) = reading else {
            return Self::default();
        };

        let axis = |index: usize| pad.axes.get(index).copied();
        let button = |index: usize| pad.buttons.get(index).copied().unwrap_or_default();

        let steer = apply_deadzone(axis(STEER_AXIS).unwrap_or(0.0), steer_deadzone);
        let throttle = read_trigger(axis(THROTTLE_AXIS)).max(button(THROTTLE_BUTTON).value);
        let brake = read_trigger(axis(BRAKE_AXIS)).max(button(BRAKE_BUTTON).value);
        let handbrake = HANDBRAKE_BUTTONS.iter().any(|&i| button(i).pressed);

        Self {
            throttle,
            brake,
            steer,
            handbrake,
        }
    }
}

/// Maps a trigger axis in `[-1, 1]` to `[0, 1]`.
pub fn read_trigger(axis: Option<f64>) -> f64 {
    match axis {
        Some(value) if value.is_finite() => ((value + 1.0) * 0.5).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Zeroes small stick deflections and rescales the rest to the full range.
pub fn apply_deadzone(value: f64, deadzone: f64) -> f64 {
    if !value.is_finite() || value.abs() <= deadzone {
        return 0.0;
    }
    let normalized = (value.abs() - deadzone) / (1.0 - deadzone);
    value.signum() * normalized.clamp(0.0, 1.0)
}

/// Fuses keyboard and analog sources into one intent record.
pub fn compose_input(
    keyboard: &KeyboardState,
    analog: &AnalogState,
    tuning: &NetTuning,
) -> InputSnapshot {
    let throttle = analog.throttle.max(if keyboard.up { 1.0 } else { 0.0 });
    let brake = analog.brake.max(if keyboard.down { 1.0 } else { 0.0 });

    // A single held direction key pins steering to full lock on its side.
    let mut steer = analog.steer;
    if keyboard.left && !keyboard.right {
        steer = steer.min(-1.0);
    } else if keyboard.right && !keyboard.left {
        steer = steer.max(1.0);
    }

    InputSnapshot {
        throttle,
        brake,
        steer,
        handbrake: keyboard.handbrake || analog.handbrake,
        up: throttle > tuning.pedal_flag_threshold,
        down: brake > tuning.pedal_flag_threshold,
        left: steer < -tuning.steer_flag_threshold,
        right: steer > tuning.steer_flag_threshold,
    }
}

/// Change-detection plus keepalive rate limiter for outbound input.
#[derive(Debug, Clone)]
pub struct InputCoalescer {
    min_interval_ms: f64,
    keepalive_ms: f64,
    last_signature: String,
    last_sent_at_ms: Option<f64>,
}

impl InputCoalescer {
    pub fn new(tuning: &NetTuning) -> Self {
        Self {
            min_interval_ms: tuning.input_min_interval_ms,
            keepalive_ms: tuning.input_keepalive_ms,
            last_signature: String::new(),
            last_sent_at_ms: None,
        }
    }

    /// Returns the snapshot to transmit, or `None` when the send is coalesced.
    pub fn maybe_send(
        &mut self,
        force: bool,
        now_ms: f64,
        snapshot: InputSnapshot,
    ) -> Option<InputSnapshot> {
        let signature = snapshot.signature();

        if !force {
            let changed = signature != self.last_signature;
            let (enough_time, keepalive_due) = match self.last_sent_at_ms {
                None => (true, true),
                Some(last) => {
                    let elapsed = now_ms - last;
                    (elapsed >= self.min_interval_ms, elapsed >= self.keepalive_ms)
                }
            };

            if !keepalive_due && !(changed && enough_time) {
                return None;
            }
        }

        self.last_signature = signature;
        self.last_sent_at_ms = Some(now_ms);
        Some(snapshot)
    }

    /// Forgets the last transmission so the next input goes out immediately.
    pub fn reset(&mut self) {
        self.last_signature.clear();
        self.last_sent_at_ms = None;
    }
}
