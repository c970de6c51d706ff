use serde::Deserialize;

/// Netcode tuning for clock sync, interpolation and input coalescing.
///
/// Keep this separate from runtime configuration (URLs, timer cadences).
/// Every field can be overridden from a TOML file; missing keys keep the
/// defaults below.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetTuning {
    /// Fraction of the observed offset error applied per clock sample.
    pub clock_smoothing: f64,

    /// Fraction of the RTT error applied per latency sample.
    pub rtt_smoothing: f64,

    /// Interpolation delay before any RTT sample, in milliseconds.
    pub initial_interpolation_delay_ms: f64,
    pub interpolation_baseline_ms: f64,
    pub interpolation_min_ms: f64,
    pub interpolation_max_ms: f64,

    /// Longest forward projection past the newest sample before motion freezes.
    pub extrapolation_limit_ms: f64,

    /// Share of the distance moved from local prediction toward the network pose.
    pub self_reconcile_blend: f64,

    /// Minimum gap between sends when the input changed.
    pub input_min_interval_ms: f64,
    /// Gap after which unchanged input is resent anyway.
    pub input_keepalive_ms: f64,

    /// Analog magnitudes above which the legacy booleans turn on.
    pub pedal_flag_threshold: f64,
    pub steer_flag_threshold: f64,

    /// Gamepad stick dead zone for steering.
    pub steer_deadzone: f64,
}

impl Default for NetTuning {
    fn default() -> Self {
        Self {
            clock_smoothing: 0.08,
            rtt_smoothing: 0.2,
            initial_interpolation_delay_ms: 90.0,
            interpolation_baseline_ms: 45.0,
            interpolation_min_ms: 45.0,
            interpolation_max_ms: 140.0,
            extrapolation_limit_ms: 80.0,
            self_reconcile_blend: 0.35,
            input_min_interval_ms: 60.0,
            input_keepalive_ms: 180.0,
            pedal_flag_threshold: 0.05,
            steer_flag_threshold: 0.1,
            steer_deadzone: 0.14,
        }
    }
}

impl NetTuning {
    /// Rejects values the filters and clamps cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("clock_smoothing", self.clock_smoothing),
            ("rtt_smoothing", self.rtt_smoothing),
            ("initial_interpolation_delay_ms", self.initial_interpolation_delay_ms),
            ("interpolation_baseline_ms", self.interpolation_baseline_ms),
            ("interpolation_min_ms", self.interpolation_min_ms),
            ("interpolation_max_ms", self.interpolation_max_ms),
            ("extrapolation_limit_ms", self.extrapolation_limit_ms),
            ("self_reconcile_blend", self.self_reconcile_blend),
            ("input_min_interval_ms", self.input_min_interval_ms),
            ("input_keepalive_ms", self.input_keepalive_ms),
            ("pedal_flag_threshold", self.pedal_flag_threshold),
            ("steer_flag_threshold", self.steer_flag_threshold),
            ("steer_deadzone", self.steer_deadzone),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(format!("{name} must be finite, got {value}"));
        }

        for (name, value) in [
            ("clock_smoothing", self.clock_smoothing),
            ("rtt_smoothing", self.rtt_smoothing),
            ("self_reconcile_blend", self.self_reconcile_blend),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be within [0, 1], got {value}"));
            }
        }

        if self.interpolation_min_ms < 0.0 {
            return Err(format!(
                "interpolation_min_ms must not be negative, got {}",
                self.interpolation_min_ms
            ));
        }
        if self.interpolation_min_ms > self.interpolation_max_ms {
            return Err(format!(
                "interpolation_min_ms ({}) exceeds interpolation_max_ms ({})",
                self.interpolation_min_ms, self.interpolation_max_ms
            ));
        }

        for (name, value) in [
            ("extrapolation_limit_ms", self.extrapolation_limit_ms),
            ("input_min_interval_ms", self.input_min_interval_ms),
            ("input_keepalive_ms", self.input_keepalive_ms),
        ] {
            if value < 0.0 {
                return Err(format!("{name} must not be negative, got {value}"));
            }
        }

        if !(0.0..1.0).contains(&self.steer_deadzone) {
            return Err(format!(
                "steer_deadzone must be within [0, 1), got {}",
                self.steer_deadzone
            ));
        }
        Ok(())
    }
}
