// Smoothed round-trip time and the interpolation delay derived from it.

use crate::domain::NetTuning;

#[derive(Debug, Clone)]
pub struct LatencyEstimator {
    smoothing: f64,
    baseline_ms: f64,
    min_delay_ms: f64,
    max_delay_ms: f64,
    smoothed_rtt_ms: Option<f64>,
    interpolation_delay_ms: f64,
}

impl LatencyEstimator {
    pub fn new(tuning: &NetTuning) -> Self {
        Self {
            smoothing: tuning.rtt_smoothing,
            baseline_ms: tuning.interpolation_baseline_ms,
            min_delay_ms: tuning.interpolation_min_ms,
            max_delay_ms: tuning.interpolation_max_ms,
            smoothed_rtt_ms: None,
            interpolation_delay_ms: bound(
                tuning.initial_interpolation_delay_ms,
                tuning.interpolation_min_ms,
                tuning.interpolation_max_ms,
            ),
        }
    }

    /// Folds one RTT sample. Non-finite or non-positive samples are ignored.
    pub fn update_latency(&mut self, rtt_ms: f64) {
        if !rtt_ms.is_finite() || rtt_ms <= 0.0 {
            return;
        }

        let rtt = match self.smoothed_rtt_ms {
            None => rtt_ms,
            Some(current) => current + (rtt_ms - current) * self.smoothing,
        };
        self.smoothed_rtt_ms = Some(rtt);

        // Keep a floor so two samples can bracket render time, and a ceiling
        // so visual lag stays bounded.
        self.interpolation_delay_ms =
            bound(self.baseline_ms + 0.5 * rtt, self.min_delay_ms, self.max_delay_ms);
    }

    pub fn smoothed_rtt_ms(&self) -> Option<f64> {
        self.smoothed_rtt_ms
    }

    pub fn interpolation_delay_ms(&self) -> f64 {
        self.interpolation_delay_ms
    }
}

// `f64::clamp` panics on inverted bounds; an inverted pair pins to `max`.
fn bound(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> LatencyEstimator {
        LatencyEstimator::new(&NetTuning::default())
    }

    #[test]
    fn first_sample_is_taken_directly() {
        let mut latency = estimator();
        assert_eq!(latency.smoothed_rtt_ms(), None);
        latency.update_latency(60.0);
        assert_eq!(latency.smoothed_rtt_ms(), Some(60.0));
        assert_eq!(latency.interpolation_delay_ms(), 75.0);
    }

    #[test]
    fn later_samples_blend_twenty_percent() {
        let mut latency = estimator();
        latency.update_latency(100.0);
        latency.update_latency(200.0);
        assert!((latency.smoothed_rtt_ms().unwrap() - 120.0).abs() < 1e-9);
        assert!((latency.interpolation_delay_ms() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_samples_are_ignored() {
        let mut latency = estimator();
        let before = latency.interpolation_delay_ms();
        latency.update_latency(0.0);
        latency.update_latency(-5.0);
        latency.update_latency(f64::NAN);
        latency.update_latency(f64::INFINITY);
        assert_eq!(latency.smoothed_rtt_ms(), None);
        assert_eq!(latency.interpolation_delay_ms(), before);
    }

    #[test]
    fn delay_is_clamped_to_range() {
        let mut low = estimator();
        low.update_latency(0.5);
        assert_eq!(low.interpolation_delay_ms(), 45.25);

        let mut high = estimator();
        high.update_latency(5_000.0);
        assert_eq!(high.interpolation_delay_ms(), 140.0);
    }

    #[test]
    fn delay_stays_in_range_and_grows_with_rtt() {
        let mut previous = f64::MIN;
        for rtt in [1.0, 10.0, 40.0, 80.0, 120.0, 190.0, 250.0, 1_000.0] {
            let mut latency = estimator();
            latency.update_latency(rtt);
            let delay = latency.interpolation_delay_ms();
            assert!((45.0..=140.0).contains(&delay), "delay {delay} for rtt {rtt}");
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn inverted_bounds_do_not_panic() {
        let tuning = NetTuning {
            interpolation_min_ms: 200.0,
            interpolation_max_ms: 100.0,
            ..NetTuning::default()
        };
        let mut latency = LatencyEstimator::new(&tuning);
        assert_eq!(latency.interpolation_delay_ms(), 100.0);
        latency.update_latency(50.0);
        assert_eq!(latency.interpolation_delay_ms(), 100.0);
    }

    #[test]
    fn initial_delay_is_inside_range() {
        let latency = estimator();
        assert_eq!(latency.interpolation_delay_ms(), 90.0);
    }
}
