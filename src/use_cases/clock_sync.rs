// Low-pass filtered offset between the local clock and authoritative time.

#[derive(Debug, Clone)]
pub struct ClockSynchronizer {
    smoothing: f64,
    offset_ms: Option<f64>,
}

impl ClockSynchronizer {
    pub fn new(smoothing: f64) -> Self {
        Self {
            smoothing,
            offset_ms: None,
        }
    }

    /// Folds one authoritative timestamp (seconds) observed at `local_now_ms`.
    ///
    /// Missing or non-finite timestamps leave the offset untouched.
    pub fn update_offset(&mut self, authoritative_time_s: Option<f64>, local_now_ms: f64) {
        let Some(server_s) = authoritative_time_s.filter(|t| t.is_finite()) else {
            return;
        };
        let sample = server_s * 1000.0 - local_now_ms;
        match self.offset_ms {
            None => self.offset_ms = Some(sample),
            Some(ref mut offset) => *offset += (sample - *offset) * self.smoothing,
        }
    }

    /// Current offset; zero until the first sample arrives.
    pub fn offset_ms(&self) -> f64 {
        self.offset_ms.unwrap_or(0.0)
    }

    pub fn is_synchronized(&self) -> bool {
        self.offset_ms.is_some()
    }

    /// Authoritative time estimate for a local timestamp.
    pub fn to_authoritative_ms(&self, local_ms: f64) -> f64 {
        local_ms + self.offset_ms()
    }

    pub fn reset(&mut self) {
        self.offset_ms = None;
    }
}
