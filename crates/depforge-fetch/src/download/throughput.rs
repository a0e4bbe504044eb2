use std::time::Duration;

/// Smoothing factor of the moving-average rate estimate.
pub const DEFAULT_ALPHA: f64 = 0.001;

/// Exponentially smoothed transfer-rate estimate.
///
/// The first sample seeds the estimate; later samples move it by `alpha`
/// times the difference, so a single fast or stalled chunk barely shifts the
/// reported ETA.
#[derive(Debug, Clone)]
pub struct ThroughputEstimator {
    alpha: f64,
    rate: Option<f64>,
}

impl Default for ThroughputEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

impl ThroughputEstimator {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            rate: None,
        }
    }

    /// Feed one chunk of `bytes` that took `elapsed`.
    pub fn update(&mut self, bytes: u64, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        if secs <= 0.0 {
            return;
        }
        let sample = bytes as f64 / secs;
        self.rate = Some(match self.rate {
            None => sample,
            Some(rate) => rate + self.alpha * (sample - rate),
        });
    }

    /// Bytes per second, once at least one timed sample arrived.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        match self.rate {
            Some(rate) if rate > 0.0 => Some(Duration::from_secs_f64(remaining as f64 / rate)),
            _ => None,
        }
    }
}

/// Time a chunk of `bytes` must take to stay under `max_bytes_per_second`.
///
/// Returns `None` when throttling is disabled.
pub fn nominal_interval(bytes: u64, max_bytes_per_second: u64) -> Option<Duration> {
    if max_bytes_per_second == 0 {
        return None;
    }
    Some(Duration::from_secs_f64(
        bytes as f64 / max_bytes_per_second as f64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_rate() {
        let mut est = ThroughputEstimator::default();
        assert!(est.rate().is_none());
        est.update(1000, Duration::from_secs(1));
        assert_eq!(est.rate(), Some(1000.0));
    }

    #[test]
    fn test_smoothing_moves_slowly() {
        let mut est = ThroughputEstimator::default();
        est.update(1000, Duration::from_secs(1));
        est.update(1_001_000, Duration::from_secs(1));
        let rate = est.rate().unwrap();
        assert!((rate - 2000.0).abs() < 1e-6, "rate was {}", rate);
    }

    #[test]
    fn test_eta() {
        let mut est = ThroughputEstimator::new(0.5);
        est.update(500, Duration::from_millis(500));
        assert_eq!(est.eta(3000), Some(Duration::from_secs(3)));
        assert!(ThroughputEstimator::default().eta(10).is_none());
    }

    #[test]
    fn test_zero_elapsed_is_ignored() {
        let mut est = ThroughputEstimator::default();
        est.update(4096, Duration::ZERO);
        assert!(est.rate().is_none());
    }

    #[test]
    fn test_nominal_interval() {
        assert_eq!(nominal_interval(4096, 0), None);
        assert_eq!(
            nominal_interval(2048, 4096),
            Some(Duration::from_millis(500))
        );
    }
}
