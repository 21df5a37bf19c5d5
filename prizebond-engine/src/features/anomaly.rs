use super::rolling::{mean_std, window_range};

/// Standard deviations at or below this are treated as a flat signal.
pub const FLAT_STD_EPSILON: f64 = 1e-12;

/// Residual z-scores of a surprise signal against its trailing baseline.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnomalySeries {
    pub expected: Vec<f64>,
    pub residual: Vec<f64>,
    pub local_std: Vec<f64>,
    pub zscore: Vec<f64>,
    pub is_anomaly: Vec<bool>,
}

impl AnomalySeries {
    pub fn anomaly_count(&self) -> usize {
        self.is_anomaly.iter().filter(|&&a| a).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    pub window: usize,
    pub threshold: f64,
}

impl AnomalyDetector {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self { window, threshold }
    }

    /// `surprise` must already be filled (no undefined entries).
    ///
    /// The expectation for draw `i` is the mean of the up-to-`window` values before it,
    /// or the value itself for the first draw. The local spread is the population std of
    /// the trailing window ending at `i`. A flat window yields z = 0.
    pub fn detect(&self, surprise: &[f64]) -> AnomalySeries {
        let n = surprise.len();
        let mut out = AnomalySeries {
            expected: Vec::with_capacity(n),
            residual: Vec::with_capacity(n),
            local_std: Vec::with_capacity(n),
            zscore: Vec::with_capacity(n),
            is_anomaly: Vec::with_capacity(n),
        };

        for i in 0..n {
            let expected = if i == 0 {
                surprise[0]
            } else {
                mean_std(&surprise[window_range(i - 1, self.window)]).0
            };
            let residual = surprise[i] - expected;
            let local_std = mean_std(&surprise[window_range(i, self.window)]).1;

            let zscore = if local_std.is_finite() && local_std > FLAT_STD_EPSILON {
                residual / local_std
            } else {
                0.0
            };

            out.expected.push(expected);
            out.residual.push(residual);
            out.local_std.push(local_std);
            out.zscore.push(zscore);
            out.is_anomaly.push(zscore.abs() > self.threshold);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_scenario() {
        let detector = AnomalyDetector::new(3, 2.0);
        let result = detector.detect(&[0.1, 0.1, 0.1, 5.0, 0.1]);
        assert_eq!(result.is_anomaly, vec![false, false, false, true, false]);
        assert!(result.zscore[3] > 2.0);
        assert_eq!(result.anomaly_count(), 1);
    }

    #[test]
    fn test_flat_window_never_flags() {
        let detector = AnomalyDetector::new(2, 0.5);
        // at i = 2 the residual against [5, 1] is -2 but the window [1, 1] is flat
        let result = detector.detect(&[5.0, 1.0, 1.0]);
        assert!(result.residual[2] < 0.0);
        assert_eq!(result.local_std[2], 0.0);
        assert_eq!(result.zscore[2], 0.0);
        assert!(!result.is_anomaly[2]);

        // positive residual: expected 3 from [1, 5], window [5, 5] flat
        let rising = detector.detect(&[1.0, 5.0, 5.0]);
        assert!((rising.residual[2] - 2.0).abs() < 1e-12);
        assert_eq!(rising.local_std[2], 0.0);
        assert_eq!(rising.zscore[2], 0.0);
        assert!(!rising.is_anomaly[2]);

        let constant = detector.detect(&[0.7; 12]);
        assert!(constant.is_anomaly.iter().all(|&a| !a));
        assert!(constant.zscore.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn test_first_observation_baseline() {
        let detector = AnomalyDetector::new(10, 2.0);
        let result = detector.detect(&[3.0, 1.0]);
        assert_eq!(result.expected[0], 3.0);
        assert_eq!(result.residual[0], 0.0);
        assert_eq!(result.zscore[0], 0.0);
        // fewer than `window` prior values: mean of what is available
        assert_eq!(result.expected[1], 3.0);
        assert_eq!(result.residual[1], -2.0);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let signal = [0.1, 0.1, 0.1, 5.0, 0.1];
        let strict = AnomalyDetector::new(3, 3.0).detect(&signal);
        assert_eq!(strict.anomaly_count(), 0);
        let loose = AnomalyDetector::new(3, 0.5).detect(&signal);
        assert!(loose.is_anomaly[3]);
    }

    #[test]
    fn test_empty_signal() {
        let result = AnomalyDetector::new(10, 2.0).detect(&[]);
        assert!(result.zscore.is_empty());
        assert_eq!(result.anomaly_count(), 0);
    }
}
