use std::ops::Range;

use super::digits::last_digit;
use super::transition::DIGITS;

/// Trailing window `[max(0, i-w+1), i]`. Windows shrink at the start of the series
/// instead of being undefined.
pub fn window_range(i: usize, window: usize) -> Range<usize> {
    let w = window.max(1);
    (i + 1).saturating_sub(w)..i + 1
}

/// Mean and population standard deviation. Empty input gives (0, 0).
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn rolling_mean(series: &[f64], window: usize) -> Vec<f64> {
    (0..series.len())
        .map(|i| mean_std(&series[window_range(i, window)]).0)
        .collect()
}

/// Population standard deviation over the trailing window; single-element windows give 0.
pub fn rolling_std(series: &[f64], window: usize) -> Vec<f64> {
    (0..series.len())
        .map(|i| mean_std(&series[window_range(i, window)]).1)
        .collect()
}

fn digit_counts(values: &[u64]) -> [usize; DIGITS] {
    let mut counts = [0usize; DIGITS];
    for &v in values {
        counts[last_digit(v) as usize] += 1;
    }
    counts
}

/// Shannon entropy (nats) of the last-digit distribution.
pub fn last_digit_entropy(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let h: f64 = digit_counts(values)
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum();
    // a single distinct digit gives -1 * ln(1) = -0.0
    h.max(0.0)
}

/// Number of maximal runs of equal adjacent values. Fewer than two values count as 0 runs.
pub fn runs_count(values: &[u64]) -> usize {
    if values.len() < 2 {
        return 0;
    }
    1 + values.windows(2).filter(|pair| pair[0] != pair[1]).count()
}

/// How far the most frequent last digit sits above the mean bin count.
pub fn digit_dominance(values: &[u64]) -> f64 {
    let counts = digit_counts(values);
    let max = counts.iter().copied().max().unwrap_or(0) as f64;
    let mean = values.len() as f64 / DIGITS as f64;
    max - mean
}

/// The five windowed statistics of one prize series, index-aligned with the series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RollingStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub entropy: Vec<f64>,
    pub runs: Vec<f64>,
    pub dominance: Vec<f64>,
}

impl RollingStats {
    pub fn compute(series: &[u64], window: usize) -> Self {
        let values: Vec<f64> = series.iter().map(|&v| v as f64).collect();
        let n = series.len();

        let mut stats = RollingStats {
            mean: rolling_mean(&values, window),
            std: rolling_std(&values, window),
            entropy: Vec::with_capacity(n),
            runs: Vec::with_capacity(n),
            dominance: Vec::with_capacity(n),
        };

        for i in 0..n {
            let w = &series[window_range(i, window)];
            stats.entropy.push(last_digit_entropy(w));
            stats.runs.push(runs_count(w) as f64);
            stats.dominance.push(digit_dominance(w));
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_range_shrinks_at_start() {
        assert_eq!(window_range(0, 3), 0..1);
        assert_eq!(window_range(1, 3), 0..2);
        assert_eq!(window_range(4, 3), 2..5);
        assert_eq!(window_range(4, 0), 4..5);
    }

    #[test]
    fn test_rolling_mean_scenario() {
        let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        let expected = [1.0, 1.5, 2.0, 3.0, 4.0];
        assert_eq!(means.len(), expected.len());
        for (m, e) in means.iter().zip(expected.iter()) {
            assert!((m - e).abs() < 1e-12, "{} != {}", m, e);
        }
    }

    #[test]
    fn test_constant_series() {
        for &v in &[0.0, 7.0, 0.1, 871778.0] {
            for window in [1, 2, 5, 10, 50] {
                let series = vec![v; 20];
                for m in rolling_mean(&series, window) {
                    assert!((m - v).abs() < 1e-9);
                }
                for s in rolling_std(&series, window) {
                    assert!(s.abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_rolling_std_population() {
        // [2, 4]: mean 3, population std 1
        let stds = rolling_std(&[2.0, 4.0], 2);
        assert_eq!(stds[0], 0.0);
        assert!((stds[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_entropy() {
        assert_eq!(last_digit_entropy(&[11, 21, 31]), 0.0);
        assert_eq!(last_digit_entropy(&[]), 0.0);
        // two digits, equally likely
        assert!((last_digit_entropy(&[10, 21]) - 2f64.ln()).abs() < 1e-12);
        // ten distinct digits: ln(10)
        let all: Vec<u64> = (0..10).collect();
        assert!((last_digit_entropy(&all) - 10f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_runs_count() {
        assert_eq!(runs_count(&[5]), 0);
        assert_eq!(runs_count(&[]), 0);
        assert_eq!(runs_count(&[1, 2, 1, 2, 1]), 5);
        assert_eq!(runs_count(&[3, 3, 3]), 1);
        assert_eq!(runs_count(&[1, 1, 2, 2, 1]), 3);
    }

    #[test]
    fn test_digit_dominance() {
        // 10 values, digit 7 appears 4 times, mean bin count 1
        let values = [7, 17, 27, 37, 1, 2, 3, 4, 5, 6];
        assert!((digit_dominance(&values) - 3.0).abs() < 1e-12);
        // one value: max 1, mean 0.1
        assert!((digit_dominance(&[9]) - 0.9).abs() < 1e-12);
        assert_eq!(digit_dominance(&[]), 0.0);
    }

    #[test]
    fn test_compute_aligned_and_defined() {
        let series: Vec<u64> = vec![871778, 305917, 871778, 120034, 999999, 500000];
        let stats = RollingStats::compute(&series, 3);
        assert_eq!(stats.len(), series.len());
        assert_eq!(stats.runs[0], 0.0);
        assert_eq!(stats.std[0], 0.0);
        assert_eq!(stats.entropy[0], 0.0);
        for column in [&stats.mean, &stats.std, &stats.entropy, &stats.runs, &stats.dominance] {
            assert!(column.iter().all(|v| v.is_finite()));
        }
    }
}
