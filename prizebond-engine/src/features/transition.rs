use serde::Serialize;

use super::digits::last_digit;

pub const DIGITS: usize = 10;

/// counts[i][j] = number of times last digit `j` followed last digit `i`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TransitionCounts {
    pub counts: [[u64; DIGITS]; DIGITS],
}

/// Row-normalized transition counts. Rows never left from stay all-zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TransitionMatrix {
    pub probs: [[f64; DIGITS]; DIGITS],
}

/// Counts last-digit transitions between consecutive draws of a series (oldest first).
/// Series shorter than 2 give an all-zero matrix.
pub fn build_count_matrix(series: &[u64]) -> TransitionCounts {
    let mut counts = [[0u64; DIGITS]; DIGITS];
    for pair in series.windows(2) {
        let from = last_digit(pair[0]) as usize;
        let to = last_digit(pair[1]) as usize;
        counts[from][to] += 1;
    }
    TransitionCounts { counts }
}

pub fn normalize(counts: &TransitionCounts) -> TransitionMatrix {
    let mut probs = [[0.0f64; DIGITS]; DIGITS];
    for (from, row) in counts.counts.iter().enumerate() {
        let total: u64 = row.iter().sum();
        if total == 0 {
            continue;
        }
        for (to, &c) in row.iter().enumerate() {
            probs[from][to] = c as f64 / total as f64;
        }
    }
    TransitionMatrix { probs }
}

/// Negative natural log of a transition probability.
/// A zero (or otherwise unusable) probability has no defined surprise.
pub fn surprise(probability: f64) -> Option<f64> {
    if !(probability > 0.0 && probability <= 1.0) {
        return None;
    }
    let s = -probability.ln();
    // ln(1.0) negates to -0.0
    Some(if s == 0.0 { 0.0 } else { s })
}

impl TransitionCounts {
    pub fn row_sum(&self, from: usize) -> u64 {
        self.counts[from].iter().sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }
}

impl TransitionMatrix {
    pub fn from_series(series: &[u64]) -> Self {
        normalize(&build_count_matrix(series))
    }

    pub fn probability(&self, from: u8, to: u8) -> f64 {
        self.probs[from as usize][to as usize]
    }

    pub fn row(&self, from: u8) -> &[f64; DIGITS] {
        &self.probs[from as usize]
    }

    /// Probability of each observed transition, looked up by (previous, current)
    /// last-digit pair. The first observation has no predecessor and yields `None`.
    pub fn lookup_series(&self, series: &[u64]) -> Vec<Option<f64>> {
        let mut probs = Vec::with_capacity(series.len());
        if series.is_empty() {
            return probs;
        }
        probs.push(None);
        probs.extend(
            series
                .windows(2)
                .map(|pair| Some(self.probability(last_digit(pair[0]), last_digit(pair[1])))),
        );
        probs
    }
}

/// One possible last digit for the next draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextDigit {
    pub digit: u8,
    pub probability: f64,
    /// Latest prize number with its last digit replaced.
    pub candidate: u64,
}

/// Ranks next-draw last digits from the transition row of the most recent last digit.
/// Ties go to the smaller digit.
pub fn next_digit_ranking(series: &[u64], top_n: usize) -> Vec<NextDigit> {
    let Some(&latest) = series.last() else {
        return Vec::new();
    };
    let matrix = TransitionMatrix::from_series(series);
    rank_digits(latest, matrix.row(last_digit(latest)), top_n)
}

/// Transition row reweighted by closeness to the recent rolling level:
/// `w[d] = exp(-|d - mean mod 10| / (std + 1e-6))`, then renormalized.
/// When no digit keeps any mass every probability is 0.
pub fn weighted_next_digit_ranking(
    series: &[u64],
    rolling_mean: f64,
    rolling_std: f64,
    top_n: usize,
) -> Vec<NextDigit> {
    let Some(&latest) = series.last() else {
        return Vec::new();
    };
    let matrix = TransitionMatrix::from_series(series);
    let row = matrix.row(last_digit(latest));

    let center = rolling_mean.rem_euclid(10.0);
    let scale = rolling_std.max(0.0) + 1e-6;
    let mut combined = [0.0f64; DIGITS];
    for (d, c) in combined.iter_mut().enumerate() {
        *c = row[d] * (-(d as f64 - center).abs() / scale).exp();
    }

    let total: f64 = combined.iter().sum();
    if total > 0.0 && total.is_finite() {
        for c in combined.iter_mut() {
            *c /= total;
        }
    } else {
        combined = [0.0; DIGITS];
    }
    rank_digits(latest, &combined, top_n)
}

fn rank_digits(latest: u64, probs: &[f64; DIGITS], top_n: usize) -> Vec<NextDigit> {
    let mut ranked: Vec<NextDigit> = (0..DIGITS as u8)
        .map(|digit| NextDigit {
            digit,
            probability: probs[digit as usize],
            candidate: (latest / 10) * 10 + digit as u64,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.digit.cmp(&b.digit))
    });
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_matrix_scenario() {
        let counts = build_count_matrix(&[10, 20, 13, 24]);
        assert_eq!(counts.counts[0][0], 1);
        assert_eq!(counts.counts[0][3], 1);
        assert_eq!(counts.counts[3][4], 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_normalized_row_scenario() {
        let probs = normalize(&build_count_matrix(&[10, 20, 13, 24]));
        let expected = [0.5, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        for (p, e) in probs.probs[0].iter().zip(expected.iter()) {
            assert!((p - e).abs() < 1e-12);
        }
        assert!((probs.probs[3][4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rows_sum_to_one_or_zero() {
        let series: Vec<u64> = (0..200u64).map(|i| (i * 7919 + i * i * 31) % 1_000_000).collect();
        let counts = build_count_matrix(&series);
        let probs = normalize(&counts);
        for from in 0..DIGITS {
            let sum: f64 = probs.probs[from].iter().sum();
            if counts.row_sum(from) > 0 {
                assert!((sum - 1.0).abs() < 1e-9, "row {} sums to {}", from, sum);
            } else {
                assert_eq!(sum, 0.0);
            }
            assert!(probs.probs[from].iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_short_series_is_zero() {
        assert_eq!(build_count_matrix(&[]).total(), 0);
        assert_eq!(build_count_matrix(&[123456]).total(), 0);
        let probs = TransitionMatrix::from_series(&[5]);
        assert!(probs.probs.iter().flatten().all(|&p| p == 0.0));
    }

    #[test]
    fn test_surprise_contract() {
        assert_eq!(surprise(1.0), Some(0.0));
        assert_eq!(surprise(0.0), None);
        assert_eq!(surprise(f64::NAN), None);
        assert!((surprise(0.5).unwrap() - 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_surprise_strictly_decreasing() {
        let ps = [0.001, 0.01, 0.1, 0.25, 0.5, 0.75, 0.9, 0.99, 1.0];
        for pair in ps.windows(2) {
            assert!(surprise(pair[0]).unwrap() > surprise(pair[1]).unwrap());
        }
    }

    #[test]
    fn test_lookup_series() {
        let series = [10, 20, 13, 24];
        let matrix = TransitionMatrix::from_series(&series);
        let probs = matrix.lookup_series(&series);
        assert_eq!(probs.len(), 4);
        assert_eq!(probs[0], None);
        assert!((probs[1].unwrap() - 0.5).abs() < 1e-12);
        assert!((probs[2].unwrap() - 0.5).abs() < 1e-12);
        assert!((probs[3].unwrap() - 1.0).abs() < 1e-12);
        assert!(matrix.lookup_series(&[]).is_empty());
    }

    #[test]
    fn test_next_digit_ranking() {
        // last digits 0,3,0,3,0 -> after 0 always comes 3
        let series = [100, 203, 310, 413, 520];
        let ranking = next_digit_ranking(&series, 3);
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[0].digit, 3);
        assert!((ranking[0].probability - 1.0).abs() < 1e-12);
        assert_eq!(ranking[0].candidate, 523);
        // remaining zero-probability digits in ascending order
        assert_eq!(ranking[1].digit, 0);
        assert_eq!(ranking[2].digit, 1);
        assert!(next_digit_ranking(&[], 5).is_empty());
    }

    #[test]
    fn test_weighted_ranking_prefers_digits_near_rolling_mean() {
        // after last digit 0 come 3 and 7 equally often
        let series = [10, 23, 30, 47, 50];
        let plain = next_digit_ranking(&series, 2);
        assert_eq!(plain[0].digit, 3);

        let weighted = weighted_next_digit_ranking(&series, 1257.0, 1.0, 3);
        assert_eq!(weighted[0].digit, 7);
        assert_eq!(weighted[0].candidate, 57);
        let expected = 1.0 / (1.0 + (-4.0f64).exp());
        assert!((weighted[0].probability - expected).abs() < 1e-6);
        assert_eq!(weighted[1].digit, 3);
        assert!((weighted[0].probability + weighted[1].probability - 1.0).abs() < 1e-12);
        assert_eq!(weighted[2].probability, 0.0);
    }

    #[test]
    fn test_weighted_ranking_without_mass() {
        // zero spread away from any digit leaves every weight at 0
        let series = [10, 23, 30, 47, 50];
        let ranking = weighted_next_digit_ranking(&series, 5.5, 0.0, 10);
        assert_eq!(ranking.len(), 10);
        assert!(ranking.iter().all(|n| n.probability == 0.0));
        assert_eq!(ranking[0].digit, 0);
        assert!(weighted_next_digit_ranking(&[], 5.0, 1.0, 3).is_empty());
    }
}
