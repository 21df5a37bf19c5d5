use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::features::transition::DIGITS;

/// Rounds a member vote onto the digit range. Non-finite votes fall back to 0.
pub fn vote_to_digit(vote: f64) -> u8 {
    if !vote.is_finite() {
        return 0;
    }
    vote.round().clamp(0.0, 9.0) as u8
}

/// Empirical distribution over digit values for one digit position.
///
/// Probabilities are exact ratios `counts[d] / n_votes`; the counts are kept so that
/// joint probabilities can be compared without rounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitVoteDistribution {
    position: usize,
    counts: [u64; DIGITS],
    probs: [f64; DIGITS],
    n_votes: u64,
}

impl DigitVoteDistribution {
    /// Histogram of the rounded, clamped member votes.
    pub fn from_votes(position: usize, votes: &[f64]) -> Result<Self> {
        let mut counts = [0u64; DIGITS];
        for &v in votes {
            counts[vote_to_digit(v) as usize] += 1;
        }
        Self::from_counts(position, counts)
    }

    /// Zero total count is degenerate.
    pub fn from_counts(position: usize, counts: [u64; DIGITS]) -> Result<Self> {
        let n_votes: u64 = counts.iter().sum();
        if n_votes == 0 {
            return Err(EngineError::DegenerateDistribution { position });
        }
        let probs = counts.map(|c| c as f64 / n_votes as f64);
        Ok(Self { position, counts, probs, n_votes })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn counts(&self) -> &[u64; DIGITS] {
        &self.counts
    }

    pub fn probs(&self) -> &[f64; DIGITS] {
        &self.probs
    }

    pub fn probability(&self, digit: u8) -> f64 {
        self.probs.get(digit as usize).copied().unwrap_or(0.0)
    }

    pub fn n_votes(&self) -> u64 {
        self.n_votes
    }

    /// Most voted digit; ties go to the lower digit.
    pub fn mode(&self) -> u8 {
        let mut best = 0;
        for d in 1..DIGITS {
            if self.counts[d] > self.counts[best] {
                best = d;
            }
        }
        best as u8
    }

    /// Digits with at least one vote, most voted first (ties: ascending digit).
    pub fn support(&self) -> Vec<(u8, f64)> {
        let mut digits: Vec<u8> = (0..DIGITS as u8)
            .filter(|&d| self.counts[d as usize] > 0)
            .collect();
        digits.sort_by(|a, b| {
            self.counts[*b as usize]
                .cmp(&self.counts[*a as usize])
                .then(a.cmp(b))
        });
        digits
            .into_iter()
            .map(|d| (d, self.probs[d as usize]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_to_digit() {
        assert_eq!(vote_to_digit(3.4), 3);
        assert_eq!(vote_to_digit(3.5), 4);
        assert_eq!(vote_to_digit(-1.2), 0);
        assert_eq!(vote_to_digit(12.0), 9);
        assert_eq!(vote_to_digit(f64::NAN), 0);
    }

    #[test]
    fn test_histogram_sums_to_one() {
        let votes = [2.9, 3.1, 3.4, 7.0, 6.6, 11.0, -0.4, 3.0];
        let dist = DigitVoteDistribution::from_votes(2, &votes).unwrap();
        let sum: f64 = dist.probs().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(dist.n_votes(), 8);
        assert_eq!(dist.counts()[3], 4);
        assert!((dist.probability(3) - 0.5).abs() < 1e-12);
        assert!((dist.probability(7) - 0.25).abs() < 1e-12);
        assert!((dist.probability(9) - 0.125).abs() < 1e-12);
        assert!((dist.probability(0) - 0.125).abs() < 1e-12);
        assert_eq!(dist.mode(), 3);
        assert_eq!(dist.position(), 2);
    }

    #[test]
    fn test_no_votes_is_degenerate() {
        assert_eq!(
            DigitVoteDistribution::from_votes(4, &[]),
            Err(EngineError::DegenerateDistribution { position: 4 })
        );
        assert!(DigitVoteDistribution::from_counts(1, [0; DIGITS]).is_err());
    }

    #[test]
    fn test_support_order() {
        let mut counts = [0; DIGITS];
        counts[7] = 2;
        counts[1] = 2;
        counts[4] = 1;
        let dist = DigitVoteDistribution::from_counts(0, counts).unwrap();
        let digits: Vec<u8> = dist.support().iter().map(|(d, _)| *d).collect();
        assert_eq!(digits, vec![1, 7, 4]);
        assert_eq!(dist.mode(), 1);
    }
}
