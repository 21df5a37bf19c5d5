use std::cmp::Ordering;

use serde::Serialize;

use super::votes::DigitVoteDistribution;
use crate::features::digits::join_digits;

/// A full prize number assembled from per-position digits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub value: u64,
    pub digits: Vec<u8>,
    /// Product of the per-position digit probabilities.
    pub probability: f64,
}

#[derive(Debug, Clone)]
struct Partial {
    digits: Vec<u8>,
    /// Product of the per-position vote counts.
    weight: u128,
    probability: f64,
}

/// Higher joint weight first, then lower number. Equal-length digit prefixes compare
/// lexicographically the same way their numeric values do.
fn rank_order(a: &Partial, b: &Partial, exact: bool) -> Ordering {
    let by_weight = if exact {
        b.weight.cmp(&a.weight)
    } else {
        b.probability.partial_cmp(&a.probability).unwrap_or(Ordering::Equal)
    };
    by_weight.then_with(|| a.digits.cmp(&b.digits))
}

/// Top-`top_k` candidates by joint probability, positions treated as independent.
///
/// Beam search keeping `top_k` prefixes per position. Any prefix of a final top-k
/// candidate is itself in the top-k prefixes at its length, so the result is exact.
/// Only digits with nonzero probability are used; fewer than `top_k` candidates come
/// back when the distributions do not support that many.
///
/// Ranking compares the integer product of vote counts, so candidates with equal
/// joint probability always fall back to ascending value. The float products are
/// only used when the total vote product does not fit in a `u128`.
pub fn rank_candidates(distributions: &[DigitVoteDistribution], top_k: usize) -> Vec<Candidate> {
    if distributions.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let denominator = distributions
        .iter()
        .try_fold(1u128, |acc, d| acc.checked_mul(u128::from(d.n_votes())));
    let exact = denominator.is_some();
    if !exact {
        log::warn!("vote product overflows, ranking on float probabilities");
    }

    let mut beam = vec![Partial {
        digits: Vec::with_capacity(distributions.len()),
        weight: 1,
        probability: 1.0,
    }];

    for dist in distributions {
        let support = dist.support();
        let counts = dist.counts();
        let mut next = Vec::with_capacity(beam.len() * support.len());
        for partial in &beam {
            for &(digit, p) in &support {
                let mut digits = partial.digits.clone();
                digits.push(digit);
                next.push(Partial {
                    digits,
                    weight: partial
                        .weight
                        .saturating_mul(u128::from(counts[digit as usize])),
                    probability: partial.probability * p,
                });
            }
        }
        next.sort_by(|a, b| rank_order(a, b, exact));
        next.truncate(top_k);
        beam = next;
    }

    beam.into_iter()
        .map(|p| Candidate {
            value: join_digits(&p.digits),
            probability: match denominator {
                Some(total) => p.weight as f64 / total as f64,
                None => p.probability,
            },
            digits: p.digits,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::transition::DIGITS;

    fn dist(position: usize, entries: &[(usize, u64)]) -> DigitVoteDistribution {
        let mut counts = [0; DIGITS];
        for &(d, c) in entries {
            counts[d] = c;
        }
        DigitVoteDistribution::from_counts(position, counts).unwrap()
    }

    #[test]
    fn test_two_position_scenario() {
        let dists = [dist(0, &[(3, 6), (7, 4)]), dist(1, &[(1, 1), (9, 1)])];
        let ranked = rank_candidates(&dists, 5);
        let values: Vec<u64> = ranked.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![31, 39, 71, 79]);

        let probs: Vec<f64> = ranked.iter().map(|c| c.probability).collect();
        for (p, e) in probs.iter().zip([0.30, 0.30, 0.20, 0.20]) {
            assert!((p - e).abs() < 1e-12);
        }
        assert_eq!(ranked[0].digits, vec![3, 1]);
    }

    #[test]
    fn test_top_k_truncates() {
        let dists = [dist(0, &[(3, 6), (7, 4)]), dist(1, &[(1, 1), (9, 1)])];
        let ranked = rank_candidates(&dists, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[1].value, 39);
    }

    #[test]
    fn test_mirrored_ties_rank_by_value() {
        // Same joint probability for 123 and 321, but the float products differ
        // depending on multiplication order.
        let outer = [1.0, 1.0, 1.0, 3.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        let middle = [2.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let dists = [
            DigitVoteDistribution::from_votes(0, &outer).unwrap(),
            DigitVoteDistribution::from_votes(1, &middle).unwrap(),
            DigitVoteDistribution::from_votes(2, &outer).unwrap(),
        ];
        let ranked = rank_candidates(&dists, 100);

        let pos = |v: u64| ranked.iter().position(|c| c.value == v).unwrap();
        assert!(pos(123) < pos(321));
        assert_eq!(ranked[pos(123)].probability, ranked[pos(321)].probability);
        for pair in ranked.windows(2) {
            assert!(
                pair[0].probability > pair[1].probability
                    || (pair[0].probability == pair[1].probability && pair[0].value < pair[1].value)
            );
        }
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let dists: Vec<DigitVoteDistribution> = (0..6)
            .map(|p| dist(p, &[(p, 1), ((p + 3) % 10, 1), ((p + 5) % 10, 2)]))
            .collect();
        let a = rank_candidates(&dists, 10);
        let b = rank_candidates(&dists, 10);
        assert_eq!(a, b);
        for pair in a.windows(2) {
            assert!(
                pair[0].probability > pair[1].probability
                    || (pair[0].probability == pair[1].probability && pair[0].value < pair[1].value)
            );
        }
    }

    #[test]
    fn test_matches_exhaustive_ranking() {
        let dists = [
            dist(0, &[(0, 2), (4, 3), (8, 5)]),
            dist(1, &[(2, 5), (5, 5)]),
            dist(2, &[(1, 1), (6, 6), (9, 3)]),
        ];
        let mut all = Vec::new();
        for &(a, _) in &dists[0].support() {
            for &(b, _) in &dists[1].support() {
                for &(c, _) in &dists[2].support() {
                    let weight = dists[0].counts()[a as usize]
                        * dists[1].counts()[b as usize]
                        * dists[2].counts()[c as usize];
                    all.push((join_digits(&[a, b, c]), weight));
                }
            }
        }
        all.sort_by(|x, y| y.1.cmp(&x.1).then(x.0.cmp(&y.0)));

        let ranked = rank_candidates(&dists, 7);
        let values: Vec<u64> = ranked.iter().map(|c| c.value).collect();
        let expected: Vec<u64> = all.iter().take(7).map(|(v, _)| *v).collect();
        assert_eq!(values, expected);
        assert!((ranked[0].probability - 0.5 * 0.5 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_leading_zero_value() {
        let dists = [dist(0, &[(0, 4)]), dist(1, &[(0, 4)]), dist(2, &[(5, 4)])];
        let ranked = rank_candidates(&dists, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].value, 5);
        assert_eq!(ranked[0].digits, vec![0, 0, 5]);
        assert_eq!(ranked[0].probability, 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(rank_candidates(&[], 5).is_empty());
        assert!(rank_candidates(&[dist(0, &[(1, 1)])], 0).is_empty());
    }
}
