use std::collections::BTreeMap;

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use prizebond_db::models::{DrawSeries, PrizeColumn};

use crate::features::digits::last_digit;
use crate::features::rolling::mean_std;
use crate::features::transition::{build_count_matrix, TransitionCounts, DIGITS};

/// Goodness-of-fit of a statistic against its null distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

/// Randomness summary of every prize number drawn at one location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationReport {
    pub location: String,
    pub draws: usize,
    pub numbers: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub last_digit_counts: [u64; DIGITS],
    /// Last-digit counts against a uniform expectation, 9 degrees of freedom.
    pub chi_square: Option<TestOutcome>,
    /// One-sample Wald-Wolfowitz runs test around the mean, z statistic.
    pub runs: Option<TestOutcome>,
    /// Last-digit transitions between consecutive numbers of the flattened sequence.
    pub transitions: TransitionCounts,
}

/// Groups the series by location and tests each group's flattened prize sequence.
/// Reports come back least random first (lowest runs p-value; undefined last).
pub fn location_randomness(series: &DrawSeries) -> Vec<LocationReport> {
    let mut groups: BTreeMap<&str, (usize, Vec<u64>)> = BTreeMap::new();
    for draw in series.draws() {
        let entry = groups.entry(draw.location.as_str()).or_default();
        entry.0 += 1;
        entry.1.extend(PrizeColumn::ALL.iter().map(|&p| draw.prize(p)));
    }

    let mut reports: Vec<LocationReport> = groups
        .into_iter()
        .map(|(location, (draws, numbers))| location_report(location, draws, &numbers))
        .collect();

    reports.sort_by(|a, b| match (a.runs, b.runs) {
        (Some(x), Some(y)) => x
            .p_value
            .partial_cmp(&y.p_value)
            .unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    log::debug!("location analysis: {} locations", reports.len());
    reports
}

fn location_report(location: &str, draws: usize, numbers: &[u64]) -> LocationReport {
    let values: Vec<f64> = numbers.iter().map(|&v| v as f64).collect();
    let (mean, std_dev) = mean_std(&values);

    let mut last_digit_counts = [0u64; DIGITS];
    for &v in numbers {
        last_digit_counts[last_digit(v) as usize] += 1;
    }

    LocationReport {
        location: location.to_string(),
        draws,
        numbers: numbers.len(),
        mean,
        std_dev,
        last_digit_counts,
        chi_square: chi_square_uniform(&last_digit_counts),
        runs: runs_test(&values),
        transitions: build_count_matrix(numbers),
    }
}

/// Pearson chi-square of `counts` against equal expected frequencies.
pub fn chi_square_uniform(counts: &[u64]) -> Option<TestOutcome> {
    let total: u64 = counts.iter().sum();
    if total == 0 || counts.len() < 2 {
        return None;
    }
    let expected = total as f64 / counts.len() as f64;
    let statistic: f64 = counts
        .iter()
        .map(|&c| (c as f64 - expected).powi(2) / expected)
        .sum();

    let dist = ChiSquared::new((counts.len() - 1) as f64).ok()?;
    Some(TestOutcome {
        statistic,
        p_value: 1.0 - dist.cdf(statistic),
    })
}

/// Runs above/below the mean (`value >= mean` is "above"), no continuity correction.
/// `None` when every value falls on one side.
pub fn runs_test(values: &[f64]) -> Option<TestOutcome> {
    if values.len() < 2 {
        return None;
    }
    let cutoff = values.iter().sum::<f64>() / values.len() as f64;
    let above: Vec<bool> = values.iter().map(|&v| v >= cutoff).collect();

    let n1 = above.iter().filter(|&&x| x).count() as f64;
    let n2 = above.len() as f64 - n1;
    let n = n1 + n2;
    if n1 == 0.0 || n2 == 0.0 {
        return None;
    }

    let runs = 1 + above.windows(2).filter(|w| w[0] != w[1]).count();
    let expected = 1.0 + 2.0 * n1 * n2 / n;
    let variance = 2.0 * n1 * n2 * (2.0 * n1 * n2 - n) / (n * n * (n - 1.0));
    if variance <= 0.0 {
        return None;
    }

    let z = (runs as f64 - expected) / variance.sqrt();
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some(TestOutcome {
        statistic: z,
        p_value: 2.0 * (1.0 - normal.cdf(z.abs())),
    })
}
