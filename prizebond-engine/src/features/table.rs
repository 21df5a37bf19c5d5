use prizebond_db::models::{validate_draws, DrawSeries, PrizeColumn};

use super::anomaly::{AnomalyDetector, AnomalySeries};
use super::digits::{last_digit, split_digits};
use super::rolling::RollingStats;
use super::transition::{surprise, TransitionMatrix};
use super::{FeatureRow, FeatureTable, PrizeFeatures};
use crate::config::EngineConfig;
use crate::error::Result;

/// Column-wise features of one prize series, after the fill policy.
struct PrizeColumns {
    last_digit: Vec<u8>,
    prev_last_digit: Vec<u8>,
    transition_prob: Vec<f64>,
    surprise: Vec<f64>,
    rolling: RollingStats,
    anomaly: AnomalySeries,
    digits: Vec<Vec<u8>>,
}

fn fill_undefined(values: &[Option<f64>], fill: f64) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(fill)).collect()
}

fn fill_non_finite(values: &mut [f64], fill: f64) {
    for v in values.iter_mut().filter(|v| !v.is_finite()) {
        *v = fill;
    }
}

/// Non-finite entries take the mean of the finite ones (0 if there are none).
fn fill_with_column_mean(values: &mut [f64]) {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() == values.len() {
        return;
    }
    let mean = if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    fill_non_finite(values, mean);
}

fn prize_columns(series: &[u64], config: &EngineConfig) -> PrizeColumns {
    let matrix = TransitionMatrix::from_series(series);
    let probs = matrix.lookup_series(series);
    let raw_surprise: Vec<Option<f64>> = probs.iter().map(|p| p.and_then(surprise)).collect();

    let last: Vec<u8> = series.iter().map(|&v| last_digit(v)).collect();
    // first draw has no predecessor
    let prev: Vec<u8> = std::iter::once(0)
        .chain(last.iter().copied())
        .take(series.len())
        .collect();

    let transition_prob = fill_undefined(&probs, 0.0);
    let filled_surprise = fill_undefined(&raw_surprise, 0.0);

    let mut rolling = RollingStats::compute(series, config.window);
    for column in [
        &mut rolling.mean,
        &mut rolling.std,
        &mut rolling.entropy,
        &mut rolling.runs,
        &mut rolling.dominance,
    ] {
        fill_with_column_mean(column);
    }

    let mut anomaly =
        AnomalyDetector::new(config.window, config.z_threshold).detect(&filled_surprise);
    fill_non_finite(&mut anomaly.residual, 0.0);
    fill_non_finite(&mut anomaly.zscore, 0.0);

    PrizeColumns {
        last_digit: last,
        prev_last_digit: prev,
        transition_prob,
        surprise: filled_surprise,
        rolling,
        anomaly,
        digits: series.iter().map(|&v| split_digits(v, config.digit_width)).collect(),
    }
}

impl PrizeColumns {
    fn at(&self, i: usize) -> PrizeFeatures {
        PrizeFeatures {
            last_digit: self.last_digit[i],
            prev_last_digit: self.prev_last_digit[i],
            transition_prob: self.transition_prob[i],
            transition_surprise: self.surprise[i],
            rolling_mean: self.rolling.mean[i],
            rolling_std: self.rolling.std[i],
            rolling_entropy: self.rolling.entropy[i],
            rolling_runs: self.rolling.runs[i],
            rolling_digit_dominance: self.rolling.dominance[i],
            expected_surprise: self.anomaly.expected[i],
            surprise_residual: self.anomaly.residual[i],
            surprise_zscore: self.anomaly.zscore[i],
            is_anomaly: self.anomaly.is_anomaly[i],
            digits: self.digits[i].clone(),
        }
    }
}

/// Runs the transition model, rolling statistics and anomaly detector over every
/// prize column and joins them into one fully defined row per draw.
pub fn build_feature_table(series: &DrawSeries, config: &EngineConfig) -> Result<FeatureTable> {
    config.validate()?;
    validate_draws(series.draws(), config.digit_width)?;

    let columns: Vec<PrizeColumns> = PrizeColumn::ALL
        .iter()
        .map(|&prize| prize_columns(&series.column(prize), config))
        .collect();

    for (prize, c) in PrizeColumn::ALL.iter().zip(columns.iter()) {
        log::debug!(
            "{}: {} anomalies (window {}, |z| > {})",
            prize,
            c.anomaly.anomaly_count(),
            config.window,
            config.z_threshold
        );
    }

    let rows: Vec<FeatureRow> = series
        .draws()
        .iter()
        .enumerate()
        .map(|(i, draw)| FeatureRow {
            draw: draw.clone(),
            prizes: columns.iter().map(|c| c.at(i)).collect(),
        })
        .collect();

    let table = FeatureTable::new(config.window, config.digit_width, config.default_prize, rows);
    log::info!(
        "feature table built: {} draws x {} features",
        table.len(),
        table.feature_names().len()
    );
    Ok(table)
}
