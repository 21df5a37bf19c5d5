use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{s, Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::Serialize;

use prizebond_db::models::PrizeColumn;

use super::candidates::{rank_candidates, Candidate};
use super::votes::{vote_to_digit, DigitVoteDistribution};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::features::digits::{digit_at, join_digits};
use crate::features::FeatureTable;
use crate::models::random_forest::RandomForestRegressor;
use crate::models::{EnsembleRegressor, FittedEnsemble};

/// Share of training rows fitted during the holdout evaluation.
const HOLDOUT_TRAIN_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionPrediction {
    /// 0 = most significant digit.
    pub position: usize,
    pub distribution: DigitVoteDistribution,
    /// Mean member vote, unrounded.
    pub raw_point: f64,
    pub point: u8,
    /// Mean absolute error of the point prediction on the chronological holdout.
    pub holdout_mae: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrizePrediction {
    pub prize: PrizeColumn,
    pub trained_rows: usize,
    pub positions: Vec<PositionPrediction>,
    /// Positions whose vote distribution had no mass.
    pub failed_positions: Vec<usize>,
    /// Empty when any position failed.
    pub candidates: Vec<Candidate>,
}

impl PrizePrediction {
    /// Ensemble point prediction as a full number, if every position succeeded.
    pub fn point_value(&self) -> Option<u64> {
        if !self.failed_positions.is_empty() {
            return None;
        }
        let digits: Vec<u8> = self.positions.iter().map(|p| p.point).collect();
        Some(join_digits(&digits))
    }
}

/// Trains one ensemble per digit position of the next draw's prize number and
/// combines the member votes into ranked candidates.
pub struct DigitwisePredictor<'a> {
    config: &'a EngineConfig,
    show_progress: bool,
    evaluate_holdout: bool,
}

impl<'a> DigitwisePredictor<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            show_progress: false,
            evaluate_holdout: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_holdout(mut self, evaluate: bool) -> Self {
        self.evaluate_holdout = evaluate;
        self
    }

    /// Predicts every prize column with the configured random forest.
    pub fn predict_all(&self, table: &FeatureTable) -> Result<Vec<PrizePrediction>> {
        let pb = self.progress_bar((PrizeColumn::ALL.len() * self.config.digit_width) as u64);
        let mut out = Vec::with_capacity(PrizeColumn::ALL.len());
        for prize in PrizeColumn::ALL {
            out.push(self.run(table, prize, &pb, |position| self.forest_for(position))?);
        }
        pb.finish_and_clear();
        Ok(out)
    }

    pub fn predict(&self, table: &FeatureTable, prize: PrizeColumn) -> Result<PrizePrediction> {
        self.predict_with(table, prize, |position| self.forest_for(position))
    }

    /// Like `predict`, with the regressor for each position supplied by `make_regressor`.
    pub fn predict_with<R, F>(
        &self,
        table: &FeatureTable,
        prize: PrizeColumn,
        make_regressor: F,
    ) -> Result<PrizePrediction>
    where
        R: EnsembleRegressor,
        F: Fn(usize) -> R + Sync,
    {
        let pb = self.progress_bar(self.config.digit_width as u64);
        let prediction = self.run(table, prize, &pb, make_regressor);
        pb.finish_and_clear();
        prediction
    }

    fn forest_for(&self, position: usize) -> RandomForestRegressor {
        let seed = self.config.forest.seed.wrapping_add(position as u64);
        RandomForestRegressor::new(self.config.forest.clone()).with_seed(seed)
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        pb.set_style(style);
        pb
    }

    fn run<R, F>(
        &self,
        table: &FeatureTable,
        prize: PrizeColumn,
        pb: &ProgressBar,
        make_regressor: F,
    ) -> Result<PrizePrediction>
    where
        R: EnsembleRegressor,
        F: Fn(usize) -> R + Sync,
    {
        self.config.validate()?;
        let required = self.config.window + 1;
        if table.len() < required {
            return Err(EngineError::InsufficientData {
                required,
                actual: table.len(),
            });
        }

        let matrix = table.to_matrix();
        let n_train = table.len() - 1;
        let train = matrix.slice(s![..n_train, ..]);
        let query = matrix.row(n_train);
        let width = table.digit_width();

        log::info!(
            "{}: training {} positions on {} rows x {} features",
            prize,
            width,
            n_train,
            matrix.ncols()
        );
        pb.set_message(prize.to_string());

        let outcomes: Vec<Result<PositionPrediction>> = (0..width)
            .into_par_iter()
            .map(|position| {
                let target = next_draw_targets(table, prize, position);
                let regressor = make_regressor(position);
                let outcome =
                    self.predict_position(&regressor, position, train, target.view(), query);
                pb.inc(1);
                outcome
            })
            .collect();

        let mut positions = Vec::with_capacity(width);
        let mut failed_positions = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(p) => positions.push(p),
                Err(EngineError::DegenerateDistribution { position }) => {
                    log::warn!(
                        "{}: digit position {} has no votes, skipped",
                        prize,
                        position + 1
                    );
                    failed_positions.push(position);
                }
                Err(e) => return Err(e),
            }
        }

        let candidates = if failed_positions.is_empty() {
            let dists: Vec<DigitVoteDistribution> =
                positions.iter().map(|p| p.distribution.clone()).collect();
            rank_candidates(&dists, self.config.top_k)
        } else {
            Vec::new()
        };

        Ok(PrizePrediction {
            prize,
            trained_rows: n_train,
            positions,
            failed_positions,
            candidates,
        })
    }

    fn predict_position<R: EnsembleRegressor>(
        &self,
        regressor: &R,
        position: usize,
        train: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
        query: ArrayView1<'_, f64>,
    ) -> Result<PositionPrediction> {
        let model = regressor.fit(train, target)?;
        let votes = model.member_votes(query);
        log::debug!("{} position {}: {} votes", regressor.name(), position + 1, votes.len());

        let distribution = DigitVoteDistribution::from_votes(position, &votes)?;
        let raw_point = model.predict(query);

        let holdout_mae = if self.evaluate_holdout {
            holdout_mae(regressor, train, target)?
        } else {
            None
        };

        Ok(PositionPrediction {
            position,
            distribution,
            raw_point,
            point: vote_to_digit(raw_point),
            holdout_mae,
        })
    }
}

/// Digit at `position` of the following draw's prize, for every row except the last.
pub fn next_draw_targets(table: &FeatureTable, prize: PrizeColumn, position: usize) -> Array1<f64> {
    let width = table.digit_width();
    table
        .rows()
        .iter()
        .skip(1)
        .map(|row| digit_at(row.draw.prize(prize), width, position) as f64)
        .collect()
}

/// Fits on the oldest 80% of rows and scores the rounded point prediction on the rest.
/// `None` when either side of the split would be empty.
pub fn holdout_mae<R: EnsembleRegressor>(
    regressor: &R,
    features: ArrayView2<'_, f64>,
    target: ArrayView1<'_, f64>,
) -> Result<Option<f64>> {
    let n = features.nrows();
    let split = (n as f64 * HOLDOUT_TRAIN_FRACTION).floor() as usize;
    if split == 0 || split >= n {
        return Ok(None);
    }

    let model = regressor.fit(features.slice(s![..split, ..]), target.slice(s![..split]))?;
    let total: f64 = (split..n)
        .map(|i| {
            let point = vote_to_digit(model.predict(features.row(i))) as f64;
            (point - target[i]).abs()
        })
        .sum();
    Ok(Some(total / (n - split) as f64))
}
