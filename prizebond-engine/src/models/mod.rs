pub mod random_forest;

use ndarray::{ArrayView1, ArrayView2};

use crate::error::Result;

/// An ensemble regression capability: fit on a feature matrix, then query each member.
pub trait EnsembleRegressor: Send + Sync {
    type Model: FittedEnsemble;

    fn name(&self) -> &str;

    /// `features` has one row per sample; `target` has one value per row.
    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        target: ArrayView1<'_, f64>,
    ) -> Result<Self::Model>;
}

pub trait FittedEnsemble: Send + Sync {
    /// One prediction per member estimator, in member order.
    fn member_votes(&self, row: ArrayView1<'_, f64>) -> Vec<f64>;

    /// Ensemble point prediction: mean of the member votes.
    fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let votes = self.member_votes(row);
        if votes.is_empty() {
            return 0.0;
        }
        votes.iter().sum::<f64>() / votes.len() as f64
    }
}
