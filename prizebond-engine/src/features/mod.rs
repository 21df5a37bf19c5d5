pub mod anomaly;
pub mod digits;
pub mod rolling;
pub mod table;
pub mod transition;

use ndarray::Array2;

use prizebond_db::models::{DrawRecord, PrizeColumn};

pub use table::build_feature_table;

/// Per-prize feature names, in column order. `rolling_*` names are expanded to
/// `rolling_<stat>_<prize>_<window>`, the others to `<prize>_<name>`.
pub const SCALAR_FEATURES: [&str; 13] = [
    "last_digit",
    "prev_last_digit",
    "transition_prob",
    "transition_surprise",
    "rolling_mean",
    "rolling_std",
    "rolling_entropy",
    "rolling_runs",
    "rolling_digit_dominance",
    "expected_surprise",
    "surprise_residual",
    "surprise_zscore",
    "is_anomaly",
];

/// Fully defined features of one prize column at one draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PrizeFeatures {
    pub last_digit: u8,
    pub prev_last_digit: u8,
    pub transition_prob: f64,
    pub transition_surprise: f64,
    pub rolling_mean: f64,
    pub rolling_std: f64,
    pub rolling_entropy: f64,
    pub rolling_runs: f64,
    pub rolling_digit_dominance: f64,
    pub expected_surprise: f64,
    pub surprise_residual: f64,
    pub surprise_zscore: f64,
    pub is_anomaly: bool,
    /// Zero-padded digits of the prize number, most significant first.
    pub digits: Vec<u8>,
}

impl PrizeFeatures {
    /// Values in `SCALAR_FEATURES` order.
    pub fn scalar_values(&self) -> [f64; 13] {
        [
            self.last_digit as f64,
            self.prev_last_digit as f64,
            self.transition_prob,
            self.transition_surprise,
            self.rolling_mean,
            self.rolling_std,
            self.rolling_entropy,
            self.rolling_runs,
            self.rolling_digit_dominance,
            self.expected_surprise,
            self.surprise_residual,
            self.surprise_zscore,
            if self.is_anomaly { 1.0 } else { 0.0 },
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub draw: DrawRecord,
    /// Indexed by `PrizeColumn::index`.
    pub prizes: Vec<PrizeFeatures>,
}

impl FeatureRow {
    pub fn prize(&self, column: PrizeColumn) -> &PrizeFeatures {
        &self.prizes[column.index()]
    }
}

/// One row per draw, oldest first. Built once per run and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    window: usize,
    digit_width: usize,
    default_prize: PrizeColumn,
    rows: Vec<FeatureRow>,
}

pub fn prize_feature_name(base: &str, prize: PrizeColumn, window: usize) -> String {
    if base.starts_with("rolling_") {
        format!("{base}_{prize}_{window}")
    } else {
        format!("{prize}_{base}")
    }
}

impl FeatureTable {
    pub(crate) fn new(
        window: usize,
        digit_width: usize,
        default_prize: PrizeColumn,
        rows: Vec<FeatureRow>,
    ) -> Self {
        Self { window, digit_width, default_prize, rows }
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn digit_width(&self) -> usize {
        self.digit_width
    }

    pub fn default_prize(&self) -> PrizeColumn {
        self.default_prize
    }

    pub fn latest(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Predictor input columns: every prize's scalar features and digits, then the
    /// un-prefixed aliases of the default prize. Identifying columns are excluded.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for prize in PrizeColumn::ALL {
            for base in SCALAR_FEATURES {
                names.push(prize_feature_name(base, prize, self.window));
            }
            for d in 1..=self.digit_width {
                names.push(format!("{prize}_d{d}"));
            }
        }
        names.extend(SCALAR_FEATURES.iter().map(|s| s.to_string()));
        names
    }

    /// One row's values in `feature_names` order.
    pub fn feature_values(&self, row: &FeatureRow) -> Vec<f64> {
        let mut values = Vec::with_capacity(PrizeColumn::ALL.len() * (13 + self.digit_width) + 13);
        for prize in PrizeColumn::ALL {
            let features = row.prize(prize);
            values.extend(features.scalar_values());
            values.extend(features.digits.iter().map(|&d| d as f64));
        }
        values.extend(row.prize(self.default_prize).scalar_values());
        values
    }

    pub fn to_matrix(&self) -> Array2<f64> {
        let n_features = self.feature_names().len();
        let mut matrix = Array2::zeros((self.rows.len(), n_features));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, v) in self.feature_values(row).into_iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }
        matrix
    }

    /// Rows flagged for `prize`, most extreme |z| first; ties keep chronological order.
    pub fn anomalies(&self, prize: PrizeColumn) -> Vec<&FeatureRow> {
        let mut flagged: Vec<&FeatureRow> = self
            .rows
            .iter()
            .filter(|r| r.prize(prize).is_anomaly)
            .collect();
        flagged.sort_by(|a, b| {
            b.prize(prize)
                .surprise_zscore
                .abs()
                .partial_cmp(&a.prize(prize).surprise_zscore.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        flagged
    }
}

#[cfg(test)]
pub(crate) fn make_test_draws(n: usize) -> Vec<DrawRecord> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let start = chrono::NaiveDate::from_ymd_opt(2010, 1, 15).unwrap_or_default();
    let cities = ["Karachi", "Lahore", "Multan", "Peshawar"];
    (0..n)
        .map(|i| DrawRecord {
            draw_id: 1000 + i as i64,
            draw_date: start + chrono::Duration::days(91 * i as i64),
            location: cities[i % cities.len()].to_string(),
            prizes: [
                rng.random_range(0..1_000_000u64),
                rng.random_range(0..1_000_000u64),
                rng.random_range(0..1_000_000u64),
                rng.random_range(0..1_000_000u64),
            ],
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn make_test_series(n: usize) -> prizebond_db::models::DrawSeries {
    make_narrow_series(n, prizebond_db::models::DIGIT_WIDTH)
}

/// Test draws with every prize reduced to `width` digits.
#[cfg(test)]
pub(crate) fn make_narrow_series(n: usize, width: usize) -> prizebond_db::models::DrawSeries {
    let capacity = prizebond_db::models::digit_capacity(width);
    let mut draws = make_test_draws(n);
    for draw in &mut draws {
        for prize in &mut draw.prizes {
            *prize %= capacity;
        }
    }
    prizebond_db::models::DrawSeries::new(draws, width).unwrap()
}
