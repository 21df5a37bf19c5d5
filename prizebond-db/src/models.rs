use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Prize bond numbers are printed with six digits.
pub const DIGIT_WIDTH: usize = 6;

/// One drawing event: four winning numbers, a date and the city it was held in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRecord {
    pub draw_id: i64,
    pub draw_date: NaiveDate,
    pub location: String,
    pub prizes: [u64; 4],
}

impl DrawRecord {
    pub fn prize(&self, column: PrizeColumn) -> u64 {
        self.prizes[column.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrizeColumn {
    #[serde(rename = "first_prize")]
    First,
    #[serde(rename = "second_prize_1")]
    Second1,
    #[serde(rename = "second_prize_2")]
    Second2,
    #[serde(rename = "second_prize_3")]
    Second3,
}

impl PrizeColumn {
    pub const ALL: [PrizeColumn; 4] = [
        PrizeColumn::First,
        PrizeColumn::Second1,
        PrizeColumn::Second2,
        PrizeColumn::Second3,
    ];

    pub fn index(&self) -> usize {
        match self {
            PrizeColumn::First => 0,
            PrizeColumn::Second1 => 1,
            PrizeColumn::Second2 => 2,
            PrizeColumn::Second3 => 3,
        }
    }

    /// Column name used in the store and in exported feature tables.
    pub fn name(&self) -> &'static str {
        match self {
            PrizeColumn::First => "first_prize",
            PrizeColumn::Second1 => "second_prize_1",
            PrizeColumn::Second2 => "second_prize_2",
            PrizeColumn::Second3 => "second_prize_3",
        }
    }

    /// Header of this column in the raw draw sheets.
    pub fn raw_header(&self) -> &'static str {
        match self {
            PrizeColumn::First => "1st",
            PrizeColumn::Second1 => "2nd",
            PrizeColumn::Second2 => "2nd.1",
            PrizeColumn::Second3 => "2nd.2",
        }
    }

    pub fn from_name(name: &str) -> Option<PrizeColumn> {
        PrizeColumn::ALL
            .into_iter()
            .find(|c| c.name() == name || c.raw_header() == name)
    }
}

impl std::fmt::Display for PrizeColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Violations of the raw-data contract. Any of them rejects the whole batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("dataset is empty")]
    EmptyBatch,

    #[error("missing column: {column}")]
    MissingColumn { column: String },

    #[error("row {row}: missing value in column {column}")]
    MissingValue { row: usize, column: String },

    #[error("row {row}: column {column} must be an integer, got '{raw}'")]
    InvalidInteger { row: usize, column: String, raw: String },

    #[error("row {row}: invalid date '{raw}'")]
    InvalidDate { row: usize, raw: String },

    #[error("duplicate draw number {draw_id}")]
    DuplicateDrawId { draw_id: i64 },

    #[error("draw {draw_id}: {column} = {value} does not fit in {width} digits")]
    PrizeOutOfRange {
        draw_id: i64,
        column: PrizeColumn,
        value: u64,
        width: usize,
    },
}

/// Largest value representable with `width` decimal digits, plus one.
pub fn digit_capacity(width: usize) -> u64 {
    10u64.saturating_pow(width as u32)
}

pub fn validate_draws(draws: &[DrawRecord], width: usize) -> Result<(), SchemaError> {
    if draws.is_empty() {
        return Err(SchemaError::EmptyBatch);
    }

    let capacity = digit_capacity(width);
    let mut seen = HashSet::with_capacity(draws.len());
    for draw in draws {
        if !seen.insert(draw.draw_id) {
            return Err(SchemaError::DuplicateDrawId { draw_id: draw.draw_id });
        }
        for column in PrizeColumn::ALL {
            let value = draw.prize(column);
            if value >= capacity {
                return Err(SchemaError::PrizeOutOfRange {
                    draw_id: draw.draw_id,
                    column,
                    value,
                    width,
                });
            }
        }
    }
    Ok(())
}

/// Validated draws in chronological order: oldest first, ties broken by `draw_id`.
#[derive(Debug, Clone)]
pub struct DrawSeries {
    draws: Vec<DrawRecord>,
}

impl DrawSeries {
    pub fn new(mut draws: Vec<DrawRecord>, width: usize) -> Result<Self, SchemaError> {
        validate_draws(&draws, width)?;
        draws.sort_by(|a, b| {
            a.draw_date
                .cmp(&b.draw_date)
                .then(a.draw_id.cmp(&b.draw_id))
        });
        Ok(Self { draws })
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    pub fn latest(&self) -> Option<&DrawRecord> {
        self.draws.last()
    }

    /// Values of one prize column, oldest first.
    pub fn column(&self, column: PrizeColumn) -> Vec<u64> {
        self.draws.iter().map(|d| d.prize(column)).collect()
    }
}
