use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use prizebond_db::rusqlite::Connection;

use prizebond_db::db::insert_draw;
use prizebond_db::models::{validate_draws, DrawRecord, PrizeColumn, SchemaError, DIGIT_WIDTH};

const DRAW_NO: &str = "Draw No.";
const CITY: &str = "City";
const DATE: &str = "Date";

/// Header positions of the columns a raw sheet must carry.
struct ColumnIndex {
    draw_no: usize,
    prizes: [usize; 4],
    city: usize,
    date: usize,
}

fn locate_columns(headers: &csv::StringRecord) -> Result<ColumnIndex, SchemaError> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| SchemaError::MissingColumn { column: name.to_string() })
    };

    let mut prizes = [0usize; 4];
    for prize in PrizeColumn::ALL {
        prizes[prize.index()] = find(prize.raw_header())?;
    }

    Ok(ColumnIndex {
        draw_no: find(DRAW_NO)?,
        prizes,
        city: find(CITY)?,
        date: find(DATE)?,
    })
}

/// Day-first dates, `17/02/2024` or `17-02-2024`.
pub fn parse_date(raw: &str, row: usize) -> Result<NaiveDate, SchemaError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .map_err(|_| SchemaError::InvalidDate { row, raw: raw.to_string() })
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> Result<&'r str, SchemaError> {
    match record.get(idx).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(SchemaError::MissingValue { row, column: column.to_string() }),
    }
}

fn parse_record(
    record: &csv::StringRecord,
    row: usize,
    cols: &ColumnIndex,
) -> Result<DrawRecord, SchemaError> {
    let raw_id = field(record, cols.draw_no, row, DRAW_NO)?;
    let draw_id = raw_id.parse::<i64>().map_err(|_| SchemaError::InvalidInteger {
        row,
        column: DRAW_NO.to_string(),
        raw: raw_id.to_string(),
    })?;

    let mut prizes = [0u64; 4];
    for prize in PrizeColumn::ALL {
        let column = prize.raw_header();
        let raw = field(record, cols.prizes[prize.index()], row, column)?;
        prizes[prize.index()] = raw.parse::<u64>().map_err(|_| SchemaError::InvalidInteger {
            row,
            column: column.to_string(),
            raw: raw.to_string(),
        })?;
    }

    let location = record.get(cols.city).map(str::trim).unwrap_or_default().to_string();
    let draw_date = parse_date(field(record, cols.date, row, DATE)?, row)?;

    Ok(DrawRecord { draw_id, draw_date, location, prizes })
}

/// Parses and validates a whole sheet. Rows are numbered from 1, after the header.
pub fn read_draws<R: Read>(reader: R) -> Result<Vec<DrawRecord>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().context("Cannot read CSV header")?.clone();
    let cols = locate_columns(&headers)?;

    let mut draws = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record.with_context(|| format!("Cannot read row {row}"))?;
        draws.push(parse_record(&record, row, &cols)?);
    }

    validate_draws(&draws, DIGIT_WIDTH)?;
    Ok(draws)
}

pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
}

/// Inserts a validated batch in one transaction. Draws already stored are skipped.
pub fn import_draws(conn: &Connection, draws: &[DrawRecord]) -> Result<ImportResult> {
    let tx = conn
        .unchecked_transaction()
        .context("Cannot start transaction")?;

    let mut result = ImportResult {
        total_records: draws.len() as u32,
        inserted: 0,
        skipped: 0,
    };
    for draw in draws {
        if insert_draw(&tx, draw)? {
            result.inserted += 1;
        } else {
            result.skipped += 1;
        }
    }

    tx.commit().context("Commit failed")?;
    log::info!("imported {} draws ({} already stored)", result.inserted, result.skipped);
    Ok(result)
}

pub fn import_csv(conn: &Connection, path: &Path) -> Result<ImportResult> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let draws = read_draws(file).with_context(|| format!("Rejected {}", path.display()))?;
    import_draws(conn, &draws)
}
