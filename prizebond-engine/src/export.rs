use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use prizebond_db::models::PrizeColumn;

use crate::features::{FeatureRow, FeatureTable};

const ID_COLUMNS: [&str; 3] = ["draw_no", "draw_date", "city"];

fn id_fields(row: &FeatureRow) -> Vec<String> {
    let mut fields = vec![
        row.draw.draw_id.to_string(),
        row.draw.draw_date.format("%Y-%m-%d").to_string(),
        row.draw.location.clone(),
    ];
    fields.extend(row.draw.prizes.iter().map(|p| p.to_string()));
    fields
}

fn id_header() -> Vec<String> {
    ID_COLUMNS
        .iter()
        .map(|s| s.to_string())
        .chain(PrizeColumn::ALL.iter().map(|p| p.name().to_string()))
        .collect()
}

/// Identifying columns, then every feature column in `feature_names` order.
pub fn write_feature_table<W: Write>(table: &FeatureTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = id_header();
    header.extend(table.feature_names());
    wtr.write_record(&header)?;

    for row in table.rows() {
        let mut record = id_fields(row);
        record.extend(table.feature_values(row).iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_feature_table(table: &FeatureTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    write_feature_table(table, file)?;
    log::info!("wrote {} feature rows to {}", table.len(), path.display());
    Ok(())
}

/// Flagged draws of `prize`, most extreme first.
pub fn write_anomalies<W: Write>(
    table: &FeatureTable,
    prize: PrizeColumn,
    writer: W,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = id_header();
    header.extend(
        [
            "prize",
            "last_digit",
            "transition_prob",
            "transition_surprise",
            "expected_surprise",
            "surprise_residual",
            "surprise_zscore",
        ]
            .iter()
            .map(|s| s.to_string()),
    );
    wtr.write_record(&header)?;

    for row in table.anomalies(prize) {
        let f = row.prize(prize);
        let mut record = id_fields(row);
        record.push(prize.name().to_string());
        record.push(f.last_digit.to_string());
        for v in [
            f.transition_prob,
            f.transition_surprise,
            f.expected_surprise,
            f.surprise_residual,
            f.surprise_zscore,
        ] {
            record.push(v.to_string());
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_anomalies(table: &FeatureTable, prize: PrizeColumn, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    write_anomalies(table, prize, file)?;
    log::info!("wrote {} anomalies to {}", table.anomalies(prize).len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::features::{build_feature_table, make_test_series};

    #[test]
    fn test_feature_csv_layout() {
        let table = build_feature_table(&make_test_series(15), &EngineConfig::default()).unwrap();
        let mut buf = Vec::new();
        write_feature_table(&table, &mut buf).unwrap();

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(&headers[0], "draw_no");
        assert_eq!(&headers[3], "first_prize");
        assert_eq!(&headers[6], "second_prize_3");
        assert_eq!(headers.len(), 7 + table.feature_names().len());
        assert_eq!(&headers[7], "first_prize_last_digit");

        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 15);
        let first = &table.rows()[0].draw;
        assert_eq!(&records[0][0], first.draw_id.to_string().as_str());
        assert_eq!(&records[0][1], "2010-01-15");
        for record in &records {
            for field in record.iter().skip(7) {
                assert!(field.parse::<f64>().unwrap().is_finite());
            }
        }
    }

    #[test]
    fn test_anomaly_csv_rows() {
        let config = EngineConfig { z_threshold: 1.0, ..EngineConfig::default() };
        let table = build_feature_table(&make_test_series(120), &config).unwrap();
        let mut buf = Vec::new();
        write_anomalies(&table, PrizeColumn::Second2, &mut buf).unwrap();

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), table.anomalies(PrizeColumn::Second2).len());
        for row in &rows {
            assert_eq!(&row[7], "second_prize_2");
            assert!(row[13].parse::<f64>().unwrap().abs() > 1.0);
        }
    }
}
