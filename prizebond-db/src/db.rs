use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::models::DrawRecord;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    draw_id         INTEGER PRIMARY KEY,
    draw_date       TEXT NOT NULL,
    location        TEXT NOT NULL,
    first_prize     INTEGER NOT NULL,
    second_prize_1  INTEGER NOT NULL,
    second_prize_2  INTEGER NOT NULL,
    second_prize_3  INTEGER NOT NULL
);
";

const SELECT_COLUMNS: &str =
    "draw_id, draw_date, location, first_prize, second_prize_1, second_prize_2, second_prize_3";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("prizebond.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("cannot open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("migration failed")?;
    log::debug!("draw store schema is up to date");
    Ok(())
}

/// Returns `false` when a draw with the same id is already stored.
pub fn insert_draw(conn: &Connection, draw: &DrawRecord) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws
           (draw_id, draw_date, location,
            first_prize, second_prize_1, second_prize_2, second_prize_3)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            draw.draw_id,
            draw.draw_date,
            draw.location,
            draw.prizes[0] as i64,
            draw.prizes[1] as i64,
            draw.prizes[2] as i64,
            draw.prizes[3] as i64,
        ],
    ).with_context(|| format!("cannot insert draw {}", draw.draw_id))?;
    Ok(changed > 0)
}

fn read_draw(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrawRecord> {
    Ok(DrawRecord {
        draw_id: row.get(0)?,
        draw_date: row.get(1)?,
        location: row.get(2)?,
        prizes: [
            row.get::<_, i64>(3)? as u64,
            row.get::<_, i64>(4)? as u64,
            row.get::<_, i64>(5)? as u64,
            row.get::<_, i64>(6)? as u64,
        ],
    })
}

/// Every stored draw, oldest first.
pub fn fetch_all_draws(conn: &Connection) -> Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM draws ORDER BY draw_date ASC, draw_id ASC"
    ))?;
    let draws = stmt
        .query_map([], read_draw)?
        .collect::<Result<Vec<_>, _>>()
        .context("cannot read draws")?;
    Ok(draws)
}

/// The `limit` most recent draws, newest first.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLUMNS} FROM draws ORDER BY draw_date DESC, draw_id DESC LIMIT ?1"
    ))?;
    let draws = stmt
        .query_map([limit], read_draw)?
        .collect::<Result<Vec<_>, _>>()
        .context("cannot read draws")?;
    Ok(draws)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn test_draw(id: i64, date: &str) -> DrawRecord {
        DrawRecord {
            draw_id: id,
            draw_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            location: "Lahore".to_string(),
            prizes: [871778, 12, 345678, 999999],
        }
    }

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_count() {
        let conn = memory_db();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw(1, "2024-01-15")).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = memory_db();

        assert!(insert_draw(&conn, &test_draw(1, "2024-01-15")).unwrap());
        assert!(!insert_draw(&conn, &test_draw(1, "2024-01-15")).unwrap());
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_roundtrip_fields() {
        let conn = memory_db();
        let draw = test_draw(42, "2023-11-15");
        insert_draw(&conn, &draw).unwrap();

        let stored = fetch_all_draws(&conn).unwrap();
        assert_eq!(stored, vec![draw]);
    }

    #[test]
    fn test_fetch_order() {
        let conn = memory_db();

        insert_draw(&conn, &test_draw(1, "2024-01-15")).unwrap();
        insert_draw(&conn, &test_draw(3, "2024-07-15")).unwrap();
        insert_draw(&conn, &test_draw(2, "2024-04-15")).unwrap();

        let all = fetch_all_draws(&conn).unwrap();
        let ids: Vec<i64> = all.iter().map(|d| d.draw_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let last = fetch_last_draws(&conn, 2).unwrap();
        let ids: Vec<i64> = last.iter().map(|d| d.draw_id).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
