use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use crate::import::ImportResult;
use prizebond_db::models::{DrawRecord, PrizeColumn, DIGIT_WIDTH};

pub fn display_draws(draws: &[DrawRecord]) {
    if draws.is_empty() {
        println!("No draws to display.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Draw", "Date", "City", "1st", "2nd", "2nd", "2nd"]);

    for draw in draws {
        let mut row = vec![
            Cell::new(draw.draw_id),
            Cell::new(draw.draw_date.format("%d/%m/%Y")),
            Cell::new(&draw.location),
        ];
        for prize in PrizeColumn::ALL {
            let number = Cell::new(format!("{:0width$}", draw.prize(prize), width = DIGIT_WIDTH));
            row.push(if prize == PrizeColumn::First { number.fg(Color::Green) } else { number });
        }
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_import_summary(result: &ImportResult) {
    println!("Import finished:");
    println!("  Rows read        : {}", result.total_records);
    println!("  Inserted         : {}", result.inserted);
    println!("  Already stored   : {}", result.skipped);
}
