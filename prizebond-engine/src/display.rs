use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};

use prizebond_db::models::PrizeColumn;

use crate::analysis::LocationReport;
use crate::ensemble::PrizePrediction;
use crate::features::transition::NextDigit;
use crate::features::FeatureTable;

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn padded(value: u64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

pub fn display_feature_summary(table: &FeatureTable) {
    println!(
        "\n== Feature table: {} draws, {} features (window {}) ==\n",
        table.len(),
        table.feature_names().len(),
        table.window()
    );

    let mut t = new_table();
    t.set_header(vec![
        "Prize",
        "Latest",
        "Surprise",
        "Roll. mean",
        "Roll. std",
        "Entropy",
        "z",
        "Anomalies",
    ]);

    let Some(latest) = table.latest() else {
        println!("{t}");
        return;
    };

    for prize in PrizeColumn::ALL {
        let f = latest.prize(prize);
        let flagged = table.rows().iter().filter(|r| r.prize(prize).is_anomaly).count();
        t.add_row(vec![
            Cell::new(prize.name()),
            Cell::new(padded(latest.draw.prize(prize), table.digit_width())),
            Cell::new(format!("{:.3}", f.transition_surprise)),
            Cell::new(format!("{:.0}", f.rolling_mean)),
            Cell::new(format!("{:.0}", f.rolling_std)),
            Cell::new(format!("{:.3}", f.rolling_entropy)),
            if f.is_anomaly {
                Cell::new(format!("{:+.2}", f.surprise_zscore)).fg(Color::Red)
            } else {
                Cell::new(format!("{:+.2}", f.surprise_zscore))
            },
            Cell::new(flagged),
        ]);
    }

    println!("{t}");
    println!(
        "Latest draw: #{} on {} at {}",
        latest.draw.draw_id, latest.draw.draw_date, latest.draw.location
    );
}

pub fn display_prediction(prediction: &PrizePrediction, width: usize) {
    println!(
        "\n== {} : next draw ({} training rows) ==\n",
        prediction.prize, prediction.trained_rows
    );

    let mut t = new_table();
    t.set_header(vec!["Pos", "Top digits", "Point", "Votes", "Holdout MAE"]);
    for p in &prediction.positions {
        let top: Vec<String> = p
            .distribution
            .support()
            .iter()
            .take(3)
            .map(|(d, prob)| format!("{d} ({:.0}%)", prob * 100.0))
            .collect();
        t.add_row(vec![
            Cell::new(format!("d{}", p.position + 1)),
            Cell::new(top.join("  ")),
            Cell::new(p.point).fg(Color::Green),
            Cell::new(p.distribution.n_votes()),
            Cell::new(
                p.holdout_mae
                    .map(|m| format!("{m:.3}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    for &pos in &prediction.failed_positions {
        t.add_row(vec![
            Cell::new(format!("d{}", pos + 1)),
            Cell::new("no votes").fg(Color::Red),
            Cell::new("-"),
            Cell::new(0),
            Cell::new("-"),
        ]);
    }
    println!("{t}");

    if prediction.candidates.is_empty() {
        println!("No candidates: {} position(s) without votes.", prediction.failed_positions.len());
        return;
    }

    let mut c = new_table();
    c.set_header(vec!["#", "Candidate", "Joint probability"]);
    for (i, cand) in prediction.candidates.iter().enumerate() {
        let number = Cell::new(padded(cand.value, width));
        c.add_row(vec![
            Cell::new(i + 1),
            if i == 0 { number.fg(Color::Green) } else { number },
            Cell::new(format!("{:.6}", cand.probability)),
        ]);
    }
    println!("{c}");
    if let Some(point) = prediction.point_value() {
        println!("Point prediction: {}", padded(point, width));
    }
}

pub fn display_next_digits(prize: PrizeColumn, latest: u64, ranking: &[NextDigit], width: usize) {
    println!(
        "\n== {} : next last digit after {} ==\n",
        prize,
        padded(latest, width)
    );
    println!("{}", next_digit_table(ranking, width));
}

pub fn display_weighted_next_digits(
    prize: PrizeColumn,
    rolling_mean: f64,
    rolling_std: f64,
    ranking: &[NextDigit],
    width: usize,
) {
    println!(
        "\n== {} : weighted by rolling mean {:.1} (std {:.1}) ==\n",
        prize, rolling_mean, rolling_std
    );
    println!("{}", next_digit_table(ranking, width));
}

fn next_digit_table(ranking: &[NextDigit], width: usize) -> Table {
    let mut t = new_table();
    t.set_header(vec!["Digit", "Probability", "Candidate"]);
    for n in ranking {
        t.add_row(vec![
            Cell::new(n.digit),
            Cell::new(format!("{:.3}", n.probability)),
            Cell::new(padded(n.candidate, width)),
        ]);
    }
    t
}

pub fn display_anomalies(table: &FeatureTable, prize: PrizeColumn, limit: usize) {
    let flagged = table.anomalies(prize);
    println!("\n== {} : {} anomalous draws ==\n", prize, flagged.len());

    let mut t = new_table();
    t.set_header(vec!["Draw", "Date", "City", "Number", "Surprise", "Expected", "z"]);
    for row in flagged.iter().take(limit) {
        let f = row.prize(prize);
        t.add_row(vec![
            Cell::new(row.draw.draw_id),
            Cell::new(row.draw.draw_date),
            Cell::new(&row.draw.location),
            Cell::new(padded(row.draw.prize(prize), table.digit_width())),
            Cell::new(format!("{:.3}", f.transition_surprise)),
            Cell::new(format!("{:.3}", f.expected_surprise)),
            Cell::new(format!("{:+.2}", f.surprise_zscore)).fg(Color::Red),
        ]);
    }
    println!("{t}");
}

pub fn display_locations(reports: &[LocationReport]) {
    println!("\n== Randomness by location ==\n");

    let mut t = new_table();
    t.set_header(vec!["City", "Draws", "Mean", "Std", "Chi2 (last digit)", "p", "Runs z", "p"]);

    let fmt = |v: Option<f64>, precision: usize| {
        v.map(|x| format!("{:.*}", precision, x)).unwrap_or_else(|| "-".to_string())
    };

    for r in reports {
        let runs_p = r.runs.map(|o| o.p_value);
        let runs_cell = Cell::new(fmt(runs_p, 3));
        t.add_row(vec![
            Cell::new(&r.location),
            Cell::new(r.draws),
            Cell::new(format!("{:.0}", r.mean)),
            Cell::new(format!("{:.0}", r.std_dev)),
            Cell::new(fmt(r.chi_square.map(|o| o.statistic), 2)),
            Cell::new(fmt(r.chi_square.map(|o| o.p_value), 3)),
            Cell::new(fmt(r.runs.map(|o| o.statistic), 2)),
            if runs_p.is_some_and(|p| p < 0.05) {
                runs_cell.fg(Color::Yellow)
            } else {
                runs_cell
            },
        ]);
    }
    println!("{t}");
}
