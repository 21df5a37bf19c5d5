use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use prizebond_db::db::{count_draws, db_path, fetch_all_draws, migrate, open_db};
use prizebond_db::models::{DrawSeries, PrizeColumn};
use prizebond_engine::analysis::location_randomness;
use prizebond_engine::config::EngineConfig;
use prizebond_engine::display;
use prizebond_engine::ensemble::DigitwisePredictor;
use prizebond_engine::export::{export_anomalies, export_feature_table};
use prizebond_engine::features::build_feature_table;
use prizebond_engine::features::rolling::RollingStats;
use prizebond_engine::features::transition::{next_digit_ranking, weighted_next_digit_ranking};

#[derive(Parser)]
#[command(name = "prizebond-engine", about = "Prize bond draw analysis and digit-wise forecasting")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct GlobalOpts {
    /// SQLite database (default: data/prizebond.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// JSON engine configuration; the flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Rolling window size
    #[arg(long, global = true)]
    window: Option<usize>,

    /// Anomaly |z| threshold
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Number of candidates to keep
    #[arg(long, global = true)]
    top_k: Option<usize>,

    /// Trees per digit position
    #[arg(long, global = true)]
    trees: Option<usize>,

    /// Random forest seed
    #[arg(long, global = true)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the feature table and print a summary
    Features {
        /// Write the full table as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Forecast the next draw digit by digit
    Predict {
        /// Prize column (default: every prize)
        #[arg(short, long, value_parser = parse_prize)]
        prize: Option<PrizeColumn>,

        /// Skip the chronological holdout evaluation
        #[arg(long)]
        no_holdout: bool,

        /// Print the predictions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rank next last digits from the transition matrix
    LastDigits {
        #[arg(short, long, value_parser = parse_prize)]
        prize: Option<PrizeColumn>,

        #[arg(short = 'n', long, default_value = "5")]
        top: usize,
    },

    /// List draws with anomalous transition surprise
    Anomalies {
        #[arg(short, long, value_parser = parse_prize)]
        prize: Option<PrizeColumn>,

        /// Rows to print
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Write every flagged draw as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Randomness tests per draw location
    Locations,
}

fn parse_prize(s: &str) -> std::result::Result<PrizeColumn, String> {
    PrizeColumn::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = PrizeColumn::ALL.iter().map(|p| p.name()).collect();
        format!("unknown prize '{}' (expected one of: {})", s, names.join(", "))
    })
}

fn load_config(opts: &GlobalOpts) -> Result<EngineConfig> {
    let mut config = match &opts.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(w) = opts.window {
        config.window = w;
    }
    if let Some(t) = opts.threshold {
        config.z_threshold = t;
    }
    if let Some(k) = opts.top_k {
        config.top_k = k;
    }
    if let Some(n) = opts.trees {
        config.forest.n_trees = n;
    }
    if let Some(s) = opts.seed {
        config.forest.seed = s;
    }
    config.validate()?;
    Ok(config)
}

fn load_series(path: &Path, config: &EngineConfig) -> Result<DrawSeries> {
    let conn = open_db(path)?;
    migrate(&conn)?;
    if count_draws(&conn)? == 0 {
        bail!("Empty database. Run `prizebond import <csv>` first");
    }
    let draws = fetch_all_draws(&conn)?;
    let series = DrawSeries::new(draws, config.digit_width)
        .context("stored draws failed validation")?;
    log::info!("loaded {} draws from {}", series.len(), path.display());
    Ok(series)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli.opts)?;
    let path = cli.opts.db.clone().unwrap_or_else(db_path);
    let series = load_series(&path, &config)?;

    match cli.command {
        Command::Features { output } => cmd_features(&series, &config, output.as_deref()),
        Command::Predict { prize, no_holdout, json } => {
            cmd_predict(&series, &config, prize, !no_holdout, json)
        }
        Command::LastDigits { prize, top } => cmd_last_digits(&series, &config, prize, top),
        Command::Anomalies { prize, limit, output } => {
            cmd_anomalies(&series, &config, prize, limit, output.as_deref())
        }
        Command::Locations => cmd_locations(&series),
    }
}

fn cmd_features(series: &DrawSeries, config: &EngineConfig, output: Option<&Path>) -> Result<()> {
    let table = build_feature_table(series, config)?;
    display::display_feature_summary(&table);
    if let Some(path) = output {
        export_feature_table(&table, path)?;
        println!("Feature table written to {}", path.display());
    }
    Ok(())
}

fn cmd_predict(
    series: &DrawSeries,
    config: &EngineConfig,
    prize: Option<PrizeColumn>,
    holdout: bool,
    json: bool,
) -> Result<()> {
    let table = build_feature_table(series, config)?;
    let predictor = DigitwisePredictor::new(config)
        .with_progress(!json)
        .with_holdout(holdout);

    let predictions = match prize {
        Some(p) => vec![predictor.predict(&table, p)?],
        None => predictor.predict_all(&table)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&predictions)?);
        return Ok(());
    }

    if let Some(latest) = table.latest() {
        println!(
            "Forecast after draw #{} ({}, {}), {} trees per digit",
            latest.draw.draw_id, latest.draw.draw_date, latest.draw.location, config.forest.n_trees
        );
    }
    for prediction in &predictions {
        display::display_prediction(prediction, table.digit_width());
    }
    Ok(())
}

fn cmd_last_digits(
    series: &DrawSeries,
    config: &EngineConfig,
    prize: Option<PrizeColumn>,
    top: usize,
) -> Result<()> {
    let prizes = match prize {
        Some(p) => vec![p],
        None => PrizeColumn::ALL.to_vec(),
    };
    for p in prizes {
        let column = series.column(p);
        let Some(&latest) = column.last() else {
            continue;
        };
        let ranking = next_digit_ranking(&column, top);
        display::display_next_digits(p, latest, &ranking, config.digit_width);

        let rolling = RollingStats::compute(&column, config.window);
        let (mean, std) = match (rolling.mean.last(), rolling.std.last()) {
            (Some(&m), Some(&s)) => (m, s),
            _ => continue,
        };
        let weighted = weighted_next_digit_ranking(&column, mean, std, top);
        display::display_weighted_next_digits(p, mean, std, &weighted, config.digit_width);
    }
    Ok(())
}

fn cmd_anomalies(
    series: &DrawSeries,
    config: &EngineConfig,
    prize: Option<PrizeColumn>,
    limit: usize,
    output: Option<&Path>,
) -> Result<()> {
    let table = build_feature_table(series, config)?;
    let prize = prize.unwrap_or(config.default_prize);
    display::display_anomalies(&table, prize, limit);
    if let Some(path) = output {
        export_anomalies(&table, prize, path)?;
        println!("Anomalies written to {}", path.display());
    }
    Ok(())
}

fn cmd_locations(series: &DrawSeries) -> Result<()> {
    let reports = location_randomness(series);
    display::display_locations(&reports);
    Ok(())
}
