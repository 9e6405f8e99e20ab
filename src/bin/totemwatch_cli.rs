use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;
use uuid::Uuid;

use totemwatch::config::{Config, ConfigHandle};
use totemwatch::engine::Engine;
use totemwatch::input::EventReader;
use totemwatch::output::{console_line, OutputFormat, OutputHandler, OutputSink};
use totemwatch::persistence::{AlertStore, SqliteAlertStore};
use totemwatch::stats;

/// TotemWatch command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "totemwatch", about = "AutoTotem detection tools")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "totemwatch.toml")]
        output: PathBuf,
    },
    /// Run a recorded event stream through the checks
    Replay {
        /// JSON-lines file of recorded events
        #[structopt(short, long)]
        file: PathBuf,
        /// Path to configuration file
        #[structopt(short, long)]
        config: Option<PathBuf>,
        /// Output format: console, json or jsonl
        #[structopt(long, default_value = "console")]
        format: String,
    },
    /// Print summary statistics of a list of numbers
    Stats {
        values: Vec<f64>,
    },
    /// List stored alerts
    Alerts {
        /// Path to the alert database
        #[structopt(short, long)]
        database: PathBuf,
        /// Only alerts for this player
        #[structopt(short, long)]
        player: Option<Uuid>,
        /// Number of alerts to show
        #[structopt(short, long, default_value = "20")]
        limit: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .parse_default_env()
        .init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Replay {
            file,
            config,
            format,
        } => {
            if !file.exists() {
                eprintln!("File not found: {:?}", file);
                std::process::exit(1);
            }
            let config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };

            let output = OutputHandler::new(OutputFormat::from_str(&format), None)?;
            let engine = Engine::new(ConfigHandle::new(config), Arc::new(OutputSink::new(output)));

            let mut processed = 0usize;
            for event in EventReader::open(&file)? {
                match event {
                    Ok(event) => {
                        engine.handle_recorded(&event);
                        processed += 1;
                    }
                    Err(e) => eprintln!("Skipping: {}", e),
                }
            }
            eprintln!("Replayed {} event(s)", processed);
        }
        Cli::Stats { values } => {
            if values.is_empty() {
                eprintln!("No values given");
                std::process::exit(1);
            }
            let outliers = stats::tukey_outliers(&values);

            println!("count:           {}", values.len());
            println!("mean:            {:.2}", stats::mean(&values));
            println!("median:          {:.2}", stats::median(&values));
            println!("std deviation:   {:.2}", stats::std_dev(&values));
            println!("skewness:        {:.2}", stats::skewness(&values));
            println!("kurtosis:        {:.2}", stats::kurtosis(&values));
            println!("low outliers:    {:?}", outliers.low);
            println!("high outliers:   {:?}", outliers.high);
        }
        Cli::Alerts {
            database,
            player,
            limit,
        } => {
            if !database.exists() {
                eprintln!("Database not found: {:?}", database);
                std::process::exit(1);
            }
            let store = SqliteAlertStore::new(&database)?;

            let alerts = match player {
                Some(player_id) => {
                    let total = store.count_player_alerts(&player_id)?;
                    println!("{} alert(s) stored for {}", total, player_id);
                    store.get_player_alerts(&player_id, limit)?
                }
                None => store.get_recent_alerts(limit)?,
            };

            for alert in &alerts {
                let time = chrono::DateTime::from_timestamp_millis(alert.timestamp)
                    .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default();
                println!("{}  {}", time, console_line(alert));
            }
        }
    }

    Ok(())
}
