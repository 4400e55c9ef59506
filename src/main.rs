//! Synheart Mood Engine CLI
//!
//! Daily mood-state models and realtime state forecasts.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use synheart_mood_engine::{
    collector::{parse_day_records, LiveReading, RawDataSource, SpoolSource},
    config::Config,
    engine::MoodEngine,
    transparency::TransparencyLog,
    DATA_NOTICE, VERSION,
};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "upstream")]
use synheart_mood_engine::upstream::BlockingUpstreamClient;

#[derive(Parser)]
#[command(name = "synheart-mood")]
#[command(author = "Synheart")]
#[command(version = VERSION)]
#[command(about = "Daily mood-state models and realtime forecasts", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build one user's daily model
    Build {
        /// User identifier
        #[arg(long)]
        user: String,

        /// Target date (YYYY-MM-DD); defaults to yesterday
        #[arg(long)]
        date: Option<String>,

        /// Read raw records from this JSON file instead of the data source
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Build daily models for many users
    BuildAll {
        /// Target date (YYYY-MM-DD); defaults to yesterday
        #[arg(long)]
        date: Option<String>,

        /// Comma-separated users (defaults to every user in the raw spool)
        #[arg(long)]
        users: Option<String>,
    },

    /// Classify a live reading against a stored model
    Infer {
        /// User identifier
        #[arg(long)]
        user: String,

        /// JSON file holding the live reading
        #[arg(long)]
        input: PathBuf,

        /// Forecast horizon in minutes
        #[arg(long)]
        minutes: Option<u32>,

        /// Date of the model to use (YYYY-MM-DD); defaults to yesterday
        #[arg(long)]
        model_date: Option<String>,
    },

    /// Run the HTTP server
    #[cfg(feature = "server")]
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show engine statistics
    Status,

    /// Show configuration
    Config,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Build { user, date, input } => {
            cmd_build(config, &user, date.as_deref(), input);
        }
        Commands::BuildAll { date, users } => {
            cmd_build_all(config, date.as_deref(), users.as_deref());
        }
        Commands::Infer {
            user,
            input,
            minutes,
            model_date,
        } => {
            cmd_infer(config, &user, &input, minutes, model_date.as_deref());
        }
        #[cfg(feature = "server")]
        Commands::Serve { port } => {
            cmd_serve(config, port);
        }
        Commands::Status => {
            cmd_status(&config);
        }
        Commands::Config => {
            cmd_config(&config, cli.config.as_deref());
        }
    }
}

fn load_config(path: Option<&Path>) -> Config {
    let result = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    match result {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn parse_date_arg(value: Option<&str>, engine: &MoodEngine) -> NaiveDate {
    match value {
        Some(d) => match NaiveDate::parse_from_str(d, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                eprintln!("Error: invalid date '{d}' (expected YYYY-MM-DD): {e}");
                std::process::exit(1);
            }
        },
        None => engine.day_before(Utc::now()),
    }
}

fn open_engine(config: Config) -> MoodEngine {
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    MoodEngine::from_config(config)
}

/// Upstream service when configured, otherwise the local spool.
fn raw_source(config: &Config) -> Box<dyn RawDataSource> {
    #[cfg(feature = "upstream")]
    if let Some(settings) = &config.upstream {
        match BlockingUpstreamClient::new(settings.clone()) {
            Ok(client) => return Box::new(client),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
    Box::new(SpoolSource::new(config.raw_path()))
}

fn cmd_build(config: Config, user: &str, date: Option<&str>, input: Option<PathBuf>) {
    let engine = open_engine(config);
    let date = parse_date_arg(date, &engine);

    let result = match input {
        Some(path) => {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error: could not read {path:?}: {e}");
                    std::process::exit(1);
                }
            };
            parse_day_records(&content).and_then(|batch| engine.build_batch(user, date, batch))
        }
        None => {
            let source = raw_source(engine.config());
            engine.build_day(user, date, source.as_ref())
        }
    };
    engine.save_stats();

    match result {
        Ok(outcome) => {
            println!("Built model for {} on {}", outcome.user_id, outcome.target_date);
            println!("  Model ID: {}", outcome.model_id);
            println!("  Path: {}", outcome.model_path);
            println!("  Windows: {}", outcome.windows);
            if outcome.rejected > 0 {
                println!("  Rejected readings: {}", outcome.rejected);
            }
            if !outcome.degenerate_states.is_empty() {
                println!("  Empty states: {:?}", outcome.degenerate_states);
            }
        }
        Err(e) => {
            eprintln!("Error [{}]: {e}", e.code());
            std::process::exit(1);
        }
    }
}

fn cmd_build_all(config: Config, date: Option<&str>, users: Option<&str>) {
    let engine = open_engine(config);
    let date = parse_date_arg(date, &engine);

    let users: Vec<String> = match users {
        Some(csv) => csv
            .split(',')
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect(),
        None => match SpoolSource::new(engine.config().raw_path()).users() {
            Ok(users) => users,
            Err(e) => {
                eprintln!("Error: could not list users: {e}");
                std::process::exit(1);
            }
        },
    };
    if users.is_empty() {
        println!("No users to build.");
        return;
    }

    println!("Building {} model(s) for {date}...", users.len());
    let source = raw_source(engine.config());
    let results = engine.build_many(&users, date, source.as_ref(), engine.config().build_workers);
    engine.save_stats();

    let mut failed = 0;
    for (user, result) in &results {
        match result {
            Ok(outcome) => println!("  ✓ {user}: {} windows", outcome.windows),
            Err(e) => {
                failed += 1;
                println!("  ✗ {user}: [{}] {e}", e.code());
            }
        }
    }
    println!();
    println!("{} built, {} failed", results.len() - failed, failed);
    if failed > 0 {
        std::process::exit(1);
    }
}

fn cmd_infer(
    config: Config,
    user: &str,
    input: &Path,
    minutes: Option<u32>,
    model_date: Option<&str>,
) {
    let engine = open_engine(config);
    let model_date = model_date.map(|d| parse_date_arg(Some(d), &engine));

    let live: LiveReading = match std::fs::read_to_string(input)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()))
    {
        Ok(live) => live,
        Err(e) => {
            eprintln!("Error: could not read reading from {input:?}: {e}");
            std::process::exit(1);
        }
    };

    let now = Utc::now();
    let result = live
        .into_reading(now)
        .and_then(|reading| engine.infer(user, &reading, minutes, model_date, now));
    engine.save_stats();

    match result {
        Ok(result) => println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_else(|_| "Error".to_string())
        ),
        Err(e) => {
            eprintln!("Error [{}]: {e}", e.code());
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "server")]
fn cmd_serve(config: Config, port: Option<u16>) {
    use synheart_mood_engine::server::{run, ServerConfig};

    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }
    let port = port.unwrap_or(config.server_port);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: could not start async runtime: {e}");
            std::process::exit(1);
        }
    };

    runtime.block_on(async move {
        let (addr, shutdown_tx) = match run(ServerConfig::new(port, config)).await {
            Ok(started) => started,
            Err(e) => {
                eprintln!("Error: could not start server: {e}");
                std::process::exit(1);
            }
        };

        println!("Synheart Mood Engine v{VERSION}");
        println!("Listening on http://{addr}");
        println!("Press Ctrl+C to stop.");

        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Warning: could not listen for Ctrl+C: {e}");
        }
        let _ = shutdown_tx.send(());
        // let the server task flush its stats
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    });
}

fn cmd_status(config: &Config) {
    println!("{DATA_NOTICE}");
    println!("Synheart Mood Engine Status");
    println!("===========================");
    println!();

    println!("Configuration:");
    println!("  Data path: {}", config.data_path.display());
    println!("  Timezone: {}", config.timezone);
    println!(
        "  States: {}, window: {} slots of {} min",
        config.model.clusters, config.model.window_length, config.model.slot_minutes
    );
    println!("  Horizon policy: {:?}", config.model.horizon_policy);
    println!(
        "  Upstream: {}",
        config
            .upstream
            .as_ref()
            .map(|u| u.base_url.as_str())
            .unwrap_or("not configured (using raw spool)")
    );
    println!();

    let stats_path = config.transparency_path();
    if stats_path.exists() {
        println!("{}", TransparencyLog::with_persistence(stats_path).summary());
    } else {
        println!("No previous engine activity found.");
    }
}

fn cmd_config(config: &Config, path: Option<&Path>) {
    println!("Configuration");
    println!("=============");
    println!();
    println!(
        "Config file: {:?}",
        path.map(Path::to_path_buf).unwrap_or_else(Config::config_path)
    );
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
}
