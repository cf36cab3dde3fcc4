//! Load test CLI for TCP arithmetic servers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use load_test::{LoadRunner, ResultsReport, ScenarioConfig, TcpServer, TestResults};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "load-test")]
#[command(about = "Rate-limited load generator for TCP arithmetic servers", long_about = None)]
struct Cli {
    /// Log level
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a load test from a scenario file
    Run {
        /// Path to scenario YAML file
        #[arg(short, long)]
        scenario: PathBuf,

        /// Override loads per second
        #[arg(short, long)]
        rate: Option<u32>,

        /// Override test duration in seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Override per-call timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output format: table (default), json, csv
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Run a quick smoke test against an embedded server
    Quick {
        /// Loads per second
        #[arg(short, long, default_value = "1000")]
        rate: u32,

        /// Test duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Server address; an embedded server is used when absent
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Serve the arithmetic protocol until interrupted
    Serve {
        /// Listen address
        #[arg(short, long, default_value = "127.0.0.1:8080")]
        addr: String,
    },

    /// List available scenarios
    List {
        /// Scenarios directory
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,
    },
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn print_results(results: &TestResults, output: &str) -> Result<()> {
    match output {
        "json" => println!("{}", ResultsReport::format_json(results)?),
        "csv" => {
            println!("{}", ResultsReport::csv_header());
            println!("{}", ResultsReport::format_csv(results));
        }
        _ => println!("{}", ResultsReport::format_table(results)),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    match cli.command {
        Commands::Run {
            scenario,
            rate,
            duration,
            timeout_ms,
            output,
        } => {
            let mut config = ScenarioConfig::from_file(&scenario)?;

            if let Some(r) = rate {
                config.loads_per_second = r;
            }
            if let Some(d) = duration {
                config.duration_secs = d;
            }
            if let Some(t) = timeout_ms {
                config.timeout_ms = t;
            }
            config.validate()?;

            eprintln!("Loaded scenario: {} ({})", config.name, scenario.display());
            if !config.description.is_empty() {
                eprintln!("  {}", config.description);
            }
            eprintln!(
                "  {} lps for {}s, timeout {}ms",
                config.loads_per_second, config.duration_secs, config.timeout_ms
            );

            let results = LoadRunner::new(config).run().await?;
            print_results(&results, &output)
        }
        Commands::Quick {
            rate,
            duration,
            target,
        } => {
            let mut config = ScenarioConfig::quick(rate, duration);
            config.target = target;

            let results = LoadRunner::new(config).run().await?;
            print_results(&results, "table")
        }
        Commands::Serve { addr } => {
            let server = TcpServer::bind(&addr).await?;
            eprintln!("Serving on {} (Ctrl-C to stop)", server.local_addr());
            tokio::signal::ctrl_c().await?;
            info!("Interrupted");
            server.close();
            Ok(())
        }
        Commands::List { dir } => {
            println!("Available scenarios in {}:", dir.display());
            println!();

            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!("Error reading directory: {}", e);
                    eprintln!("Make sure the directory exists and is readable");
                    return Ok(());
                }
            };

            let mut scenarios = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
                    continue;
                }
                if let Ok(config) = ScenarioConfig::from_file(&path) {
                    let filename = entry.file_name().to_string_lossy().to_string();
                    scenarios.push((filename, config));
                }
            }
            scenarios.sort_by(|a, b| a.0.cmp(&b.0));

            if scenarios.is_empty() {
                println!("No scenario files found");
            }
            for (filename, config) in scenarios {
                println!("  {} - {}", filename, config.name);
                println!(
                    "    {} lps, {}s, timeout {}ms",
                    config.loads_per_second, config.duration_secs, config.timeout_ms
                );
                if !config.description.is_empty() {
                    println!("    {}", config.description);
                }
                println!();
            }
            Ok(())
        }
    }
}
