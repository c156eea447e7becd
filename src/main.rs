use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use r2ping::catalog::Scenario;
use r2ping::config::{AppConfig, LoggingConfig, RunRequest};
use r2ping::report::{self, ConsoleSink, JsonLinesSink, ResultSink};
use r2ping::scheduler::RunStatus;

#[derive(Parser)]
#[command(
    name = "r2ping",
    about = "Round-trip latency benchmark for regional object-storage endpoints",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe one region, or every region, and rank them by average latency
    Run {
        /// Region id, or "all"
        #[arg(long, default_value = "all")]
        region: String,

        /// Delivery scenario: dev, custom-no-cache or custom-cache
        #[arg(long, default_value = "custom-no-cache")]
        scenario: String,

        /// Probes per region (1-1000; anything non-numeric means 10)
        #[arg(long)]
        count: Option<String>,

        /// Emit JSON lines instead of text
        #[arg(long)]
        json: bool,
    },

    /// List regions and their scenario URLs
    Catalog {
        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::discover(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::Run {
            region,
            scenario,
            count,
            json,
        } => {
            let scheduler = r2ping::http_scheduler(&config)?;
            let request = RunRequest::new(region, scenario, count.as_deref());
            tracing::info!(region = %request.region, scenario = %request.scenario, "Starting run");

            let mut sink: Box<dyn ResultSink> = if json {
                Box::new(JsonLinesSink::stdout())
            } else {
                Box::new(ConsoleSink::stdout(scheduler.catalog()))
            };

            match scheduler.start(&request, sink.as_mut()).await {
                Ok(RunStatus::Completed(run)) => {
                    if json {
                        println!("{}", run.to_json_line()?);
                    } else {
                        println!("\n=== r2ping results ({}) ===", run.config.scenario.display_name());
                        print!("{}", report::summary::format_table(&run));
                        println!("\n{}", report::summary::format_summary(&run));
                    }
                }
                Ok(RunStatus::Busy) => {}
                Err(_) => {
                    // Already reported through the sink as RunFailed.
                    std::process::exit(2);
                }
            }
        }
        Commands::Catalog { json } => {
            let catalog = config.catalog()?;
            if json {
                let entries: Vec<_> = catalog
                    .iter()
                    .map(|e| {
                        let urls: serde_json::Map<String, serde_json::Value> = Scenario::ALL
                            .iter()
                            .map(|s| (s.to_string(), e.target(*s).url().into()))
                            .collect();
                        serde_json::json!({
                            "id": e.id,
                            "name": e.name,
                            "location": e.location,
                            "urls": urls,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{:<6} | {:<32} | Location", "Id", "Name");
                println!("{:-<6}-|-{:-<32}-|-{:-<32}", "", "", "");
                for e in catalog.iter() {
                    println!("{:<6} | {:<32} | {}", e.id, e.name, e.location);
                    for s in Scenario::ALL {
                        println!("{:<6} |   {:<16} {}", "", s.as_str(), e.target(s).url());
                    }
                }
            }
        }
    }

    Ok(())
}
