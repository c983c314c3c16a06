//! Multi-agent negotiation simulator
//!
//! Runs the round engine from the terminal or serves it as an event stream.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;

use negotiation_core::{default_config_toml, Backend, EventLogger};
use negotiation_server::{build_simulation, load_config, serve, ConsoleSink};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "negotiation-sim")]
#[command(about = "Multi-agent negotiation simulator")]
struct Cli {
    /// Path to the configuration file (defaults to ./simulation.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve GET /start as a server-sent event stream
    Serve {
        /// Overrides server.host
        #[arg(long)]
        host: Option<String>,
        /// Overrides server.port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one simulation and print it to the terminal
    Run {
        /// Write every event as a JSON line to this file
        #[arg(long)]
        events_out: Option<PathBuf>,
        /// Overrides simulation.backend
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
        /// Overrides simulation.seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the default configuration as TOML
    PrintConfig,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Llm,
    Offline,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Llm => Backend::Llm,
            BackendArg::Offline => Backend::Offline,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("negotiation=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::PrintConfig => {
            print!("{}", default_config_toml());
        }
        Commands::Serve { host, port } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await?;
        }
        Commands::Run {
            events_out,
            backend,
            seed,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(backend) = backend {
                config.simulation.backend = backend.into();
            }
            if let Some(seed) = seed {
                config.simulation.seed = seed;
            }

            let logger = match &events_out {
                Some(path) => EventLogger::new(path)?,
                None => EventLogger::null(),
            };
            let mut simulation = build_simulation(&config)?;
            let mut sink = ConsoleSink::new(std::io::stdout(), logger);

            let summary = simulation.run(&mut sink).await?;
            info!(
                run_id = %summary.run_id,
                total_iterations = summary.total_iterations,
                fallbacks = summary.fallbacks,
                committed_updates = summary.committed_updates,
                rejected_updates = summary.rejected_updates,
                "run complete"
            );
            if let Some(path) = events_out {
                info!(
                    events = sink.logger().event_count(),
                    path = %path.display(),
                    "event log written"
                );
            }
        }
    }

    Ok(())
}
