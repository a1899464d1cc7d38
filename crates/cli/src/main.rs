// troll CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: One subcommand per resource domain, all driven by the same replicator.
// Design Decision: SIGINT and SIGTERM cancel the run; the final report is printed on the way out.

mod commands;
mod output;
mod telemetry;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use commands::RunOptions;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "troll")]
#[command(about = "troll - keep a host busy with synthetic disk, network, CPU and memory load")]
#[command(version)]
pub struct Cli {
    /// Final report format
    #[arg(long, short, global = true, env = "TROLL_OUTPUT", value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// On shutdown, wait up to this many milliseconds for in-flight jobs
    #[arg(long, global = true, env = "TROLL_DRAIN_MS")]
    pub drain_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write files to disk
    Files(commands::files::FilesArgs),

    /// Send HTTP requests to a set of URLs
    Network(commands::network::NetworkArgs),

    /// Keep CPUs busy
    Cpu(commands::cpu::CpuArgs),

    /// Allocate and touch memory
    Mem(commands::mem::MemArgs),
}

impl Cli {
    fn options(&self) -> RunOptions {
        RunOptions {
            output: self.output,
            drain: self.drain_ms.map(Duration::from_millis),
        }
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM
fn spawn_shutdown_listener(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
        }

        token.cancel();
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    telemetry::init_telemetry(telemetry::TelemetryConfig::from_env());

    let options = cli.options();
    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    match cli.command {
        Commands::Files(args) => commands::files::run(args, options, cancel).await,
        Commands::Network(args) => commands::network::run(args, options, cancel).await,
        Commands::Cpu(args) => commands::cpu::run(args, options, cancel).await,
        Commands::Mem(args) => commands::mem::run(args, options, cancel).await,
    }
}
