use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ledger_cli::commands::run::RunOptions;
use ledger_cli::commands::{customers, run, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ledger")]
#[command(about = "Replicated ledger driver: run scenarios and inspect their causal traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every branch of a scenario, run its customers and write the results.
    Run {
        scenario: PathBuf,

        /// Directory for the output files.
        #[arg(long, short, default_value = "out")]
        out: PathBuf,

        /// Wire replicas together in memory instead of over HTTP.
        #[arg(long)]
        in_process: bool,

        /// Fail unless all replicas end on the same balance with ordered logs.
        #[arg(long)]
        verify: bool,

        #[command(flatten)]
        opts: RunOptions,
    },
    /// Run a scenario's customers against an already running `ledger-node`.
    Customers {
        scenario: PathBuf,

        #[arg(long, short, default_value = "out")]
        out: PathBuf,

        #[command(flatten)]
        opts: RunOptions,
    },
    /// Rebuild the causal trace from a run's event files.
    Trace {
        #[arg(long)]
        replica_events: PathBuf,

        #[arg(long)]
        customer_events: PathBuf,

        /// Only show this request.
        #[arg(long, short)]
        request: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ledger_cli=info,ledger_node=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            out,
            in_process,
            verify,
            opts,
        } => run::run(&scenario, &out, in_process, verify, &opts).await.map(|_| ()),
        Commands::Customers { scenario, out, opts } => {
            customers::run(&scenario, &out, &opts).await.map(|_| ())
        }
        Commands::Trace {
            replica_events,
            customer_events,
            request,
        } => trace::run(&replica_events, &customer_events, request.as_deref()).map(|_| ()),
    }
}
