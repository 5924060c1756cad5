//! Command-line interface for pubsub-poller
//!
//! # Usage Examples
//!
//! ## Batch
//! ```bash
//! # Poll two topics once, writing events under ./data
//! pubsub-poller batch \
//!   --topic /event/Order_Event__e,/event/Invoice_Event__e \
//!   --max-events 500 --max-wait 2m
//!
//! # Offline run against fixture files
//! pubsub-poller batch \
//!   --fixtures-dir ./demos/mock \
//!   --schema-versions file:./demos/schemas \
//!   --topic /event/Order_Event__e
//! ```
//!
//! ## Continuous
//! ```bash
//! pubsub-poller subscribe --topic /event/Order_Event__e --fetch-interval 30s
//! ```
//!
//! ## Cursors
//! ```bash
//! pubsub-poller cursor show --topic /event/Order_Event__e
//! pubsub-poller cursor set --topic /event/Order_Event__e --token AAAAAAAAAB4=
//! ```
//!
//! Credentials come from `SF_ACCESS_TOKEN`, `SF_INSTANCE_URL` and
//! `SF_TENANT_ID` (or the matching flags); acquiring them is out of scope.

use clap::{Parser, Subcommand};
use pubsub_poller::{commands, PubSubOpts, SourceArgs, StoreOpts};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "pubsub-poller")]
#[command(about = "A durable, replay-capable consumer for the Salesforce Pub/Sub API")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one bounded batch per topic, persist cursors, and exit
    Batch {
        #[command(flatten)]
        args: SourceArgs,
    },
    /// Keep one subscription open until Ctrl+C or SIGTERM
    Subscribe {
        #[command(flatten)]
        args: SourceArgs,
    },
    /// Show what the API reports about a topic
    Topic {
        #[command(flatten)]
        pubsub: PubSubOpts,

        /// Topic name, e.g. /event/Order_Event__e
        #[arg(long)]
        topic: String,
    },
    /// Inspect or seed stored replay cursors
    Cursor {
        #[command(subcommand)]
        command: CursorCommand,
    },
}

#[derive(Subcommand)]
enum CursorCommand {
    /// Print the stored cursor for a topic
    Show {
        #[command(flatten)]
        store: StoreOpts,

        #[arg(long)]
        topic: String,
    },
    /// Replace the stored cursor for a topic
    Set {
        #[command(flatten)]
        store: StoreOpts,

        #[arg(long)]
        topic: String,

        /// Replay token, base64 encoded
        #[arg(long)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Batch { args } => {
            let summary = commands::batch::run(args).await?;
            for report in &summary.succeeded {
                println!(
                    "{}: {} event(s) written, {} skipped, stopped: {}",
                    report.topic, report.events_written, report.skipped, report.stop
                );
            }
            if !summary.is_success() {
                for (topic, message) in &summary.failed {
                    eprintln!("{topic}: {message}");
                }
                anyhow::bail!("{} topic(s) failed", summary.failed.len());
            }
        }
        Commands::Subscribe { args } => {
            let summary = commands::subscribe::run(args, shutdown_signal()).await?;
            println!(
                "{} event(s) written, {} skipped over {} response(s)",
                summary.events_written, summary.skipped, summary.responses
            );
        }
        Commands::Topic { pubsub, topic } => {
            let info = commands::topic::run(&pubsub, &topic).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&commands::topic::to_json(&info))?
            );
        }
        Commands::Cursor { command } => match command {
            CursorCommand::Show { store, topic } => {
                match commands::cursor::show(&store, &topic).await? {
                    Some(token) => println!("{topic}: {}", commands::cursor::describe(&token)),
                    None => println!("{topic}: no cursor (next run starts from EARLIEST)"),
                }
            }
            CursorCommand::Set {
                store,
                topic,
                token,
            } => {
                let previous = commands::cursor::set(&store, &topic, &token).await?;
                match previous {
                    Some(previous) => println!(
                        "{topic}: replaced {}",
                        commands::cursor::describe(&previous)
                    ),
                    None => println!("{topic}: cursor created"),
                }
            }
        },
    }

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received interrupt signal (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
