//! # Etiqueta CLI
//!
//! Command-line interface for RFID label printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print every copy of every item in a JSON file
//! etiqueta --allow-dangerous print items.json
//!
//! # Send a raw ZPL document, 3 copies, over the network
//! etiqueta --transport network send label.zpl --copies 3
//!
//! # Inspect a document without printing it
//! etiqueta validate label.zpl
//!
//! # Compute an RFID payload
//! etiqueta encode --barcode 789643610064 --po 0464 --sequence 1
//!
//! # Find printers, print a test label, or cancel everything queued
//! etiqueta discover --transport serial
//! etiqueta test --transport network --endpoint 192.168.1.40
//! etiqueta cancel
//!
//! # Start the JSON HTTP API
//! etiqueta serve --listen 0.0.0.0:8080
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `etiqueta=info`).

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use etiqueta::{
    batch::{BatchController, BatchOptions},
    config::Config,
    dispatch::Router,
    document::{Compositor, LabelDocument},
    item::LabelItem,
    payload::RfidPayload,
    protocol::zpl,
    safety::SafetyGate,
    server::{self, AppState, ServerConfig},
    transport::{self, TransportKind},
    EtiquetaError,
};

/// Etiqueta - RFID label printing for Zebra ZPL printers
#[derive(Parser, Debug)]
#[command(name = "etiqueta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Transport to use instead of the configured default
    #[arg(long, global = true, value_enum)]
    transport: Option<TransportKind>,

    /// Let tag-memory commands (^RFW, ^RFR, ...) through the safety gate
    #[arg(long, global = true)]
    allow_dangerous: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every copy of every item in a JSON array of label items
    Print {
        items: PathBuf,

        /// Label template (defaults to the configured one)
        #[arg(long, value_name = "FILE")]
        template: Option<PathBuf>,

        /// Delay between copies in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Send a ZPL document through the router
    Send {
        document: PathBuf,

        #[arg(long, default_value = "1")]
        copies: u32,
    },

    /// Run the safety gate over a document and print the report
    Validate { document: PathBuf },

    /// Print the RFID payload for a barcode, PO and sequence
    Encode {
        #[arg(long)]
        barcode: String,

        #[arg(long, default_value = "")]
        po: String,

        #[arg(long, default_value = "1")]
        sequence: u32,

        /// Payload length (defaults to the configured one)
        #[arg(long)]
        length: Option<usize>,
    },

    /// List candidate printers for a transport
    Discover,

    /// Connect and print the benign test label
    Test {
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Cancel every format queued on the printer (~JA)
    Cancel,

    /// Start the JSON HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("etiqueta=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EtiquetaError> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.allow_dangerous |= cli.allow_dangerous;
    // The configured default stays the router's fallback.
    let kind = cli.transport.unwrap_or(config.default_transport);

    match cli.command {
        Commands::Print {
            items,
            template,
            pacing_ms,
        } => {
            let items = read_items(&items)?;
            let template = template.or_else(|| config.template_path.clone());
            let compositor = Compositor::load(template.as_deref());

            let mut options = BatchOptions::from_config(&config);
            options.transport = kind;
            if let Some(ms) = pacing_ms {
                options.pacing = std::time::Duration::from_millis(ms);
            }

            let mut router = Router::from_config(&config);
            let report = BatchController::new(compositor, options)
                .print_batch(&mut router, &items)
                .await;
            print_json(&report)?;

            if !report.all_succeeded() {
                eprintln!(
                    "Error: {} of {} copies failed",
                    report.failure_count(),
                    report.total_copies
                );
                std::process::exit(1);
            }
        }

        Commands::Send { document, copies } => {
            let document = LabelDocument::new(read_text(&document)?);
            let mut router = Router::from_config(&config);
            let delivery = router
                .dispatch(&document, kind, copies, config.allow_dangerous)
                .await?;
            print_json(&delivery)?;
        }

        Commands::Validate { document } => {
            let text = read_text(&document)?;
            let inspection = SafetyGate::new().inspect(&text, config.allow_dangerous);
            print_json(&inspection)?;
            if !inspection.is_valid {
                std::process::exit(2);
            }
        }

        Commands::Encode {
            barcode,
            po,
            sequence,
            length,
        } => {
            let length = length.unwrap_or(config.payload_target_length);
            let payload = RfidPayload::encode_checked(&barcode, &po, sequence, length)?;
            println!("{}", payload);
        }

        Commands::Discover => {
            let endpoints = transport::from_config(kind, &config).discover().await;
            if endpoints.is_empty() {
                eprintln!("No {} printers found.", kind);
            }
            print_json(&endpoints)?;
        }

        Commands::Test { endpoint } => {
            let mut transport = transport::from_config(kind, &config);
            let mut session = transport.connect(endpoint.as_deref()).await?;
            let accepted = transport.test(&mut session).await;
            transport.disconnect(&mut session).await;
            if !accepted {
                return Err(EtiquetaError::Send(format!(
                    "test label was not accepted by {}",
                    session.endpoint()
                )));
            }
            println!("Test label accepted by {} ({})", session.endpoint(), kind);
        }

        Commands::Cancel => {
            let document = LabelDocument::new(zpl::cancel_all());
            let mut router = Router::from_config(&config);
            let delivery = router.dispatch(&document, kind, 1, false).await?;
            println!("Cancel sent via {} to {}", delivery.transport, delivery.endpoint);
        }

        Commands::Serve { listen } => {
            let server_config = ServerConfig {
                listen_addr: listen,
            };
            server::serve(server_config, AppState::new(config)).await?;
        }
    }

    Ok(())
}

fn read_text(path: &Path) -> Result<String, EtiquetaError> {
    fs::read_to_string(path).map_err(|e| {
        EtiquetaError::Config(format!("Failed to read {}: {}", path.display(), e))
    })
}

fn read_items(path: &Path) -> Result<Vec<LabelItem>, EtiquetaError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| {
        EtiquetaError::Config(format!("Failed to parse items in {}: {}", path.display(), e))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), EtiquetaError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| EtiquetaError::Config(format!("Failed to encode output: {}", e)))?;
    println!("{}", text);
    Ok(())
}
