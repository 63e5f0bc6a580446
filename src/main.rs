//! Makai MCP protocol engine - Main entrypoint.
//!
//! Initializes logging, loads configuration, wires the built-in providers
//! into a dispatcher, and serves on the configured transport.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use makai_mcp_lib::config::{self, ConfigLoader, LogConfig, MakaiConfig, TransportType};
use makai_mcp_lib::error::{MakaiError, MakaiResult};
use makai_mcp_lib::notify::Notifier;
use makai_mcp_lib::protocol::jsonrpc::setup::{create_dispatcher, Providers};
use makai_mcp_lib::transport;

/// Command line arguments for the Makai MCP protocol engine.
#[derive(Parser, Debug)]
#[clap(name = "Makai MCP", version, author, about)]
struct Args {
    /// Path to configuration file
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    command: Option<Command>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the server
    Start,

    /// Validate the configuration file
    Validate,

    /// Generate a default configuration file
    GenConfig {
        /// Path to output configuration file
        #[clap(short, long, value_parser)]
        output: PathBuf,
    },
}

/// Initialize the logging system.
///
/// Logs always go to stderr: with the stdio transport, stdout carries the
/// wire protocol and must stay clean. The filter starts at `info` (or
/// `RUST_LOG` when set) and is swapped to the configured level through the
/// returned reload handle once configuration has loaded.
fn init_logging() -> MakaiResult<reload::Handle<EnvFilter, Registry>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true),
        )
        .try_init()
        .map_err(|e| MakaiError::Custom(format!("Failed to set global tracing subscriber: {e}")))?;

    Ok(handle)
}

/// Swaps the log filter to the configured level.
///
/// `RUST_LOG` wins when set, so the environment stays the operator's
/// override channel.
fn apply_log_config(handle: &reload::Handle<EnvFilter, Registry>, log: &LogConfig) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    if let Err(e) = handle.reload(EnvFilter::new(&log.level)) {
        tracing::warn!(error = %e, "Failed to apply configured log level");
    }
}

fn main() -> MakaiResult<()> {
    let log_handle = init_logging()?;

    let args = <Args as clap::Parser>::parse();
    let config_loader = ConfigLoader::new(args.config.as_deref(), "MAKAI");

    match args.command.unwrap_or(Command::Start) {
        Command::Start => {
            let config = match config_loader.load() {
                Ok(config) => config,
                Err(e) => {
                    tracing::error!("Configuration error: {}", e);
                    process::exit(1);
                }
            };
            apply_log_config(&log_handle, &config.log);
            config::init_global_config(config);
            run_server()
        }
        Command::Validate => match config_loader.load() {
            Ok(_) => {
                info!("Configuration validated successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!("Configuration validation error: {}", e);
                process::exit(1);
            }
        },
        Command::GenConfig { output } => {
            let default_config = MakaiConfig::default();

            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).map_err(MakaiError::Io)?;
            }
            let toml = toml::to_string_pretty(&default_config)
                .map_err(|e| MakaiError::Custom(format!("Failed to serialize config: {e}")))?;
            std::fs::write(&output, toml).map_err(MakaiError::Io)?;

            info!("Default configuration written to {:?}", output);
            Ok(())
        }
    }
}

/// Builds the dispatcher and serves on the configured transport.
fn run_server() -> MakaiResult<()> {
    let config = config::global_config();
    info!(
        name = %config.server.name,
        transport = ?config.server.transport,
        framing = ?config.server.framing,
        "Starting Makai MCP protocol engine"
    );

    let notifier = Notifier::with_poll_interval(Duration::from_millis(
        config.notify.poll_interval_ms,
    ));
    let dispatcher = create_dispatcher(&Providers::builtin(), Some(notifier.clone()));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(MakaiError::Io)?;

    let mode = config.server.framing.into();
    let max_size = config.server.max_message_size;

    let result = runtime.block_on(async {
        match config.server.transport {
            TransportType::Stdio => {
                transport::run_stdio(dispatcher, mode, max_size, Some(notifier.clone())).await
            }
            TransportType::Tcp => {
                let address = config.server.address.to_string();
                transport::run_tcp(dispatcher, &address, mode, max_size, Some(notifier.clone()))
                    .await
            }
        }
    });

    notifier.stop();
    result?;

    info!("Server stopped");
    Ok(())
}
