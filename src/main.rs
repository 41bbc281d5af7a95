//! mcp-client: minimal MCP client for stdio servers
//!
//! Launches a server script, lists its tools, prompts and resources, and
//! optionally drops into an interactive command loop.

use std::error::Error as _;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use mcp_client::config::{self, Config};
use mcp_client::error::ClientError;
use mcp_client::mcp::{McpClient, ServerEndpoint};
use mcp_client::{repl, report};

/// Minimal MCP client for servers speaking over stdio.
///
/// Connects to a Python MCP server script and lists what it offers. Any
/// failure exits non-zero, after the connection has been closed.
#[derive(Parser, Debug)]
#[command(name = "mcp-client")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Exits with a non-zero status if the script is missing or the server \
cannot be started, reached or listed. The connection is always closed before exiting.")]
struct Args {
    /// Path to the server script (.py)
    #[arg(value_name = "SERVER_PATH")]
    server_path: PathBuf,

    /// Print the server's tools, prompts and resources, then exit
    #[arg(short, long, conflicts_with = "chat")]
    members: bool,

    /// Enter the interactive command loop
    #[arg(short, long)]
    chat: bool,

    /// Path to configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr; stdout is for output.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints an error and its source chain to stderr.
fn report_error(e: &ClientError) {
    eprintln!("Error: {e}");
    let mut source = e.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

/// Connects, runs the requested mode and closes the connection.
///
/// Close always runs, including after a failed connect or Ctrl+C.
async fn run(args: &Args, cfg: &Config) -> ExitCode {
    let endpoint = ServerEndpoint::from_config(args.server_path.clone(), &cfg.server);
    let mut client = McpClient::new(cfg.session.clone());

    let outcome = tokio::select! {
        result = application(&mut client, &endpoint, args) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, closing connection");
            Ok(())
        }
    };

    client.close().await;

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_recoverable() {
                error!(error = %e, "Connection error");
            } else {
                error!(error = %e, "Client misuse");
            }
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

/// The part of a run that Ctrl+C may cancel.
async fn application(
    client: &mut McpClient,
    endpoint: &ServerEndpoint,
    args: &Args,
) -> Result<(), ClientError> {
    let server = client.connect(endpoint).await?;
    info!(
        server = %server.server_info.name,
        version = server.server_info.version.as_deref().unwrap_or("unknown"),
        protocol = %server.protocol_version,
        "Connected"
    );
    if !args.members && !args.chat {
        println!(
            "Connected to {} (protocol {})",
            server.server_info.name, server.protocol_version
        );
    }

    if args.members {
        let listing = client.list_capabilities().await?;
        print!("{}", report::members_report(&listing));
    }

    if args.chat {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        repl::run(client, stdin, &mut stdout).await?;
    }

    Ok(())
}

/// Entry point for the mcp-client CLI.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    if !args.server_path.exists() {
        eprintln!(
            "Error: Server script '{}' not found",
            args.server_path.display()
        );
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %args.server_path.display(),
        "Starting mcp-client"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(&args, &cfg))
}
