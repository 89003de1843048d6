//! toolbox-mcp: a minimal MCP server with demo tools
//!
//! Speaks JSON-RPC 2.0 over either stdio (newline-delimited) or HTTP with
//! Server-Sent Events, and exposes a small set of built-in tools.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use toolbox_mcp::config;
use toolbox_mcp::mcp::server::McpServer;
use toolbox_mcp::mcp::sse::{build_router, AppState};
use toolbox_mcp::mcp::transport::StdioTransport;
use toolbox_mcp::tools;
use toolbox_mcp::tools::Storage;

/// Minimal MCP server exposing demo tools.
///
/// Runs the Model Context Protocol over stdio by default, or over HTTP with
/// Server-Sent Events when `--transport sse` is given.
#[derive(Parser, Debug)]
#[command(name = "toolbox-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Transport to serve on
    #[arg(short, long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// Port for the SSE transport (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
    /// HTTP server with an SSE stream and a message submit endpoint
    Sse,
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
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs go to stderr so the stdio transport keeps stdout clean for
/// protocol messages.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the server with all built-in tools registered.
fn build_server() -> McpServer {
    let mut server = McpServer::new();
    let storage = Arc::new(Storage::new());
    tools::register_defaults(&mut server, &storage);
    server
}

async fn run_stdio(server: &McpServer) -> std::io::Result<()> {
    info!("MCP server ready on stdio, waiting for client...");
    let mut transport = StdioTransport::new();
    transport.run(server).await
}

async fn run_sse(server: McpServer, cfg: &config::ServerConfig) -> std::io::Result<()> {
    let state = AppState::new(Arc::new(server), cfg.message_path.clone());
    let router = build_router(state, &cfg.sse_path);

    let addr = format!("{}:{}", cfg.bind_addr, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        addr = %addr,
        sse_path = %cfg.sse_path,
        message_path = %cfg.message_path,
        "MCP server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

/// Entry point for the toolbox-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?args.transport,
        "Starting toolbox-mcp server"
    );

    let server = build_server();
    info!(tools = server.tool_count(), "Registered built-in tools");

    let mut server_cfg = cfg.server;
    if let Some(port) = args.port {
        server_cfg.port = port;
    }

    // Run the server
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = match args.transport {
        Transport::Stdio => runtime.block_on(run_stdio(&server)),
        Transport::Sse => runtime.block_on(run_sse(server, &server_cfg)),
    };

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
