// CLI Interface
//
// This module provides the command-line interface for gitpulse.

use crate::config::{ConfigFile, ConfigOverrides, WorkflowConfig, ENV_CONFIG};
use crate::errors::{format_error, WorkflowError};
use crate::git::{GitCli, MutationBackend};
use crate::mcp::{run_stdio, Dispatcher, OperationRequest};
use crate::notify::DiscordWebhook;
use crate::summary::{generate_commit_message, ChangeStatusListing};
use crate::workflow::Orchestrator;
use anyhow::{Context, Result as AnyhowResult};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "GITPULSE_PORT";

/// gitpulse - commit, push, and announce working-tree changes
#[derive(Parser, Debug)]
#[command(name = "gitpulse")]
#[command(author = "GitPulse Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server that commits, pushes, and announces git changes", long_about = None)]
#[command(subcommand_required = false)]
#[command(arg_required_else_help = false)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(global = true, long = "config", short = 'c')]
    pub config: Option<PathBuf>,

    /// Path to the git working tree
    #[arg(global = true, long = "repo", short = 'r')]
    pub repo: Option<PathBuf>,

    /// Discord webhook URL
    #[arg(global = true, long = "webhook-url")]
    pub webhook_url: Option<String>,

    /// Enable verbose logging
    #[arg(global = true, long = "verbose", short = 'v')]
    pub verbose: bool,

    /// Compatibility flag for some AI tools (defaults to MCP stdio mode)
    #[arg(long = "stdio")]
    pub stdio: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run MCP server in stdio mode (for AI tool subprocess integration)
    Mcp {
        /// Compatibility flag for some AI tools
        #[arg(long = "stdio")]
        stdio: bool,
    },

    /// Start the MCP server over HTTP
    #[cfg(feature = "http-server")]
    Serve {
        /// Host address to bind to
        #[arg(long = "host", default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on (override with GITPULSE_PORT env var)
        #[arg(long = "port", default_value = "47300")]
        port: u16,
    },

    /// Validate the configuration and the working tree
    Check,

    /// Run a single tool and print its result
    Invoke {
        /// Tool name
        #[arg(value_name = "TOOL")]
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long = "args", value_name = "JSON")]
        args: Option<String>,
    },
}

impl Cli {
    /// Run the CLI
    pub async fn run(self) -> AnyhowResult<ExitCode> {
        init_logging(self.verbose);

        let command = if self.stdio {
            Commands::Mcp { stdio: true }
        } else {
            self.command.unwrap_or(Commands::Mcp { stdio: false })
        };

        let config_path = self
            .config
            .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from));
        let overrides = ConfigOverrides {
            working_directory: self.repo,
            webhook_url: self.webhook_url,
        };
        let config = load_config(config_path, overrides)?;

        match command {
            Commands::Mcp { .. } => {
                let dispatcher = build_dispatcher(config)?;
                run_stdio(&dispatcher).await?;
                Ok(ExitCode::SUCCESS)
            }
            #[cfg(feature = "http-server")]
            Commands::Serve { host, port } => {
                let dispatcher = build_dispatcher(config)?;
                cmd_serve(dispatcher, host, port).await?;
                Ok(ExitCode::SUCCESS)
            }
            Commands::Check => cmd_check(config).await,
            Commands::Invoke { name, args } => {
                let dispatcher = build_dispatcher(config)?;
                cmd_invoke(&dispatcher, name, args).await
            }
        }
    }
}

/// Initialize logging
///
/// Logs go to stderr; stdout belongs to the protocol.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Resolve the configuration from `.env`, the config file, env and flags
fn load_config(config_path: Option<PathBuf>, overrides: ConfigOverrides) -> AnyhowResult<Arc<WorkflowConfig>> {
    if let Ok(path) = dotenvy::dotenv() {
        info!("Loaded environment from {}", path.display());
    }

    let file = ConfigFile::discover(config_path.as_deref())?;
    let config = WorkflowConfig::from_env(file, overrides).map_err(startup_error)?;
    info!(
        "Working directory: {} (remote {})",
        config.working_directory.display(),
        config.remote
    );

    Ok(Arc::new(config))
}

fn build_dispatcher(config: Arc<WorkflowConfig>) -> AnyhowResult<Dispatcher> {
    let backend = GitCli::new(&config).map_err(startup_error)?;
    let sink = DiscordWebhook::new(&config).map_err(startup_error)?;
    let orchestrator = Orchestrator::new(config, Arc::new(backend), Arc::new(sink));
    Ok(Dispatcher::new(Arc::new(orchestrator)))
}

fn startup_error(err: WorkflowError) -> anyhow::Error {
    anyhow::anyhow!(format_error(&err))
}

/// Serve command implementation - Start MCP server
#[cfg(feature = "http-server")]
async fn cmd_serve(dispatcher: Dispatcher, host: String, port: u16) -> AnyhowResult<()> {
    use crate::mcp::{McpServer, McpServerConfig};
    use std::net::SocketAddr;

    let port = match std::env::var(ENV_PORT) {
        Ok(env_port) => env_port.parse::<u16>().unwrap_or(port),
        Err(_) => port,
    };

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid address or port")?;

    eprintln!("\ngitpulse MCP Server\n");
    eprintln!("Server starting on http://{}\n", addr);
    eprintln!("Available endpoints:");
    eprintln!("  POST /mcp            - JSON-RPC 2.0 endpoint");
    eprintln!("  GET  /mcp/tools/list - List available tools");
    eprintln!("  GET  /health         - Health check");
    eprintln!("\nPress Ctrl+C to stop the server\n");

    let server = McpServer::new(
        McpServerConfig {
            bind_address: addr,
            ..Default::default()
        },
        Arc::new(dispatcher),
    );
    server.run().await.context("Server error")?;

    Ok(())
}

/// Check command implementation
async fn cmd_check(config: Arc<WorkflowConfig>) -> AnyhowResult<ExitCode> {
    config.validate().map_err(startup_error)?;
    let backend = GitCli::new(&config).map_err(startup_error)?;

    let status = backend
        .status()
        .await
        .context("git status failed")?;
    let listing = ChangeStatusListing::parse(&status);

    println!("\ngitpulse configuration OK\n");
    println!("  Working tree: {}", config.working_directory.display());
    println!("  Remote: {}", config.remote);
    println!("  Webhook: {:?}", config.notification_target);
    println!("  Pending changes: {}", listing.len());
    if !listing.is_empty() {
        println!("  Next commit message: {}", generate_commit_message(&status));
    }

    Ok(ExitCode::SUCCESS)
}

/// Invoke command implementation
async fn cmd_invoke(dispatcher: &Dispatcher, name: String, args: Option<String>) -> AnyhowResult<ExitCode> {
    let arguments = match args {
        Some(raw) => serde_json::from_str::<Value>(&raw).context("--args must be valid JSON")?,
        None => Value::Null,
    };

    let result = dispatcher.dispatch(OperationRequest::new(name, arguments)).await;
    println!("{}", result.text);

    Ok(if result.succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Main entry point for the CLI
pub async fn main() -> AnyhowResult<ExitCode> {
    let cli = Cli::parse();
    cli.run().await
}
