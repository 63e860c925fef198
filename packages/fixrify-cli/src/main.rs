//! Fixrify CLI - headless client for the Fixrify service-booking platform
//!
//! This binary drives the client core from the command line:
//! - Sign in (customer/professional or admin) and keep a durable session
//! - Inspect and destroy the stored session
//! - Download admin report exports
//! - Show configuration paths and settings

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fixrify_core::api::{self, load_endpoint_config, ApiClient, Exports, HttpTransport};
use fixrify_core::error::{ApiError, TracingSink};
use fixrify_core::session::{storage_info, SessionManager, TokenStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "fixrify")]
#[command(author = "Fixrify Team")]
#[command(version)]
#[command(about = "Headless client for the Fixrify service-booking platform")]
#[command(long_about = "
Fixrify CLI signs in to a Fixrify backend and keeps a durable session,
renewing the access credential transparently when it expires.

Quick start:
  1. Sign in:          fixrify login --email you@example.com --password ...
  2. Check session:    fixrify status
  3. Download report:  fixrify export --output report.csv   (admin only)
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and persist the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,

        /// Use the admin sign-in endpoint
        #[arg(long)]
        admin: bool,
    },

    /// Show the current session
    Status,

    /// Sign out and destroy the stored session
    Logout,

    /// Build and download the service-request report (admin only)
    Export {
        /// Fetch an already-created export by task id instead of starting one
        #[arg(short, long)]
        task: Option<String>,

        /// Write the CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("fixrify={},fixrify_core={}", log_level, log_level).into()),
        )
        .with_target(false)
        .init();

    match &cli.command {
        Commands::Login { email, password, admin } => cmd_login(&cli, email, password, *admin).await,
        Commands::Status => cmd_status(&cli).await,
        Commands::Logout => cmd_logout(&cli).await,
        Commands::Export { task, output } => cmd_export(&cli, task.clone(), output.clone()).await,
        Commands::Config => cmd_config(&cli).await,
    }
}

/// Everything a command needs to talk to the backend.
struct Client {
    manager: SessionManager,
    api: ApiClient,
}

fn connect() -> Result<Client> {
    let config = load_endpoint_config();
    let store = Arc::new(TokenStore::open()?);
    let transport = Arc::new(HttpTransport::new(&config)?);
    let api = ApiClient::new(transport, store.clone(), Arc::new(TracingSink));
    let manager = SessionManager::new(store, api.clone());
    Ok(Client { manager, api })
}

async fn cmd_login(cli: &Cli, email: &str, password: &str, admin: bool) -> Result<()> {
    let client = connect()?;

    if client.manager.session().is_authenticated() {
        match cli.format {
            OutputFormat::Text => {
                println!("Already signed in. Use 'fixrify logout' first.");
            }
            OutputFormat::Json => {
                println!("{}", serde_json::json!({
                    "status": "already_signed_in",
                }));
            }
        }
        return Ok(());
    }

    let user = if admin {
        client.manager.admin_login(email, password).await
    } else {
        client.manager.login(email, password).await
    }
    .context("Sign-in failed")?;

    match cli.format {
        OutputFormat::Text => {
            println!("Signed in as {} ({:?})", user.email, user.role);
            println!("Session stored in: {}", storage_info());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "signed_in",
                "email": user.email,
                "name": user.name,
                "role": user.role,
            }));
        }
    }

    Ok(())
}

async fn cmd_status(cli: &Cli) -> Result<()> {
    let client = connect()?;
    let session = client
        .manager
        .check_session()
        .await
        .context("Session check failed")?;

    match cli.format {
        OutputFormat::Text => {
            if let Some(user) = &session.user {
                println!("Status:  Signed in");
                println!("Email:   {}", user.email);
                println!("Role:    {:?}", user.role);
                println!();
                println!("Storage: {}", storage_info());
            } else {
                println!("Status: Not signed in");
                println!();
                println!("Run 'fixrify login' to authenticate.");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "authenticated": session.is_authenticated(),
                "user": session.user,
                "storage_info": storage_info(),
            }));
        }
    }

    Ok(())
}

async fn cmd_logout(cli: &Cli) -> Result<()> {
    let client = connect()?;

    if !client.manager.session().is_authenticated() {
        match cli.format {
            OutputFormat::Text => println!("Not signed in."),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({
                    "status": "not_signed_in",
                }));
            }
        }
        return Ok(());
    }

    client.manager.logout().await;

    match cli.format {
        OutputFormat::Text => println!("Signed out."),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "signed_out",
            }));
        }
    }

    Ok(())
}

/// How long to wait for the server to finish building an export.
const EXPORT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const EXPORT_POLL_ATTEMPTS: u32 = 30;

async fn cmd_export(cli: &Cli, task: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let client = connect()?;
    let exports = Exports::new(client.api.clone());

    let task_id = match task {
        Some(id) => id,
        None => {
            let created = exports
                .create_service_request_export()
                .await
                .context("Failed to start export")?;
            match cli.format {
                OutputFormat::Text => println!("Export started (task {})", created.task_id),
                OutputFormat::Json => {}
            }
            created.task_id
        }
    };

    // The server builds the artifact asynchronously; a not-ready task id
    // comes back as a client error, so poll until it materializes.
    let mut artifact = None;
    for attempt in 0..EXPORT_POLL_ATTEMPTS {
        match exports.fetch(&task_id).await {
            Ok(bytes) => {
                artifact = Some(bytes);
                break;
            }
            Err(ApiError::Validation { status, .. }) if status == 404 || status == 202 => {
                tracing::debug!(attempt, "export not ready yet");
                tokio::time::sleep(EXPORT_POLL_INTERVAL).await;
            }
            Err(e) => return Err(anyhow::anyhow!(e)).context("Export download failed"),
        }
    }
    let artifact =
        artifact.with_context(|| format!("Export {} was not ready in time", task_id))?;

    match output {
        Some(path) => {
            std::fs::write(&path, &artifact)
                .with_context(|| format!("Failed to write {:?}", path))?;
            match cli.format {
                OutputFormat::Text => {
                    println!("Wrote {} bytes to {}", artifact.len(), path.display());
                }
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({
                        "task_id": task_id,
                        "bytes": artifact.len(),
                        "output": path,
                    }));
                }
            }
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&artifact)
                .context("Failed to write export to stdout")?;
        }
    }

    Ok(())
}

async fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_endpoint_config();
    let config_path = api::config::get_config_file_path_string();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:     {}", config_path);
            println!("API endpoint:    {} (from {})", config.api_url, config.source);
            println!("Session storage: {}", storage_info());
            println!();
            println!("Environment variables:");
            println!("  FIXRIFY_API_URL - Override API endpoint");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", api::config::generate_example_config());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "config_file": config_path,
                "api_url": config.api_url,
                "api_source": format!("{}", config.source),
                "session_storage": storage_info(),
            }));
        }
    }

    Ok(())
}
