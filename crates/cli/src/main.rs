//! drivefs - command-line access to a Drive-backed virtual filesystem

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drivefs_vfs::{Authenticator, HttpDriveClient, LocalFolder, SharedDrive, VirtualFolder};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "drivefs", version)]
#[command(about = "Read and write files in a Drive-backed virtual filesystem", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(long, env = "DRIVEFS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Operate on a local directory instead of the remote store
    #[arg(long, value_name = "ROOT", global = true)]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print whether a file or folder exists
    Exists { path: String },

    /// Print a file's content
    Cat { path: String },

    /// Write a file from stdin or from a local file
    Put {
        path: String,
        /// Read content from this file instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// List a folder
    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    /// Create a folder
    Mkdir {
        path: String,
        /// Create missing parent folders too
        #[arg(short, long)]
        parents: bool,
    },

    /// Update a file's modification time, creating it when missing
    Touch { path: String },

    /// Remove a file, or a folder with -r
    Rm {
        path: String,
        #[arg(short, long)]
        recursive: bool,
    },

    /// Move or rename a file
    Mv { from: String, to: String },

    /// Copy a file
    Cp { from: String, to: String },

    /// Show file or folder metadata
    Stat { path: String },

    /// Store credentials obtained from an OAuth2 refresh token
    Login {
        #[arg(long, env = "DRIVEFS_REFRESH_TOKEN", hide_env_values = true)]
        refresh_token: String,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("DRIVEFS_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.config.is_none() {
        Config::create_default_if_missing();
    }
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log.level);

    let mut stdout = std::io::stdout().lock();

    if let Some(root) = cli.local {
        let store = LocalFolder::open(&root)
            .with_context(|| format!("Cannot open local root {}", root.display()))?;
        tracing::debug!(root = %root.display(), "Using local backend");
        return commands::execute(&store, cli.command, &config.drive.default_mime, &mut stdout).await;
    }

    let auth = Arc::new(Authenticator::new(config.token_cache(), config.oauth())?);

    if let Command::Login { refresh_token } = &cli.command {
        let token = auth.login(refresh_token).await?;
        eprintln!(
            "Logged in (scope {}); token stored at {}",
            Config::scope(),
            config.token_cache().path().display()
        );
        if let Some(expires) = token.expires_at {
            tracing::info!(%expires, "Access token expiry");
        }
        return Ok(());
    }

    let drive: SharedDrive = Arc::new(HttpDriveClient::new(config.http(), auth)?);
    let store = VirtualFolder::root(drive);
    commands::execute(&store, cli.command, &config.drive.default_mime, &mut stdout).await
}
