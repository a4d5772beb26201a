//! Sync CLI commands for the workout server.

use clap::{Args, Subcommand};

use liftlog_core::{HttpRemote, RemoteStore, SyncError, SyncMode};

use crate::app::App;
use crate::config::Config;

/// Sync with remote server
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: SyncSubcommand,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Fetch the latest collections from the server
    Pull,

    /// Push queued local changes to the server
    Push,

    /// Show sync configuration and server status
    Status,

    /// Stop syncing and clear this device's cached data
    SignOut,
}

impl SyncCommand {
    pub async fn run<R: RemoteStore>(
        &self,
        app: &mut App<R>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SyncSubcommand::Pull => {
                require_remote(app)?;
                let total = app.pull().await?;
                println!("Up to date: {} item(s) on the server.", total);
                Ok(())
            }
            SyncSubcommand::Push => {
                require_remote(app)?;
                let pushed = app.push().await?;
                if pushed == 0 {
                    println!("Nothing to push.");
                } else {
                    println!("Pushed {} change(s).", pushed);
                }
                Ok(())
            }
            SyncSubcommand::Status => {
                status(app, config).await;
                Ok(())
            }
            SyncSubcommand::SignOut => {
                let pending = app.store().outbox().len();
                app.sign_out();
                if pending > 0 {
                    println!("Discarded {} unpushed change(s).", pending);
                }
                println!("Signed out. Local data cleared.");
                Ok(())
            }
        }
    }
}

fn require_remote<R: RemoteStore>(app: &App<R>) -> Result<(), SyncError> {
    if app.mode() != SyncMode::Remote || !app.is_online() {
        return Err(SyncError::NotAttached);
    }
    Ok(())
}

async fn status<R: RemoteStore>(app: &App<R>, config: &Config) {
    println!("Sync Configuration");
    println!("==================");
    println!();

    let server_url = match &config.sync.server_url {
        Some(url) => url,
        None => {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  user: \"your-name\"");
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    enabled: true");
            println!();
            println!("Or set environment variables:");
            println!("  LIFTLOG_SYNC_URL");
            println!("  LIFTLOG_SYNC_API_KEY");
            println!("  LIFTLOG_SYNC_ENABLED");
            return;
        }
    };

    println!("Server:    {}", server_url);
    match &config.sync.api_key {
        Some(key) => {
            let shown: String = key.chars().take(8).collect();
            println!("API Key:   {}...", shown);
        }
        None => println!("API Key:   (none)"),
    }
    println!("User:      {}", config.user.value);
    println!(
        "Mode:      {}",
        match app.mode() {
            SyncMode::Remote => "remote",
            SyncMode::Local => "local (sync disabled)",
        }
    );
    println!("Pending:   {} change(s)", app.store().outbox().len());
    if let Some(error) = app.store().last_error() {
        println!("Last error: {}", error);
    }
    println!();

    print!("Server status: ");
    let remote = HttpRemote::new(server_url.clone(), config.sync.api_key.clone());
    match remote.check_health().await {
        Ok(()) => println!("✓ connected"),
        Err(SyncError::Connection(_)) => println!("✗ unreachable"),
        Err(e) => println!("✗ error: {}", e),
    }
}
