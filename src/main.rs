use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod commands;
mod config;
mod db;

use app::App;
use commands::{
    BackupCommand, ConfigCommand, ExerciseCommand, HistoryCommand, RoutineCommand, SyncCommand,
    WorkoutCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(version)]
#[command(about = "A workout tracking CLI application", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the exercise catalog
    Exercise(ExerciseCommand),

    /// Manage workout routines
    Routine(RoutineCommand),

    /// Run the active workout
    Workout(WorkoutCommand),

    /// Review completed workouts
    History(HistoryCommand),

    /// Export or import a backup file
    Backup(BackupCommand),

    /// Sync with remote server
    Sync(SyncCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "liftlog=warn,liftlog_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.clone())?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config, cli.config.as_deref()),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    let mut app = App::open(&config).await?;
    let result = match command {
        Commands::Exercise(cmd) => cmd.run(&mut app),
        Commands::Routine(cmd) => cmd.run(&mut app),
        Commands::Workout(cmd) => cmd.run(&mut app),
        Commands::History(cmd) => cmd.run(&app),
        Commands::Backup(cmd) => cmd.run(&mut app).await,
        Commands::Sync(cmd) => cmd.run(&mut app, &config).await,
        Commands::Config(_) => Ok(()),
    };

    // Save whatever state the command reached, even when it failed
    app.finish().await?;
    result
}
