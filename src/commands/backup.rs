use clap::{Args, Subcommand};
use std::path::PathBuf;

use liftlog_core::{ExportSnapshot, RemoteStore, DEFAULT_BACKUP_FILE};

use crate::app::App;

#[derive(Args)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub command: BackupSubcommand,
}

#[derive(Subcommand)]
pub enum BackupSubcommand {
    /// Write all exercises, routines and workouts to a JSON file
    Export {
        /// Output file
        #[arg(long, short, default_value = DEFAULT_BACKUP_FILE)]
        output: PathBuf,
    },

    /// Import a backup as fresh copies
    Import {
        /// Backup file to read
        file: PathBuf,
    },
}

impl BackupCommand {
    pub async fn run<R: RemoteStore>(
        &self,
        app: &mut App<R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BackupSubcommand::Export { output } => {
                let snapshot = app.export_snapshot().await?;
                snapshot.write_file(output)?;
                println!("Exported {} to {}", snapshot.summary(), output.display());
                Ok(())
            }

            BackupSubcommand::Import { file } => {
                let blob = std::fs::read_to_string(file)
                    .map_err(|e| format!("Failed to read '{}': {}", file.display(), e))?;
                // Fail before touching anything if the file isn't a backup
                ExportSnapshot::from_json(&blob)?;

                let summary = app.import_snapshot(&blob).await?;
                println!("Imported {}", summary);
                Ok(())
            }
        }
    }
}
