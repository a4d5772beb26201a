use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::Path;

use super::OutputFormat;
use crate::config::Config;

const DEFAULT_CONFIG: &str = r#"# liftlog configuration

# Directory for the workout draft and local cache
# data_dir: ~/.local/share/liftlog

# Path to SQLite database (default: <data_dir>/liftlog.db)
# database_path: ~/.local/share/liftlog/liftlog.db

# User whose workouts are synced
user: default

# sync:
#   server_url: "http://localhost:8080"
#   api_key: "your-api-key"
#   enabled: false
#   wait_ms: 3000
"#;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<&Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("user: {}", config.user.value);
                        println!("  source: {}", config.user.source);
                        println!();

                        println!(
                            "sync.server_url: {}",
                            config.sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!("sync.enabled: {}", config.sync.enabled);
                        println!("sync.wait: {}ms", config.sync.wait().as_millis());
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = config_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'liftlog config show' to view current configuration.");
                    return Ok(());
                }

                write_default_config(&config_path)?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_file_loads() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.yaml");

        write_default_config(&path).unwrap();

        let config = Config::load_with_env(Some(path.clone()), |_| None).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.user.value, "default");
        assert_eq!(config.user.source, ConfigSource::File);
        assert!(!config.sync.is_configured());
    }
}
