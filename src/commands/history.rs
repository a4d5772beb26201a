use clap::{Args, Subcommand};
use serde::Serialize;

use liftlog_core::{format_duration, PersonalRecord, RemoteStore};

use super::{truncate, OutputFormat};
use crate::app::App;

#[derive(Args)]
pub struct HistoryCommand {
    #[command(subcommand)]
    pub command: HistorySubcommand,
}

#[derive(Subcommand)]
pub enum HistorySubcommand {
    /// List completed workouts, most recent first
    List {
        /// Maximum number of workouts to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show a completed workout
    Show {
        /// Workout ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show totals across all workouts
    Stats {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the heaviest set per exercise
    Records {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Stats {
    workout_count: usize,
    total_volume: f64,
    last_workout: Option<String>,
    top_record: Option<PersonalRecord>,
}

impl HistoryCommand {
    pub fn run<R: RemoteStore>(&self, app: &App<R>) -> Result<(), Box<dyn std::error::Error>> {
        let store = app.store();
        match &self.command {
            HistorySubcommand::List { limit, format } => {
                let workouts: Vec<_> = store
                    .history()
                    .workouts()
                    .into_iter()
                    .take(*limit)
                    .collect();

                if workouts.is_empty() {
                    println!("No workouts found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&workouts)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<16}  {:<30}  {:>8}  {:>4}  {:>10}",
                            "DATE", "NAME", "DURATION", "SETS", "VOLUME"
                        );
                        println!("{}", "-".repeat(76));
                        for workout in &workouts {
                            println!(
                                "{:<16}  {:<30}  {:>8}  {:>4}  {:>10.1}",
                                workout.date.format("%Y-%m-%d %H:%M"),
                                truncate(&workout.name, 30),
                                format_duration(workout.duration),
                                workout.set_count(),
                                workout.volume()
                            );
                        }
                        println!(
                            "\nShowing {} of {} workout(s)",
                            workouts.len(),
                            store.workout_count()
                        );
                    }
                }
                Ok(())
            }

            HistorySubcommand::Show { id, format } => {
                let workout = match store.history().workout(id) {
                    Some(w) => w,
                    None => return Err(format!("Workout not found: {}", id).into()),
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(workout)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", workout);
                        println!("Volume: {:.1}kg", workout.volume());
                    }
                }
                Ok(())
            }

            HistorySubcommand::Stats { format } => {
                let stats = Stats {
                    workout_count: store.workout_count(),
                    total_volume: store.total_volume(),
                    last_workout: store.last_workout().map(|w| w.name.clone()),
                    top_record: store.top_personal_record(),
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    }
                    OutputFormat::Text => {
                        println!("Workouts:      {}", stats.workout_count);
                        println!("Total volume:  {:.1}kg", stats.total_volume);
                        if let Some(last) = store.last_workout() {
                            println!(
                                "Last workout:  {} ({})",
                                last.name,
                                last.date.format("%Y-%m-%d")
                            );
                        }
                        if let Some(record) = &stats.top_record {
                            println!("Top record:    {}", record);
                        }
                    }
                }
                Ok(())
            }

            HistorySubcommand::Records { format } => {
                let records = store.personal_records();

                if records.is_empty() {
                    println!("No records yet");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&records)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<30}  {:>8}  {:>4}  DATE",
                            "EXERCISE", "WEIGHT", "REPS"
                        );
                        println!("{}", "-".repeat(60));
                        for record in &records {
                            println!(
                                "{:<30}  {:>8}  {:>4}  {}",
                                truncate(&record.exercise_name, 30),
                                record.weight,
                                record.reps,
                                record.date.format("%Y-%m-%d")
                            );
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
