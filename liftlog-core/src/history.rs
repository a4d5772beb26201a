//! Completed workouts and the statistics derived from them.
//!
//! History is most-recent-first. Records are only ever added at the head
//! (or appended by imports) and are never modified afterwards.

use std::collections::HashMap;

use crate::layered::{Layered, PendingChange, Placement, SyncMode};
use crate::models::{PersonalRecord, Workout};

pub struct History {
    workouts: Layered<Workout>,
}

impl History {
    pub fn new(mode: SyncMode) -> Self {
        Self {
            workouts: Layered::new(mode, Placement::Front),
        }
    }

    /// Prepends a completed workout.
    pub fn record_completed_workout(&mut self, workout: Workout) {
        tracing::debug!("Recording workout {} ({})", workout.name, workout.id);
        self.workouts.insert(workout);
    }

    /// Appends older workouts behind everything already recorded.
    pub fn append_older(&mut self, workouts: Vec<Workout>) {
        for workout in workouts {
            self.workouts.append(workout);
        }
    }

    /// Replaces the confirmed history with a remote snapshot, keeping the
    /// snapshot's order.
    pub fn replace_confirmed(&mut self, workouts: Vec<Workout>) {
        self.workouts.replace_confirmed(workouts);
    }

    pub fn workouts(&self) -> Vec<&Workout> {
        self.workouts.items()
    }

    pub fn workout(&self, id: &str) -> Option<&Workout> {
        self.workouts.get(id)
    }

    pub fn confirmed(&self) -> &[Workout] {
        self.workouts.confirmed()
    }

    pub fn pending(&self) -> &[PendingChange<Workout>] {
        self.workouts.pending()
    }

    pub fn last_workout(&self) -> Option<&Workout> {
        self.workouts.items().into_iter().next()
    }

    pub fn workout_count(&self) -> usize {
        self.workouts.len()
    }

    /// Lifetime `weight × reps` over every set of every workout.
    pub fn total_volume(&self) -> f64 {
        self.workouts
            .items()
            .into_iter()
            .map(Workout::volume)
            .fold(0.0, |total, volume| total + volume)
    }

    /// One record per exercise name, heaviest first.
    ///
    /// Records are keyed by name rather than exercise id. Within a name the
    /// heaviest set wins, then the one with more reps; on a full tie the set
    /// seen first in history order is kept. Equal weights keep first-seen
    /// order in the result.
    pub fn personal_records(&self) -> Vec<PersonalRecord> {
        let mut records: Vec<PersonalRecord> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for workout in self.workouts.items() {
            for exercise in &workout.exercises {
                for set in &exercise.sets {
                    match index.get(exercise.name.as_str()) {
                        Some(&i) => {
                            if records[i].is_beaten_by(set.weight, set.reps) {
                                records[i].weight = set.weight;
                                records[i].reps = set.reps;
                                records[i].date = workout.date;
                            }
                        }
                        None => {
                            index.insert(exercise.name.as_str(), records.len());
                            records.push(PersonalRecord {
                                exercise_name: exercise.name.clone(),
                                weight: set.weight,
                                reps: set.reps,
                                date: workout.date,
                            });
                        }
                    }
                }
            }
        }

        records.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        records
    }

    pub fn top_personal_record(&self) -> Option<PersonalRecord> {
        self.personal_records().into_iter().next()
    }

    pub fn clear(&mut self) {
        self.workouts.clear();
    }
}
