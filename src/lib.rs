//! Liftlog sync server library.
//!
//! Stores each user's `workouts`, `routines` and `exercises` collections and
//! streams snapshots to watching clients.

pub mod server;
