//! Event-logging core for a personal habit tracker.
//!
//! A date-partitioned journal of timed events feeds pure derivations
//! (streaks, heatmaps, monthly counts, XP levels) and a weighted prize
//! draw. Documents persist locally in SQLite and optionally reconcile
//! against a remote document store. [`session::Session`] ties it together
//! behind a command interface.

pub mod clock;
pub mod config;
pub mod derive;
pub mod journal;
pub mod logging;
pub mod model;
pub mod progression;
pub mod remote;
pub mod report;
pub mod retry;
pub mod reward;
pub mod session;
pub mod store;
pub mod sync;
