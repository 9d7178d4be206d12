//! # Studio Tournament
//!
//! Match generation, scheduling and standings for training-studio competitions.
//!
//! Given the confirmed registrants of a competition, the engine builds a
//! complete bracket in one of two formats, places every match on a table and
//! time slot from a fixed pool, tracks each match through its result state
//! machine and recomputes standings from the recorded scores.
//!
//! ## Formats
//!
//! - **round_robin**: every participant plays every other participant once
//! - **group_knockout**: seeded groups play a round-robin, then group winners
//!   enter a single-elimination bracket that is built round by round as
//!   results come in
//!
//! ## Core Modules
//!
//! - [`tournament`]: Pairing, allocation, state machine, standings and the manager
//! - [`db`]: PostgreSQL pool, schema migrations and the competition repository
//!
//! ## Example
//!
//! ```
//! use studio_tournament::tournament::{SlotAllocator, scheduler};
//! use chrono::Utc;
//!
//! let pairings = scheduler::round_robin(&[1, 2, 3, 4]);
//! let allocator = SlotAllocator::new(2, 30, Utc::now()).unwrap();
//! let scheduled = allocator.allocate(0, pairings).unwrap();
//! assert_eq!(scheduled.len(), 6);
//! ```

/// Database access, configuration and the competition repository.
pub mod db;

/// Bracket generation, scheduling, results and standings.
pub mod tournament;
pub use tournament::{
    GenerationConfig, TournamentError, TournamentManager, TournamentResult,
    models::{self, Competition, Match, Standing, TournamentFormat},
};
