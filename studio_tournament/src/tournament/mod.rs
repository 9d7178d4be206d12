//! Tournament module providing match generation, scheduling and standings.
//!
//! This module implements:
//! - Participant pooling with order-preserving deduplication
//! - Seeded group partitioning for group+knockout competitions
//! - Round-robin and knockout pairing
//! - Table and time-slot allocation over a fixed table pool
//! - The match result state machine and staged knockout advancement
//! - Standings with group and overall ranks
//!
//! ## Example
//!
//! ```no_run
//! use studio_tournament::db::Database;
//! use studio_tournament::tournament::TournamentManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let manager = TournamentManager::with_pool(Arc::new(db.pool().clone()));
//!
//!     let outcome = manager.generate(42, "group_knockout", None).await?;
//!     println!("Generated {} matches with seed {}", outcome.matches.len(), outcome.seed);
//!
//!     let first = &outcome.matches[0];
//!     manager.record_result(first.id, Some(3), Some(1)).await?;
//!
//!     for standing in manager.standings(42, Some("A")).await? {
//!         println!("{}: {} won", standing.participant_id, standing.matches_won);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod allocator;
pub mod bracket;
pub mod config;
pub mod errors;
pub mod locks;
pub mod manager;
pub mod models;
pub mod partition;
pub mod pool;
pub mod scheduler;
pub mod standings;
pub mod state_machine;

pub use allocator::SlotAllocator;
pub use bracket::BracketProgress;
pub use config::GenerationConfig;
pub use errors::{TournamentError, TournamentResult};
pub use locks::{GenerationGuard, GenerationLocks};
pub use manager::{BracketAdvance, TournamentManager};
pub use models::{
    BracketPlan, Competition, CompetitionId, CompetitionStatus, GenerationOutcome, Group, GroupId,
    Match, MatchId, MatchStatus, MatchType, NewGroup, ParticipantId, PendingMatch, ScheduledMatch,
    Standing, TournamentFormat,
};
pub use pool::ParticipantPool;
pub use scheduler::{KnockoutRound, RoundShape};
pub use state_machine::{MatchTransition, ScoreSubmission};
