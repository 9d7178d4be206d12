//! Per-competition generation lock.

use super::errors::{TournamentError, TournamentResult};
use super::models::CompetitionId;
use log::warn;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of competitions with a generation in flight.
///
/// Competitions are locked independently; a second request for a busy
/// competition fails fast instead of waiting.
#[derive(Debug, Clone, Default)]
pub struct GenerationLocks {
    active: Arc<Mutex<HashSet<CompetitionId>>>,
}

impl GenerationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashSet<CompetitionId>> {
        // The set stays consistent even if a holder panicked mid-insert
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Claim the lock for `competition_id`
    ///
    /// # Errors
    ///
    /// * `TournamentError::GenerationInProgress` - Already held
    pub fn try_acquire(&self, competition_id: CompetitionId) -> TournamentResult<GenerationGuard> {
        if !self.active().insert(competition_id) {
            warn!("Rejected concurrent generation for competition {competition_id}");
            return Err(TournamentError::GenerationInProgress(competition_id));
        }

        Ok(GenerationGuard {
            locks: self.clone(),
            competition_id,
        })
    }

    pub fn is_locked(&self, competition_id: CompetitionId) -> bool {
        self.active().contains(&competition_id)
    }
}

/// Releases the competition's lock when dropped
#[derive(Debug)]
pub struct GenerationGuard {
    locks: GenerationLocks,
    competition_id: CompetitionId,
}

impl GenerationGuard {
    pub fn competition_id(&self) -> CompetitionId {
        self.competition_id
    }
}

impl Drop for GenerationGuard {
    fn drop(&mut self) {
        self.locks.active().remove(&self.competition_id);
    }
}
