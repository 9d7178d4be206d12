//! Normalization of confirmed registrants into a participant sequence.

use super::errors::{TournamentError, TournamentResult};
use super::models::ParticipantId;
use std::collections::{HashMap, HashSet};

/// Minimum participants needed to generate any match
pub const MIN_PARTICIPANTS: usize = 2;

/// Ordered, duplicate-free list of participants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantPool {
    participants: Vec<ParticipantId>,
}

impl ParticipantPool {
    /// Build a pool from registrants ordered by registration time.
    ///
    /// Duplicates keep their first position.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InsufficientParticipants` - Fewer than two remain
    pub fn from_registrants(registrants: &[ParticipantId]) -> TournamentResult<Self> {
        let mut seen = HashSet::with_capacity(registrants.len());
        let participants: Vec<ParticipantId> = registrants
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        if participants.len() < MIN_PARTICIPANTS {
            return Err(TournamentError::InsufficientParticipants {
                needed: MIN_PARTICIPANTS,
                current: participants.len(),
            });
        }

        Ok(Self { participants })
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn into_inner(self) -> Vec<ParticipantId> {
        self.participants
    }

    /// Map of participant to registration position, used for tie-breaking
    pub fn registration_order(&self) -> HashMap<ParticipantId, usize> {
        self.participants
            .iter()
            .enumerate()
            .map(|(idx, id)| (*id, idx))
            .collect()
    }
}
