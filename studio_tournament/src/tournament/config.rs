//! Per-generation configuration.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Competition, TournamentFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of tables when a competition does not specify one
pub const DEFAULT_TABLE_COUNT: u32 = 8;

/// Default minutes reserved per match
pub const DEFAULT_SLOT_INTERVAL_MINS: u32 = 30;

/// Smallest group size the dynamic sizing picks
pub const MIN_DYNAMIC_GROUP_SIZE: usize = 4;

/// Largest group size the dynamic sizing picks
pub const MAX_DYNAMIC_GROUP_SIZE: usize = 6;

/// Table counts and intervals are stored in `INTEGER` columns
const MAX_STORED: u32 = i32::MAX as u32;

/// Parameters for a single bracket generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub format: TournamentFormat,
    /// Number of tables matches rotate across
    pub table_count: u32,
    /// Minutes between consecutive slot starts
    pub slot_interval_mins: u32,
    /// Explicit group size, overriding the dynamic choice
    pub group_size: Option<usize>,
    /// Shuffle seed; a time-based seed is drawn when absent
    pub seed: Option<u64>,
    /// Start of slot 0
    pub start_time: DateTime<Utc>,
}

impl GenerationConfig {
    /// Create a configuration with default table pool and interval
    pub fn new(format: TournamentFormat, start_time: DateTime<Utc>) -> Self {
        Self {
            format,
            table_count: DEFAULT_TABLE_COUNT,
            slot_interval_mins: DEFAULT_SLOT_INTERVAL_MINS,
            group_size: None,
            seed: None,
            start_time,
        }
    }

    /// Configuration matching the competition's stored settings
    pub fn for_competition(competition: &Competition) -> Self {
        Self {
            format: competition.format,
            table_count: competition.table_count,
            slot_interval_mins: competition.slot_interval_mins,
            group_size: None,
            seed: None,
            start_time: competition.start_time,
        }
    }

    pub fn with_tables(mut self, table_count: u32) -> Self {
        self.table_count = table_count;
        self
    }

    pub fn with_slot_interval(mut self, minutes: u32) -> Self {
        self.slot_interval_mins = minutes;
        self
    }

    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = Some(group_size);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate against the number of participants that will be scheduled
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidConfig` - A field is out of range
    pub fn validate(&self, participant_count: usize) -> TournamentResult<()> {
        if self.table_count == 0 || self.table_count > MAX_STORED {
            return Err(TournamentError::InvalidConfig {
                field: "table_count",
                reason: format!("Must be between 1 and {MAX_STORED}"),
            });
        }

        if self.slot_interval_mins == 0 || self.slot_interval_mins > MAX_STORED {
            return Err(TournamentError::InvalidConfig {
                field: "slot_interval",
                reason: format!("Must be between 1 and {MAX_STORED}"),
            });
        }

        if let Some(size) = self.group_size {
            if size < 2 || size > participant_count {
                return Err(TournamentError::InvalidConfig {
                    field: "group_size",
                    reason: format!("Must be between 2 and {participant_count}, got {size}"),
                });
            }
        }

        Ok(())
    }

    /// Group size to use for `participant_count` participants
    pub fn effective_group_size(&self, participant_count: usize) -> usize {
        self.group_size
            .unwrap_or_else(|| dynamic_group_size(participant_count))
    }
}

/// Balance group count against group size: `clamp(n / 4, 4, 6)`
pub fn dynamic_group_size(participant_count: usize) -> usize {
    (participant_count / 4).clamp(MIN_DYNAMIC_GROUP_SIZE, MAX_DYNAMIC_GROUP_SIZE)
}
