//! Table and time-slot assignment.

use super::errors::{TournamentError, TournamentResult};
use super::models::{PendingMatch, ScheduledMatch};
use chrono::{DateTime, Duration, Utc};

/// Assigns the k-th match to table `k mod T` starting at `S + k * D`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAllocator {
    table_count: u32,
    slot_interval: Duration,
    start_time: DateTime<Utc>,
}

impl SlotAllocator {
    /// Create an allocator over a fixed table pool
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidConfig` - Zero tables or zero interval
    pub fn new(
        table_count: u32,
        slot_interval_mins: u32,
        start_time: DateTime<Utc>,
    ) -> TournamentResult<Self> {
        if table_count == 0 {
            return Err(TournamentError::InvalidConfig {
                field: "table_count",
                reason: "Must be greater than 0".to_string(),
            });
        }
        if slot_interval_mins == 0 {
            return Err(TournamentError::InvalidConfig {
                field: "slot_interval",
                reason: "Must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            table_count,
            slot_interval: Duration::minutes(i64::from(slot_interval_mins)),
            start_time,
        })
    }

    pub fn table_count(&self) -> u32 {
        self.table_count
    }

    /// Table and start time of slot `k`
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidConfig` - The start time falls outside the calendar
    pub fn slot(&self, k: u32) -> TournamentResult<(u32, DateTime<Utc>)> {
        let table_index = k % self.table_count;
        let start = i32::try_from(k)
            .ok()
            .and_then(|k| self.slot_interval.checked_mul(k))
            .and_then(|offset| self.start_time.checked_add_signed(offset))
            .ok_or_else(|| TournamentError::InvalidConfig {
                field: "slot_interval",
                reason: format!(
                    "Slot {k} at {} minutes per slot is out of range",
                    self.slot_interval.num_minutes()
                ),
            })?;
        Ok((table_index, start))
    }

    /// Assign slots to `matches` in emission order, beginning at `first_slot`.
    ///
    /// Later knockout rounds pass the number of slots already used so the
    /// sequence never restarts.
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidConfig` - A start time falls outside the calendar
    pub fn allocate<I>(&self, first_slot: u32, matches: I) -> TournamentResult<Vec<ScheduledMatch>>
    where
        I: IntoIterator<Item = PendingMatch>,
    {
        matches
            .into_iter()
            .zip(first_slot..)
            .map(|(pairing, slot_index)| {
                let (table_index, scheduled_start) = self.slot(slot_index)?;
                Ok(ScheduledMatch {
                    pairing,
                    slot_index,
                    table_index,
                    scheduled_start,
                })
            })
            .collect()
    }
}
