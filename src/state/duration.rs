//! Duration selection: maps a picker slot to a run length

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Highest selectable slot (slot 11 is 60 minutes)
pub const MAX_DURATION_INDEX: u8 = 11;

/// Minutes added per slot
pub const MINUTES_PER_STEP: u64 = 5;

/// A validated duration slot in `0..=11`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct DurationIndex(u8);

impl DurationIndex {
    /// Validate a raw slot index
    pub fn new(index: usize) -> Result<Self, AppError> {
        if index > MAX_DURATION_INDEX as usize {
            return Err(AppError::InvalidDurationIndex(index));
        }
        Ok(Self(index as u8))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    /// `(index + 1) * 5`
    pub fn minutes(self) -> u64 {
        (self.0 as u64 + 1) * MINUTES_PER_STEP
    }

    pub fn seconds(self) -> u64 {
        self.minutes() * 60
    }

    /// Every selectable slot, shortest first
    pub fn all() -> impl Iterator<Item = DurationIndex> {
        (0..=MAX_DURATION_INDEX).map(DurationIndex)
    }
}

impl TryFrom<usize> for DurationIndex {
    type Error = AppError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl From<DurationIndex> for usize {
    fn from(index: DurationIndex) -> Self {
        index.get()
    }
}
