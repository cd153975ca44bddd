// libs/slot-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Defaults to [`shared_models::scheduling::DEFAULT_SLOT_CAPACITY`].
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SlotError {
    #[error("Slot not found")]
    NotFound,

    #[error("Slot belongs to a different doctor")]
    Forbidden,

    #[error("A slot already exists at this date and time")]
    Conflict,

    #[error("Slot date is in the past")]
    PastDate,

    #[error("Slot capacity must be at least 1")]
    InvalidCapacity,

    #[error("Slot still has active bookings")]
    ActiveBookings,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<shared_store::StoreError> for SlotError {
    fn from(e: shared_store::StoreError) -> Self {
        use shared_store::StoreError;
        match e {
            StoreError::DuplicateSlot => SlotError::Conflict,
            StoreError::SlotNotFound => SlotError::NotFound,
            StoreError::Unavailable(msg) => SlotError::Unavailable(msg),
            other => SlotError::Storage(other.to_string()),
        }
    }
}
