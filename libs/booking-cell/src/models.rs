// libs/booking-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::scheduling::{Booking, BookingStatus, Prescription, Profile};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// The clinical note a doctor attaches when completing a consultation.
/// Opaque to the scheduling core; stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prescriptions: Vec<Prescription>,
}

// ==============================================================================
// QUEUE PROJECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub booking_id: Uuid,
    pub patient: PatientSnapshot,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn from_booking(booking: &Booking, profile: Option<Profile>) -> Self {
        Self {
            booking_id: booking.id,
            patient: PatientSnapshot::from_profile(booking.patient_id, profile),
            status: booking.status,
            booked_at: booking.booked_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub patient_id: Uuid,
    pub full_name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub medical_history: Option<String>,
}

impl PatientSnapshot {
    pub fn from_profile(patient_id: Uuid, profile: Option<Profile>) -> Self {
        match profile {
            Some(p) => Self {
                patient_id,
                full_name: p.full_name,
                age: p.age,
                gender: p.gender,
                phone: p.phone,
                medical_history: p.medical_history,
            },
            None => Self {
                patient_id,
                full_name: "Unknown".to_string(),
                age: None,
                gender: None,
                phone: None,
                medical_history: None,
            },
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Slot not found")]
    SlotNotFound,

    #[error("Booking not found")]
    NotFound,

    #[error("Booking belongs to a different user")]
    Forbidden,

    #[error("Slot is fully booked")]
    SlotFull,

    #[error("Patient already has an active booking on this slot")]
    AlreadyBooked,

    #[error("Booking is {0}, no transition possible")]
    InvalidState(BookingStatus),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<shared_store::StoreError> for BookingError {
    fn from(e: shared_store::StoreError) -> Self {
        use shared_store::StoreError;
        match e {
            StoreError::SlotNotFound => BookingError::SlotNotFound,
            StoreError::BookingNotFound => BookingError::NotFound,
            StoreError::CapacityExceeded => BookingError::SlotFull,
            StoreError::DuplicateBooking => BookingError::AlreadyBooked,
            StoreError::StatusMismatch { actual, .. } => BookingError::InvalidState(actual),
            StoreError::Unavailable(msg) => BookingError::Unavailable(msg),
            other => BookingError::Storage(other.to_string()),
        }
    }
}
