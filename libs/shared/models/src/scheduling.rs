use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Capacity assigned to a slot when the creating doctor leaves it unset.
pub const DEFAULT_SLOT_CAPACITY: i32 = 1;

// ==============================================================================
// SLOT & BOOKING ROWS
// ==============================================================================

/// A doctor-published, capacity-bounded consultation opportunity.
/// (doctor_id, date, time) is unique; capacity is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub capacity: i32,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn new(doctor_id: Uuid, date: NaiveDate, time: NaiveTime, capacity: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            doctor_id,
            date,
            time,
            capacity,
            created_at: Utc::now(),
        }
    }
}

/// A patient's reservation against a slot. Rows are never deleted;
/// cancellation is a status change so the audit trail survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(slot: &Slot, patient_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot_id: slot.id,
            patient_id,
            doctor_id: slot.doctor_id,
            status: BookingStatus::Booked,
            booked_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// The full transition table. Booked is the only non-terminal state.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Booked, BookingStatus::Completed)
                | (BookingStatus::Booked, BookingStatus::Cancelled)
        )
    }

    /// Whether the booking still occupies a seat in its slot.
    /// Cancelled bookings release their seat; completed ones keep it,
    /// the consultation consumed it.
    pub fn occupies_seat(&self) -> bool {
        matches!(self, BookingStatus::Booked | BookingStatus::Completed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Booked => write!(f, "booked"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// CONSULTATION RECORDS
// ==============================================================================

/// Clinical note attached when a doctor completes a consultation.
/// Opaque to the scheduling core: stored and returned verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub title: String,
    pub description: String,
    pub prescriptions: Vec<Prescription>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

// ==============================================================================
// PROFILES
// ==============================================================================

/// Display data for a user, maintained outside this core.
/// Doctor rows carry speciality/institution; patient rows the biodata fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
}
