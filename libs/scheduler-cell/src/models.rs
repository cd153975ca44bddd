// libs/scheduler-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::scheduling::{Booking, BookingStatus, Profile, Slot};

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookSlotRequest {
    pub slot_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AvailableSlotsQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct MyBookingsQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub date: NaiveDate,
    /// "HH:MM" or "HH:MM:SS".
    pub time: String,
}

// ==============================================================================
// VIEW MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DoctorSummary {
    pub doctor_id: Uuid,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution: Option<String>,
}

impl DoctorSummary {
    pub fn from_profile(doctor_id: Uuid, profile: Option<Profile>) -> Self {
        match profile {
            Some(p) => Self {
                doctor_id,
                full_name: p.full_name,
                speciality: p.speciality,
                institution: p.institution,
            },
            None => Self {
                doctor_id,
                full_name: "Unknown".to_string(),
                speciality: None,
                institution: None,
            },
        }
    }
}

/// A bookable slot as shown to patients: full slots and slots the caller
/// already holds a booking on are filtered out before this is built.
#[derive(Debug, Clone, Serialize)]
pub struct SlotView {
    pub id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub capacity: i32,
    pub available_seats: i64,
    pub doctor: DoctorSummary,
}

impl SlotView {
    pub fn new(slot: &Slot, available_seats: i64, doctor_profile: Option<Profile>) -> Self {
        Self {
            id: slot.id,
            date: slot.date,
            time: slot.time,
            capacity: slot.capacity,
            available_seats,
            doctor: DoctorSummary::from_profile(slot.doctor_id, doctor_profile),
        }
    }
}

/// A booking as shown to its patient. The slot fields are optional because
/// a cancelled booking can outlive its slot.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub status: BookingStatus,
    pub booked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    pub doctor: DoctorSummary,
}

impl BookingView {
    pub fn new(booking: &Booking, slot: Option<&Slot>, doctor_profile: Option<Profile>) -> Self {
        Self {
            id: booking.id,
            status: booking.status,
            booked_at: booking.booked_at,
            date: slot.map(|s| s.date),
            time: slot.map(|s| s.time),
            doctor: DoctorSummary::from_profile(booking.doctor_id, doctor_profile),
        }
    }
}
