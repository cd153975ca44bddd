use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;
use uuid::Uuid;

use shared_models::scheduling::{Booking, BookingStatus, ConsultationRecord, Profile, Slot};

pub mod locks;
pub mod memory;
pub mod postgrest;

pub use locks::SlotLocks;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a slot already exists for this doctor, date and time")]
    DuplicateSlot,

    #[error("slot not found")]
    SlotNotFound,

    #[error("booking not found")]
    BookingNotFound,

    #[error("every seat on this slot is taken")]
    CapacityExceeded,

    #[error("patient already has an active booking on this slot")]
    DuplicateBooking,

    #[error("booking is {actual}, expected {expected}")]
    StatusMismatch {
        expected: BookingStatus,
        actual: BookingStatus,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// The relational-store collaborator for slots, bookings and consultation
/// records. Implementations must make `insert_slot` enforce the
/// (doctor, date, time) unique constraint atomically, make `insert_booking`
/// re-validate capacity and the duplicate rule at commit time, and make
/// `transition_booking`/`complete_booking` compare-and-set on the current
/// status. [`SlotLocks`] serializes the multi-step booking flow within one
/// process; the commit-time checks are what hold across processes.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError>;
    async fn get_slot(&self, slot_id: Uuid) -> Result<Option<Slot>, StoreError>;
    async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Slot>, StoreError>;
    async fn delete_slot(&self, slot_id: Uuid) -> Result<(), StoreError>;
    /// Slots on or after `from_date`, ascending by (date, time); all doctors
    /// when `doctor_id` is `None`.
    async fn list_slots_from(
        &self,
        doctor_id: Option<Uuid>,
        from_date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError>;

    /// Insert with commit-time re-validation of the capacity and
    /// duplicate-booking invariants, inside the same transaction as the
    /// insert. Fails with `CapacityExceeded` or `DuplicateBooking` when
    /// another writer got there first.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError>;
    /// Bookings currently occupying a seat (booked or completed). Always a
    /// live-row count, never a cached counter.
    async fn count_active_bookings(&self, slot_id: Uuid) -> Result<i64, StoreError>;
    /// The patient's non-cancelled booking on the slot, if any.
    async fn find_active_booking(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<Booking>, StoreError>;
    /// Compare-and-set the booking status; fails with `StatusMismatch` when
    /// the current status is not `from`.
    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, StoreError>;
    /// Booked -> Completed plus consultation-record insert, as one atomic
    /// operation: both apply or neither does.
    async fn complete_booking(
        &self,
        booking_id: Uuid,
        record: &ConsultationRecord,
    ) -> Result<Booking, StoreError>;
    /// Descending by `booked_at` (newest first).
    async fn list_bookings_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, StoreError>;
    /// Ascending by `booked_at` (arrival order).
    async fn list_bookings_for_slot(&self, slot_id: Uuid) -> Result<Vec<Booking>, StoreError>;

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;
    /// Descending by `created_at` (newest first).
    async fn list_consultation_records(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, StoreError>;
}
