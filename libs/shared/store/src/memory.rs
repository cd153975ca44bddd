use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared_models::scheduling::{Booking, BookingStatus, ConsultationRecord, Profile, Slot};

use crate::{SchedulingStore, StoreError};

/// In-memory store. Every trait method runs under a single writer (or
/// reader) lock, so unique inserts and status compare-and-sets are atomic
/// exactly as the trait contract requires. Used when no PostgREST backend
/// is configured, and as the primary store in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    slots: HashMap<Uuid, Slot>,
    bookings: HashMap<Uuid, Booking>,
    records: Vec<ConsultationRecord>,
    profiles: HashMap<Uuid, Profile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile row. Profiles are maintained outside the scheduling
    /// core, so this is not part of [`SchedulingStore`].
    pub async fn put_profile(&self, profile: Profile) {
        let mut tables = self.inner.write().await;
        tables.profiles.insert(profile.user_id, profile);
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        let duplicate = tables.slots.values().any(|s| {
            s.doctor_id == slot.doctor_id && s.date == slot.date && s.time == slot.time
        });
        if duplicate {
            return Err(StoreError::DuplicateSlot);
        }
        tables.slots.insert(slot.id, slot.clone());
        Ok(())
    }

    async fn get_slot(&self, slot_id: Uuid) -> Result<Option<Slot>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.slots.get(&slot_id).cloned())
    }

    async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Slot>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .slots
            .values()
            .find(|s| s.doctor_id == doctor_id && s.date == date && s.time == time)
            .cloned())
    }

    async fn delete_slot(&self, slot_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        tables
            .slots
            .remove(&slot_id)
            .map(|_| ())
            .ok_or(StoreError::SlotNotFound)
    }

    async fn list_slots_from(
        &self,
        doctor_id: Option<Uuid>,
        from_date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let tables = self.inner.read().await;
        let mut slots: Vec<Slot> = tables
            .slots
            .values()
            .filter(|s| s.date >= from_date)
            .filter(|s| doctor_id.map_or(true, |d| s.doctor_id == d))
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.date, s.time));
        Ok(slots)
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;

        let capacity = tables
            .slots
            .get(&booking.slot_id)
            .ok_or(StoreError::SlotNotFound)?
            .capacity;
        let active = tables
            .bookings
            .values()
            .filter(|b| b.slot_id == booking.slot_id && b.status.occupies_seat())
            .count() as i32;
        if booking.status.occupies_seat() && active >= capacity {
            return Err(StoreError::CapacityExceeded);
        }
        let duplicate = tables.bookings.values().any(|b| {
            b.slot_id == booking.slot_id
                && b.patient_id == booking.patient_id
                && b.status != BookingStatus::Cancelled
        });
        if booking.status != BookingStatus::Cancelled && duplicate {
            return Err(StoreError::DuplicateBooking);
        }

        tables.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.bookings.get(&booking_id).cloned())
    }

    async fn count_active_bookings(&self, slot_id: Uuid) -> Result<i64, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.slot_id == slot_id && b.status.occupies_seat())
            .count() as i64)
    }

    async fn find_active_booking(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| {
                b.slot_id == slot_id
                    && b.patient_id == patient_id
                    && b.status != BookingStatus::Cancelled
            })
            .cloned())
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, StoreError> {
        let mut tables = self.inner.write().await;
        let booking = tables
            .bookings
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound)?;
        if booking.status != from {
            return Err(StoreError::StatusMismatch {
                expected: from,
                actual: booking.status,
            });
        }
        booking.status = to;
        Ok(booking.clone())
    }

    async fn complete_booking(
        &self,
        booking_id: Uuid,
        record: &ConsultationRecord,
    ) -> Result<Booking, StoreError> {
        let mut tables = self.inner.write().await;
        let booking = tables
            .bookings
            .get_mut(&booking_id)
            .ok_or(StoreError::BookingNotFound)?;
        if booking.status != BookingStatus::Booked {
            return Err(StoreError::StatusMismatch {
                expected: BookingStatus::Booked,
                actual: booking.status,
            });
        }
        booking.status = BookingStatus::Completed;
        let booking = booking.clone();
        tables.records.push(record.clone());
        Ok(booking)
    }

    async fn list_bookings_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, StoreError> {
        let tables = self.inner.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.patient_id == patient_id)
            .filter(|b| status.map_or(true, |s| b.status == s))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.booked_at.cmp(&a.booked_at));
        Ok(bookings)
    }

    async fn list_bookings_for_slot(&self, slot_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let tables = self.inner.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.slot_id == slot_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.booked_at);
        Ok(bookings)
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.profiles.get(&user_id).cloned())
    }

    async fn list_consultation_records(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, StoreError> {
        let tables = self.inner.read().await;
        let mut records: Vec<ConsultationRecord> = tables
            .records
            .iter()
            .filter(|r| r.patient_id == patient_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
