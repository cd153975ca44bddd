// libs/booking-cell/src/services/ledger.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::scheduling::{Booking, BookingStatus, ConsultationRecord};
use shared_store::{SchedulingStore, SlotLocks};

use crate::models::{BookingError, ConsultationPayload};

/// The sole arbiter of the capacity and duplicate-booking invariants.
/// Every booking mutation passes through here.
pub struct BookingLedgerService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<SlotLocks>,
}

impl BookingLedgerService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<SlotLocks>) -> Self {
        Self { store, locks }
    }

    /// Reserve a seat on a slot. The whole check-then-insert runs under the
    /// slot's lock, so two callers racing for the last seat serialize and
    /// exactly one of them wins. The store's insert re-validates both
    /// invariants at commit, which covers writers outside this process.
    pub async fn create_booking(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Booking, BookingError> {
        let _guard = self.locks.acquire(slot_id).await;

        let slot = self
            .store
            .get_slot(slot_id)
            .await?
            .ok_or(BookingError::SlotNotFound)?;

        // Capacity is derived from live rows inside the locked section,
        // never from a stored counter that could drift.
        let active = self.store.count_active_bookings(slot_id).await?;
        if active >= slot.capacity as i64 {
            debug!(
                "Slot {} full ({}/{}), rejecting patient {}",
                slot_id, active, slot.capacity, patient_id
            );
            return Err(BookingError::SlotFull);
        }

        if self
            .store
            .find_active_booking(slot_id, patient_id)
            .await?
            .is_some()
        {
            return Err(BookingError::AlreadyBooked);
        }

        let booking = Booking::new(&slot, patient_id);
        self.store.insert_booking(&booking).await?;

        info!(
            "Booking {} created: patient {} on slot {} ({}/{})",
            booking.id,
            patient_id,
            slot_id,
            active + 1,
            slot.capacity
        );
        Ok(booking)
    }

    /// booked -> cancelled. Frees one seat, visible to the next
    /// `create_booking` as soon as the compare-and-set commits.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if booking.patient_id != patient_id {
            warn!(
                "Patient {} tried to cancel booking {} they do not own",
                patient_id, booking_id
            );
            return Err(BookingError::Forbidden);
        }

        ensure_transition(booking.status, BookingStatus::Cancelled)?;

        // The store-level CAS is what actually guards against a concurrent
        // transition; a losing caller gets InvalidState here.
        let cancelled = self
            .store
            .transition_booking(booking_id, BookingStatus::Booked, BookingStatus::Cancelled)
            .await?;

        info!("Booking {} cancelled by patient {}", booking_id, patient_id);
        Ok(cancelled)
    }

    /// booked -> completed, persisting the consultation record in the same
    /// atomic store operation: both apply or neither does.
    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        doctor_id: Uuid,
        payload: ConsultationPayload,
    ) -> Result<(Booking, ConsultationRecord), BookingError> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::NotFound)?;

        if booking.doctor_id != doctor_id {
            return Err(BookingError::Forbidden);
        }

        ensure_transition(booking.status, BookingStatus::Completed)?;

        let record = ConsultationRecord {
            id: Uuid::new_v4(),
            booking_id,
            patient_id: booking.patient_id,
            doctor_id,
            title: payload.title,
            description: payload.description,
            prescriptions: payload.prescriptions,
            created_at: Utc::now(),
        };

        let completed = self.store.complete_booking(booking_id, &record).await?;

        info!(
            "Booking {} completed by doctor {}, record {}",
            booking_id, doctor_id, record.id
        );
        Ok((completed, record))
    }

    /// The patient's bookings, newest first.
    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, BookingError> {
        Ok(self
            .store
            .list_bookings_for_patient(patient_id, status)
            .await?)
    }

    /// All bookings on a slot in arrival order, including cancelled ones.
    pub async fn list_for_slot(&self, slot_id: Uuid) -> Result<Vec<Booking>, BookingError> {
        Ok(self.store.list_bookings_for_slot(slot_id).await?)
    }

    /// Consultation records for a patient, newest first.
    pub async fn patient_history(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, BookingError> {
        Ok(self.store.list_consultation_records(patient_id).await?)
    }
}

fn ensure_transition(from: BookingStatus, to: BookingStatus) -> Result<(), BookingError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(BookingError::InvalidState(from))
    }
}
