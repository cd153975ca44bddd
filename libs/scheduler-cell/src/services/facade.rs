// libs/scheduler-cell/src/services/facade.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::debug;
use uuid::Uuid;

use booking_cell::models::{BookingError, ConsultationPayload, QueueEntry};
use booking_cell::services::ledger::BookingLedgerService;
use booking_cell::services::queue::QueueProjectionService;
use shared_models::scheduling::{Booking, BookingStatus, ConsultationRecord, Slot};
use shared_store::SchedulingStore;
use slot_cell::models::{CreateSlotRequest, SlotError};
use slot_cell::services::registry::SlotRegistryService;

use crate::models::{BookingView, SlotView};
use crate::state::AppState;

/// The single entry point the UI collaborator talks to. Orchestrates the
/// registry, ledger and queue projector, and aggregates display data for
/// list views. Identity is an explicit parameter on every call; failures
/// from the underlying services pass through unchanged.
pub struct SchedulerService {
    registry: SlotRegistryService,
    ledger: BookingLedgerService,
    queue: QueueProjectionService,
    store: Arc<dyn SchedulingStore>,
}

impl SchedulerService {
    pub fn new(state: &AppState) -> Self {
        Self {
            registry: SlotRegistryService::new(
                Arc::clone(&state.store),
                Arc::clone(&state.locks),
            ),
            ledger: BookingLedgerService::new(Arc::clone(&state.store), Arc::clone(&state.locks)),
            queue: QueueProjectionService::new(Arc::clone(&state.store)),
            store: Arc::clone(&state.store),
        }
    }

    // ------------------------------------------------------------------
    // Doctor operations
    // ------------------------------------------------------------------

    pub async fn create_slot(
        &self,
        doctor_id: Uuid,
        request: CreateSlotRequest,
    ) -> Result<Slot, SlotError> {
        self.registry.create_slot(doctor_id, request).await
    }

    pub async fn delete_slot(&self, slot_id: Uuid, doctor_id: Uuid) -> Result<(), SlotError> {
        self.registry.delete_slot(slot_id, doctor_id).await
    }

    pub async fn list_doctor_slots(&self, doctor_id: Uuid) -> Result<Vec<Slot>, SlotError> {
        let today = Utc::now().date_naive();
        self.registry.list_future_slots(doctor_id, today).await
    }

    pub async fn complete_booking(
        &self,
        booking_id: Uuid,
        doctor_id: Uuid,
        payload: ConsultationPayload,
    ) -> Result<(Booking, ConsultationRecord), BookingError> {
        self.ledger
            .complete_booking(booking_id, doctor_id, payload)
            .await
    }

    pub async fn queue_for_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<QueueEntry>, BookingError> {
        self.queue.project_queue(doctor_id, date, time).await
    }

    pub async fn patient_history(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, BookingError> {
        self.ledger.patient_history(patient_id).await
    }

    // ------------------------------------------------------------------
    // Patient operations
    // ------------------------------------------------------------------

    pub async fn book_slot(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.ledger.create_booking(slot_id, patient_id).await
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Booking, BookingError> {
        self.ledger.cancel_booking(booking_id, patient_id).await
    }

    /// Future slots the calling patient can still book: drops slots that are
    /// full and slots the patient already actively books, and attaches the
    /// publishing doctor's display info.
    pub async fn available_slots(
        &self,
        patient_id: Uuid,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SlotView>, BookingError> {
        let today = Utc::now().date_naive();
        let slots = self.store.list_slots_from(None, today).await?;

        let mut views = Vec::new();
        for slot in slots {
            if let Some(wanted) = date {
                if slot.date != wanted {
                    continue;
                }
            }

            let active = self.store.count_active_bookings(slot.id).await?;
            if active >= slot.capacity as i64 {
                continue;
            }
            if self
                .store
                .find_active_booking(slot.id, patient_id)
                .await?
                .is_some()
            {
                continue;
            }

            let doctor = self.store.get_profile(slot.doctor_id).await?;
            let seats_left = slot.capacity as i64 - active;
            views.push(SlotView::new(&slot, seats_left, doctor));
        }

        debug!(
            "{} slots available for patient {}",
            views.len(),
            patient_id
        );
        Ok(views)
    }

    /// The patient's bookings, newest first, with slot and doctor details.
    pub async fn my_bookings(
        &self,
        patient_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<BookingView>, BookingError> {
        let bookings = self.ledger.list_for_patient(patient_id, status).await?;

        let mut views = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            let slot = self.store.get_slot(booking.slot_id).await?;
            let doctor = self.store.get_profile(booking.doctor_id).await?;
            views.push(BookingView::new(booking, slot.as_ref(), doctor));
        }
        Ok(views)
    }
}
