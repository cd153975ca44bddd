// libs/booking-cell/src/services/queue.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use shared_models::scheduling::BookingStatus;
use shared_store::SchedulingStore;

use crate::models::{BookingError, QueueEntry};

/// Derives the doctor-facing consultation queue for a slot. Recomputed from
/// the ledger on every call, so it always reflects the latest state.
pub struct QueueProjectionService {
    store: Arc<dyn SchedulingStore>,
}

impl QueueProjectionService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Ordering: everyone still waiting (booked) in arrival order first,
    /// then the already-seen (completed) entries. Cancelled bookings are not
    /// part of the queue.
    pub async fn project_queue(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<QueueEntry>, BookingError> {
        let slot = self
            .store
            .find_slot(doctor_id, date, time)
            .await?
            .ok_or(BookingError::SlotNotFound)?;

        let bookings = self.store.list_bookings_for_slot(slot.id).await?;

        let mut entries = Vec::with_capacity(bookings.len());
        for booking in bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled)
        {
            let profile = self.store.get_profile(booking.patient_id).await?;
            entries.push(QueueEntry::from_booking(booking, profile));
        }

        entries.sort_by_key(|e| (queue_rank(e.status), e.booked_at));

        debug!(
            "Projected queue for slot {}: {} entries",
            slot.id,
            entries.len()
        );
        Ok(entries)
    }
}

fn queue_rank(status: BookingStatus) -> u8 {
    match status {
        BookingStatus::Booked => 0,
        BookingStatus::Completed => 1,
        BookingStatus::Cancelled => 2,
    }
}
