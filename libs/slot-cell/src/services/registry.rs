// libs/slot-cell/src/services/registry.rs
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_models::scheduling::{Slot, DEFAULT_SLOT_CAPACITY};
use shared_store::{SchedulingStore, SlotLocks};

use crate::models::{CreateSlotRequest, SlotError};

/// Owns slot creation, uniqueness and deletion. Capacity is fixed at
/// creation time; bookings against a slot are the ledger's concern.
pub struct SlotRegistryService {
    store: Arc<dyn SchedulingStore>,
    locks: Arc<SlotLocks>,
}

impl SlotRegistryService {
    pub fn new(store: Arc<dyn SchedulingStore>, locks: Arc<SlotLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn create_slot(
        &self,
        doctor_id: Uuid,
        request: CreateSlotRequest,
    ) -> Result<Slot, SlotError> {
        let capacity = request.capacity.unwrap_or(DEFAULT_SLOT_CAPACITY);
        if capacity < 1 {
            return Err(SlotError::InvalidCapacity);
        }

        let today = Utc::now().date_naive();
        if request.date < today {
            return Err(SlotError::PastDate);
        }

        // Slots are minute-precision; drop any sub-minute component.
        let time = request
            .time
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(request.time);

        // Friendly pre-check; the store's unique insert is the backstop
        // against a concurrent creation of the same instant.
        if self
            .find_slot(doctor_id, request.date, time)
            .await?
            .is_some()
        {
            return Err(SlotError::Conflict);
        }

        let slot = Slot::new(doctor_id, request.date, time, capacity);
        self.store.insert_slot(&slot).await?;

        info!(
            "Slot {} created for doctor {} at {} {}",
            slot.id, doctor_id, slot.date, slot.time
        );
        Ok(slot)
    }

    /// Deletion is conditional: it fails while any booking still occupies a
    /// seat, rather than orphaning those bookings. The slot lock serializes
    /// the check against a booking landing concurrently.
    pub async fn delete_slot(&self, slot_id: Uuid, doctor_id: Uuid) -> Result<(), SlotError> {
        let slot = self
            .store
            .get_slot(slot_id)
            .await?
            .ok_or(SlotError::NotFound)?;

        if slot.doctor_id != doctor_id {
            return Err(SlotError::Forbidden);
        }

        let _guard = self.locks.acquire(slot_id).await;

        if self.store.count_active_bookings(slot_id).await? > 0 {
            debug!("Refusing to delete slot {} with active bookings", slot_id);
            return Err(SlotError::ActiveBookings);
        }

        self.store.delete_slot(slot_id).await?;
        self.locks.release(slot_id).await;

        info!("Slot {} deleted by doctor {}", slot_id, doctor_id);
        Ok(())
    }

    /// The doctor's slots on or after `from_date`, ascending by (date, time).
    /// Re-queried on every call; no cursor state is kept.
    pub async fn list_future_slots(
        &self,
        doctor_id: Uuid,
        from_date: NaiveDate,
    ) -> Result<Vec<Slot>, SlotError> {
        Ok(self
            .store
            .list_slots_from(Some(doctor_id), from_date)
            .await?)
    }

    pub async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Slot>, SlotError> {
        Ok(self.store.find_slot(doctor_id, date, time).await?)
    }
}
