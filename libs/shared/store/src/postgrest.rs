use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::scheduling::{Booking, BookingStatus, ConsultationRecord, Profile, Slot};

use crate::{SchedulingStore, StoreError};

/// PostgREST-backed store. Slot uniqueness rides on the table's unique index
/// on (doctor_id, date, time); status changes are conditional PATCHes
/// filtered on the current status; booking creation and completion go
/// through the `book_booking` and `complete_booking` RPCs so the invariant
/// checks commit in the same transaction as the write. Another API instance
/// racing for the last seat loses inside the database, not in this process.
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.postgrest_url.clone(),
            api_key: config.postgrest_api_key.clone(),
        }
    }

    fn headers(&self, prefer: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.api_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(prefer) = prefer {
            if let Ok(value) = HeaderValue::from_str(prefer) {
                headers.insert("Prefer", value);
            }
        }

        headers
    }

    async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        prefer: Option<&str>,
    ) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.headers(prefer));

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("PostgREST error ({}): {}", status, error_text);

            return Err(match status {
                StatusCode::CONFLICT => StoreError::DuplicateSlot,
                s if s.is_server_error() => StoreError::Unavailable(error_text),
                _ => StoreError::Backend(format!("{}: {}", status, error_text)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to parse response: {}", e)))
    }

    /// GET with a one-shot retry on transport failure. Only reads go through
    /// here: they are idempotent, writes are never auto-retried.
    async fn get_rows<T>(&self, path: &str) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        match self.request(Method::GET, path, None, None).await {
            Err(StoreError::Unavailable(msg)) => {
                warn!("read failed ({}), retrying once", msg);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                self.request(Method::GET, path, None, None).await
            }
            result => result,
        }
    }

    async fn get_row<T>(&self, path: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let mut rows: Vec<T> = self.get_rows(path).await?;
        if rows.is_empty() {
            Ok(None)
        } else {
            Ok(Some(rows.swap_remove(0)))
        }
    }
}

fn encode_time(time: NaiveTime) -> String {
    urlencoding::encode(&time.format("%H:%M:%S").to_string()).into_owned()
}

#[async_trait]
impl SchedulingStore for PostgrestStore {
    async fn insert_slot(&self, slot: &Slot) -> Result<(), StoreError> {
        let _: Value = self
            .request(
                Method::POST,
                "/rest/v1/slots",
                Some(json!(slot)),
                Some("return=representation"),
            )
            .await?;
        Ok(())
    }

    async fn get_slot(&self, slot_id: Uuid) -> Result<Option<Slot>, StoreError> {
        self.get_row(&format!("/rest/v1/slots?id=eq.{}&limit=1", slot_id))
            .await
    }

    async fn find_slot(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Slot>, StoreError> {
        self.get_row(&format!(
            "/rest/v1/slots?doctor_id=eq.{}&date=eq.{}&time=eq.{}&limit=1",
            doctor_id,
            date,
            encode_time(time)
        ))
        .await
    }

    async fn delete_slot(&self, slot_id: Uuid) -> Result<(), StoreError> {
        let deleted: Vec<Value> = self
            .request(
                Method::DELETE,
                &format!("/rest/v1/slots?id=eq.{}", slot_id),
                None,
                Some("return=representation"),
            )
            .await?;

        if deleted.is_empty() {
            return Err(StoreError::SlotNotFound);
        }
        Ok(())
    }

    async fn list_slots_from(
        &self,
        doctor_id: Option<Uuid>,
        from_date: NaiveDate,
    ) -> Result<Vec<Slot>, StoreError> {
        let mut path = format!(
            "/rest/v1/slots?date=gte.{}&order=date.asc,time.asc",
            from_date
        );
        if let Some(doctor_id) = doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", doctor_id));
        }
        self.get_rows(&path).await
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        // The function re-counts active bookings and re-checks the duplicate
        // rule inside the inserting transaction, raising `slot_full` or
        // `already_booked` when a concurrent writer won the seat.
        let result: Result<Value, StoreError> = self
            .request(
                Method::POST,
                "/rest/v1/rpc/book_booking",
                Some(json!({ "p_booking": booking })),
                None,
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(StoreError::Backend(msg)) if msg.contains("slot_full") => {
                Err(StoreError::CapacityExceeded)
            }
            Err(StoreError::Backend(msg)) if msg.contains("already_booked") => {
                Err(StoreError::DuplicateBooking)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, StoreError> {
        self.get_row(&format!("/rest/v1/bookings?id=eq.{}&limit=1", booking_id))
            .await
    }

    async fn count_active_bookings(&self, slot_id: Uuid) -> Result<i64, StoreError> {
        let rows: Vec<Value> = self
            .get_rows(&format!(
                "/rest/v1/bookings?slot_id=eq.{}&status=in.(booked,completed)&select=id",
                slot_id
            ))
            .await?;
        Ok(rows.len() as i64)
    }

    async fn find_active_booking(
        &self,
        slot_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<Booking>, StoreError> {
        self.get_row(&format!(
            "/rest/v1/bookings?slot_id=eq.{}&patient_id=eq.{}&status=neq.cancelled&limit=1",
            slot_id, patient_id
        ))
        .await
    }

    async fn transition_booking(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Booking, StoreError> {
        // Filtering on the current status makes the PATCH a compare-and-set:
        // a concurrent transition leaves nothing for this one to update.
        let updated: Vec<Booking> = self
            .request(
                Method::PATCH,
                &format!("/rest/v1/bookings?id=eq.{}&status=eq.{}", booking_id, from),
                Some(json!({ "status": to.to_string() })),
                Some("return=representation"),
            )
            .await?;

        if let Some(booking) = updated.into_iter().next() {
            return Ok(booking);
        }

        match self.get_booking(booking_id).await? {
            Some(booking) => Err(StoreError::StatusMismatch {
                expected: from,
                actual: booking.status,
            }),
            None => Err(StoreError::BookingNotFound),
        }
    }

    async fn complete_booking(
        &self,
        booking_id: Uuid,
        record: &ConsultationRecord,
    ) -> Result<Booking, StoreError> {
        let result: Result<Booking, StoreError> = self
            .request(
                Method::POST,
                "/rest/v1/rpc/complete_booking",
                Some(json!({
                    "p_booking_id": booking_id,
                    "p_record": record,
                })),
                None,
            )
            .await;

        match result {
            Ok(booking) => Ok(booking),
            // The function raises when the booking is missing or not in the
            // booked status; re-read the row to report which it was.
            Err(StoreError::Backend(_)) => match self.get_booking(booking_id).await? {
                Some(booking) => Err(StoreError::StatusMismatch {
                    expected: BookingStatus::Booked,
                    actual: booking.status,
                }),
                None => Err(StoreError::BookingNotFound),
            },
            Err(e) => Err(e),
        }
    }

    async fn list_bookings_for_patient(
        &self,
        patient_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut path = format!(
            "/rest/v1/bookings?patient_id=eq.{}&order=booked_at.desc",
            patient_id
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }
        self.get_rows(&path).await
    }

    async fn list_bookings_for_slot(&self, slot_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        self.get_rows(&format!(
            "/rest/v1/bookings?slot_id=eq.{}&order=booked_at.asc",
            slot_id
        ))
        .await
    }

    async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        self.get_row(&format!("/rest/v1/profiles?user_id=eq.{}&limit=1", user_id))
            .await
    }

    async fn list_consultation_records(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, StoreError> {
        self.get_rows(&format!(
            "/rest/v1/consultation_records?patient_id=eq.{}&order=created_at.desc",
            patient_id
        ))
        .await
    }
}
