// libs/scheduler-cell/src/handlers.rs
use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::NaiveTime;
use serde_json::{json, Value};
use uuid::Uuid;

use booking_cell::models::{BookingError, ConsultationPayload};
use shared_models::auth::User;
use shared_models::error::AppError;
use slot_cell::models::{CreateSlotRequest, SlotError};

use crate::models::{AvailableSlotsQuery, BookSlotRequest, MyBookingsQuery, QueueQuery};
use crate::services::facade::SchedulerService;
use crate::state::AppState;

// ==============================================================================
// HELPERS
// ==============================================================================

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    user.id
        .parse()
        .map_err(|_| AppError::Auth("Invalid user id in token".to_string()))
}

fn require_doctor(user: &User) -> Result<Uuid, AppError> {
    if !user.is_doctor() {
        return Err(AppError::Forbidden(
            "Only doctors can perform this operation".to_string(),
        ));
    }
    caller_id(user)
}

fn require_patient(user: &User) -> Result<Uuid, AppError> {
    if !user.is_patient() {
        return Err(AppError::Forbidden(
            "Only patients can perform this operation".to_string(),
        ));
    }
    caller_id(user)
}

fn parse_time(raw: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| AppError::BadRequest(format!("Invalid time: {}", raw)))
}

fn slot_error(e: SlotError) -> AppError {
    match e {
        SlotError::NotFound => AppError::NotFound("Slot not found".to_string()),
        SlotError::Forbidden => {
            AppError::Forbidden("Slot belongs to a different doctor".to_string())
        }
        SlotError::Conflict => {
            AppError::Conflict("A slot already exists at this date and time".to_string())
        }
        SlotError::PastDate => AppError::BadRequest("Slot date is in the past".to_string()),
        SlotError::InvalidCapacity => {
            AppError::BadRequest("Slot capacity must be at least 1".to_string())
        }
        SlotError::ActiveBookings => {
            AppError::Conflict("Slot still has active bookings".to_string())
        }
        SlotError::Unavailable(msg) => AppError::Unavailable(msg),
        SlotError::Storage(msg) => AppError::Database(msg),
    }
}

fn booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        BookingError::NotFound => AppError::NotFound("Booking not found".to_string()),
        BookingError::Forbidden => {
            AppError::Forbidden("Booking belongs to a different user".to_string())
        }
        BookingError::SlotFull => AppError::SlotFull("Slot is fully booked".to_string()),
        BookingError::AlreadyBooked => {
            AppError::AlreadyBooked("You already have an active booking on this slot".to_string())
        }
        BookingError::InvalidState(status) => {
            AppError::InvalidState(format!("Booking is already {}", status))
        }
        BookingError::Unavailable(msg) => AppError::Unavailable(msg),
        BookingError::Storage(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// SLOT HANDLERS (doctor)
// ==============================================================================

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let scheduler = SchedulerService::new(&state);
    let slot = scheduler
        .create_slot(doctor_id, request)
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
        "message": "Slot created"
    })))
}

#[axum::debug_handler]
pub async fn list_my_slots(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let scheduler = SchedulerService::new(&state);
    let slots = scheduler
        .list_doctor_slots(doctor_id)
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "success": true,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<AppState>,
    Path(slot_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let scheduler = SchedulerService::new(&state);
    scheduler
        .delete_slot(slot_id, doctor_id)
        .await
        .map_err(slot_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Slot deleted"
    })))
}

// ==============================================================================
// BOOKING HANDLERS (patient)
// ==============================================================================

#[axum::debug_handler]
pub async fn available_slots(
    State(state): State<AppState>,
    Query(query): Query<AvailableSlotsQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;

    let scheduler = SchedulerService::new(&state);
    let slots = scheduler
        .available_slots(patient_id, query.date)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "slots": slots
    })))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;

    let scheduler = SchedulerService::new(&state);
    let booking = scheduler
        .book_slot(request.slot_id, patient_id)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;

    let scheduler = SchedulerService::new(&state);
    let booking = scheduler
        .cancel_booking(booking_id, patient_id)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn my_bookings(
    State(state): State<AppState>,
    Query(query): Query<MyBookingsQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = require_patient(&user)?;

    let scheduler = SchedulerService::new(&state);
    let bookings = scheduler
        .my_bookings(patient_id, query.status)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "bookings": bookings
    })))
}

// ==============================================================================
// CONSULTATION HANDLERS (doctor)
// ==============================================================================

#[axum::debug_handler]
pub async fn complete_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(payload): Json<ConsultationPayload>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;

    let scheduler = SchedulerService::new(&state);
    let (booking, record) = scheduler
        .complete_booking(booking_id, doctor_id, payload)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "booking": booking,
        "record": record,
        "message": "Consultation saved"
    })))
}

#[axum::debug_handler]
pub async fn queue_for_slot(
    State(state): State<AppState>,
    Query(query): Query<QueueQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = require_doctor(&user)?;
    let time = parse_time(&query.time)?;

    let scheduler = SchedulerService::new(&state);
    let queue = scheduler
        .queue_for_slot(doctor_id, query.date, time)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "queue": queue
    })))
}

#[axum::debug_handler]
pub async fn patient_history(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // Doctors may read any patient's history; a patient only their own.
    let caller = caller_id(&user)?;
    if !user.is_doctor() && caller != patient_id {
        return Err(AppError::Forbidden(
            "You can only view your own consultation history".to_string(),
        ));
    }

    let scheduler = SchedulerService::new(&state);
    let records = scheduler
        .patient_history(patient_id)
        .await
        .map_err(booking_error)?;

    Ok(Json(json!({
        "success": true,
        "records": records
    })))
}
