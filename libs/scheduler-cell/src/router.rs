// libs/scheduler-cell/src/router.rs
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::AppState;

pub fn scheduler_routes(state: AppState) -> Router {
    // Every scheduling operation requires an authenticated caller.
    let protected_routes = Router::new()
        // Slot management (doctor)
        .route("/slots", post(handlers::create_slot).get(handlers::list_my_slots))
        .route("/slots/available", get(handlers::available_slots))
        .route("/slots/{slot_id}", delete(handlers::delete_slot))
        // Booking lifecycle
        .route("/bookings", post(handlers::book_slot))
        .route("/bookings/mine", get(handlers::my_bookings))
        .route("/bookings/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/bookings/{booking_id}/complete", post(handlers::complete_booking))
        // Consultation queue & history (doctor)
        .route("/queue", get(handlers::queue_for_slot))
        .route("/patients/{patient_id}/history", get(handlers::patient_history))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
