use axum::{routing::get, Router};

use scheduler_cell::router::scheduler_routes;
use scheduler_cell::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic scheduling API is running!" }))
        .nest("/schedule", scheduler_routes(state))
}
