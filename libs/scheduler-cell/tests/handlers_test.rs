use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use scheduler_cell::router::scheduler_routes;
use scheduler_cell::state::AppState;
use shared_models::scheduling::Profile;
use shared_store::{MemoryStore, SchedulingStore};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    app: Router,
    mem: Arc<MemoryStore>,
    secret: String,
}

fn test_app() -> TestApp {
    let config = TestConfig::default();
    let secret = config.jwt_secret.clone();
    let mem = Arc::new(MemoryStore::new());
    let store: Arc<dyn SchedulingStore> = mem.clone();
    let state = AppState::new(config.to_arc(), store);
    TestApp {
        app: scheduler_routes(state),
        mem,
        secret,
    }
}

impl TestApp {
    fn token(&self, user: &TestUser) -> String {
        JwtTestUtils::create_test_token(user, &self.secret, Some(1))
    }

    async fn send(
        &self,
        user: &TestUser,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", self.token(user)));
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

fn tomorrow() -> String {
    (Utc::now().date_naive() + Duration::days(1)).to_string()
}

async fn create_slot(app: &TestApp, doctor: &TestUser, capacity: i64) -> Value {
    let (status, body) = app
        .send(
            doctor,
            "POST",
            "/slots",
            Some(json!({
                "date": tomorrow(),
                "time": "09:00:00",
                "capacity": capacity
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "slot creation failed: {}", body);
    body["slot"].clone()
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let app = test_app();

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/slots")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_tokens_are_rejected() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let forged = JwtTestUtils::create_invalid_signature_token(&doctor);

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/slots")
                .header("Authorization", format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn slot_routes_require_the_doctor_role() {
    let app = test_app();
    let patient = TestUser::patient("pat@example.com");

    let (status, body) = app
        .send(
            &patient,
            "POST",
            "/slots",
            Some(json!({ "date": tomorrow(), "time": "09:00:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");

    let (status, _) = app.send(&patient, "GET", "/slots", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            &patient,
            "GET",
            &format!("/queue?date={}&time=09:00", tomorrow()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn booking_routes_require_the_patient_role() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");

    let (status, body) = app
        .send(
            &doctor,
            "POST",
            "/bookings",
            Some(json!({ "slot_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
}

#[tokio::test]
async fn doctor_creates_and_lists_slots() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");

    let slot = create_slot(&app, &doctor, 2).await;
    assert_eq!(slot["capacity"], 2);
    assert_eq!(slot["time"], "09:00:00");

    let (status, body) = app.send(&doctor, "GET", "/slots", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_slot_creation_returns_conflict() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let request = json!({ "date": tomorrow(), "time": "09:00:00", "capacity": 1 });

    let (status, _) = app
        .send(&doctor, "POST", "/slots", Some(request.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(&doctor, "POST", "/slots", Some(request)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

#[tokio::test]
async fn past_dates_are_a_bad_request() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let yesterday = (Utc::now().date_naive() - Duration::days(1)).to_string();

    let (status, body) = app
        .send(
            &doctor,
            "POST",
            "/slots",
            Some(json!({ "date": yesterday, "time": "09:00:00" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_argument");
}

#[tokio::test]
async fn full_booking_lifecycle_over_http() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let slot = create_slot(&app, &doctor, 1).await;
    let slot_id = slot["id"].as_str().unwrap().to_string();

    // Book the only seat.
    let (status, body) = app
        .send(&patient, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "booked");
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    // A second patient finds the slot full.
    let rival = TestUser::patient("rival@example.com");
    let (status, body) = app
        .send(&rival, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "slot_full");

    // The doctor completes the consultation.
    let (status, body) = app
        .send(
            &doctor,
            "POST",
            &format!("/bookings/{}/complete", booking_id),
            Some(json!({
                "title": "Checkup",
                "description": "All clear",
                "prescriptions": [{
                    "medicine_name": "Ibuprofen",
                    "dosage": "200mg",
                    "frequency": "As needed",
                    "duration": "3 days"
                }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "completed");
    assert_eq!(body["record"]["title"], "Checkup");

    // The record shows up in the patient's history.
    let (status, body) = app
        .send(
            &doctor,
            "GET",
            &format!("/patients/{}/history", patient.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["prescriptions"][0]["medicine_name"], "Ibuprofen");
}

#[tokio::test]
async fn patients_can_read_their_own_history_but_nobody_elses() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let slot = create_slot(&app, &doctor, 1).await;
    let (_, body) = app
        .send(
            &patient,
            "POST",
            "/bookings",
            Some(json!({ "slot_id": slot["id"] })),
        )
        .await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();
    app.send(
        &doctor,
        "POST",
        &format!("/bookings/{}/complete", booking_id),
        Some(json!({
            "title": "Malaria treatment",
            "prescriptions": [{
                "medicine_name": "Artemether",
                "dosage": "80mg",
                "frequency": "Twice daily",
                "duration": "3 days"
            }]
        })),
    )
    .await;

    let uri = format!("/patients/{}/history", patient.id);
    let (status, body) = app.send(&patient, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "Malaria treatment");

    // Another patient cannot read it.
    let rival = TestUser::patient("rival@example.com");
    let (status, body) = app.send(&rival, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "forbidden");
}

#[tokio::test]
async fn rebooking_the_same_slot_is_a_conflict_until_cancelled() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let slot = create_slot(&app, &doctor, 2).await;
    let slot_id = slot["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .send(&patient, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(&patient, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_booked");

    let (status, body) = app
        .send(
            &patient,
            "POST",
            &format!("/bookings/{}/cancel", booking_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "cancelled");

    let (status, _) = app
        .send(&patient, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cancelling_a_cancelled_booking_is_unprocessable() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let slot = create_slot(&app, &doctor, 1).await;
    let slot_id = slot["id"].as_str().unwrap();

    let (_, body) = app
        .send(&patient, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    let uri = format!("/bookings/{}/cancel", booking_id);
    app.send(&patient, "POST", &uri, None).await;
    let (status, body) = app.send(&patient, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_state");
}

#[tokio::test]
async fn available_slots_hide_full_and_already_booked_ones() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    app.mem
        .put_profile(Profile {
            user_id: doctor.user_id(),
            full_name: "Dr. Ngozi Okafor".to_string(),
            speciality: Some("Cardiology".to_string()),
            ..Default::default()
        })
        .await;

    // Three slots: one stays open, one gets filled, one gets booked by
    // the calling patient.
    let open = create_slot(&app, &doctor, 2).await;
    let (_, body) = app
        .send(
            &doctor,
            "POST",
            "/slots",
            Some(json!({ "date": tomorrow(), "time": "10:00:00", "capacity": 1 })),
        )
        .await;
    let filled_id = body["slot"]["id"].as_str().unwrap().to_string();
    let (_, body) = app
        .send(
            &doctor,
            "POST",
            "/slots",
            Some(json!({ "date": tomorrow(), "time": "11:00:00", "capacity": 3 })),
        )
        .await;
    let mine_id = body["slot"]["id"].as_str().unwrap().to_string();

    let rival = TestUser::patient("rival@example.com");
    app.send(&rival, "POST", "/bookings", Some(json!({ "slot_id": filled_id })))
        .await;
    app.send(&patient, "POST", "/bookings", Some(json!({ "slot_id": mine_id })))
        .await;

    let (status, body) = app.send(&patient, "GET", "/slots/available", None).await;
    assert_eq!(status, StatusCode::OK);

    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0]["id"], open["id"]);
    assert_eq!(slots[0]["available_seats"], 2);
    assert_eq!(slots[0]["doctor"]["full_name"], "Dr. Ngozi Okafor");
    assert_eq!(slots[0]["doctor"]["speciality"], "Cardiology");

    // The rival still sees the slot the first patient booked.
    let (_, body) = app.send(&rival, "GET", "/slots/available", None).await;
    let ids: Vec<_> = body["slots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect();
    assert!(ids.contains(&mine_id));
}

#[tokio::test]
async fn my_bookings_supports_status_filtering() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let first = create_slot(&app, &doctor, 1).await;
    let (_, body) = app
        .send(
            &doctor,
            "POST",
            "/slots",
            Some(json!({ "date": tomorrow(), "time": "10:00:00" })),
        )
        .await;
    let second_id = body["slot"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .send(
            &patient,
            "POST",
            "/bookings",
            Some(json!({ "slot_id": first["id"] })),
        )
        .await;
    let cancelled_id = body["booking"]["id"].as_str().unwrap().to_string();
    app.send(
        &patient,
        "POST",
        &format!("/bookings/{}/cancel", cancelled_id),
        None,
    )
    .await;
    app.send(&patient, "POST", "/bookings", Some(json!({ "slot_id": second_id })))
        .await;

    let (status, body) = app.send(&patient, "GET", "/bookings/mine", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookings"].as_array().unwrap().len(), 2);

    let (_, body) = app
        .send(&patient, "GET", "/bookings/mine?status=booked", None)
        .await;
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["status"], "booked");
}

#[tokio::test]
async fn queue_endpoint_returns_waiting_patients_in_order() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let first = TestUser::patient("first@example.com");
    let second = TestUser::patient("second@example.com");

    app.mem
        .put_profile(Profile {
            user_id: first.user_id(),
            full_name: "Amina Yusuf".to_string(),
            ..Default::default()
        })
        .await;

    let slot = create_slot(&app, &doctor, 3).await;
    let slot_id = slot["id"].as_str().unwrap();

    app.send(&first, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    app.send(&second, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;

    let (status, body) = app
        .send(
            &doctor,
            "GET",
            &format!("/queue?date={}&time=09:00", tomorrow()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let queue = body["queue"].as_array().unwrap();
    assert_eq!(queue.len(), 2);
    assert_eq!(queue[0]["patient"]["full_name"], "Amina Yusuf");
    assert_eq!(queue[1]["patient"]["full_name"], "Unknown");
}

#[tokio::test]
async fn deleting_a_booked_slot_is_blocked() {
    let app = test_app();
    let doctor = TestUser::doctor("doc@example.com");
    let patient = TestUser::patient("pat@example.com");

    let slot = create_slot(&app, &doctor, 1).await;
    let slot_id = slot["id"].as_str().unwrap().to_string();
    let (_, body) = app
        .send(&patient, "POST", "/bookings", Some(json!({ "slot_id": slot_id })))
        .await;
    let booking_id = body["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(&doctor, "DELETE", &format!("/slots/{}", slot_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");

    app.send(
        &patient,
        "POST",
        &format!("/bookings/{}/cancel", booking_id),
        None,
    )
    .await;

    let (status, _) = app
        .send(&doctor, "DELETE", &format!("/slots/{}", slot_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
