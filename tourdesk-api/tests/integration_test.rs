use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Arc;
use tourdesk_api::middleware::OperatorClaims;
use tourdesk_api::{app, AppState, AuthConfig};
use tourdesk_booking::RetryPolicy;
use tourdesk_core::LogDispatcher;
use tourdesk_store::InMemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

fn test_app(store: &InMemoryStore) -> Router {
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(LogDispatcher),
        RetryPolicy::default(),
        AuthConfig {
            secret: SECRET.to_string(),
        },
    );
    app(state)
}

fn token_for(operator_id: Option<Uuid>) -> String {
    let claims = OperatorClaims {
        sub: Uuid::new_v4().to_string(),
        email: "ops@example.com".to_string(),
        role: "OPERATOR_ADMIN".to_string(),
        operator_id,
        exp: (Utc::now() + Duration::minutes(15)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Creates a tour and one departure, returning (tour id, schedule id).
async fn seed_schedule(app: &Router, token: &str, capacity: i32) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/v1/tours",
        Some(token),
        Some(json!({
            "titleEn": "Diriyah Heritage Walk",
            "durationHours": 3,
            "maxCapacity": capacity,
            "basePriceSar": "150.00",
            "meetingPoint": "At-Turaif gate"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let tour_id = body["data"]["tour"]["id"].as_str().unwrap().to_string();

    let departure = (Utc::now() + Duration::days(3)).to_rfc3339();
    let (status, body) = call(
        app,
        "POST",
        &format!("/v1/tours/{}/schedules", tour_id),
        Some(token),
        Some(json!({ "departureDatetime": departure })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["schedule"]["availableSpots"], capacity);
    let schedule_id = body["data"]["schedule"]["id"].as_str().unwrap().to_string();

    (tour_id, schedule_id)
}

fn booking_body(schedule_id: &str, num_guests: i64) -> Value {
    json!({
        "scheduleId": schedule_id,
        "customerName": "Faisal Al-Harbi",
        "customerEmail": "faisal@example.com",
        "numGuests": num_guests
    })
}

#[tokio::test]
async fn test_health_needs_no_token() {
    let store = InMemoryStore::new();
    let app = test_app(&store);

    let (status, body) = call(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_protected_routes_reject_bad_tokens() {
    let store = InMemoryStore::new();
    let app = test_app(&store);

    let (status, body) = call(&app, "GET", "/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(&app, "GET", "/v1/bookings", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, "GET", "/v1/bookings", Some(&token_for(None)), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let store = InMemoryStore::new();
    let operator_id = store.add_operator("Diriyah Walks", Some("hello@diriyah.example")).await;
    let token = token_for(Some(operator_id));
    let app = test_app(&store);

    let (tour_id, schedule_id) = seed_schedule(&app, &token, 5).await;

    let (status, body) = call(&app, "POST", "/v1/bookings", Some(&token), Some(booking_body(&schedule_id, 3))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let booking = &body["data"]["booking"];
    assert_eq!(body["success"], true);
    assert_eq!(booking["bookingStatus"], "pending");
    assert_eq!(booking["paymentStatus"], "unpaid");
    assert_eq!(booking["customerEmail"], "faisal@example.com");
    let total: Decimal = booking["totalPriceSar"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, Decimal::from(450));
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", "/v1/bookings", Some(&token), Some(booking_body(&schedule_id, 3))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Only 2 spots available");

    let (status, body) = call(&app, "GET", "/v1/bookings?limit=1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["bookings"].as_array().unwrap().len(), 1);

    let (status, body) = call(&app, "POST", &format!("/v1/bookings/{}/cancel", booking_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["booking"]["bookingStatus"], "cancelled");

    let (_, body) = call(&app, "GET", &format!("/v1/tours/{}/schedules", tour_id), Some(&token), None).await;
    assert_eq!(body["data"]["schedules"][0]["availableSpots"], 5);
    assert_eq!(body["data"]["schedules"][0]["status"], "available");
}

#[tokio::test]
async fn test_validation_errors_use_error_envelope() {
    let store = InMemoryStore::new();
    let operator_id = store.add_operator("Diriyah Walks", None).await;
    let token = token_for(Some(operator_id));
    let app = test_app(&store);
    let (_, schedule_id) = seed_schedule(&app, &token, 5).await;

    let mut body = booking_body(&schedule_id, 1);
    body["customerEmail"] = json!("not-an-email");
    let (status, resp) = call(&app, "POST", "/v1/bookings", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp, json!({ "success": false, "error": "Invalid email format" }));

    let (status, resp) = call(&app, "POST", "/v1/bookings", Some(&token), Some(json!({ "scheduleId": schedule_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp["error"],
        "Missing required fields: scheduleId, customerName, customerEmail, numGuests"
    );

    let (status, _) = call(
        &app,
        "POST",
        "/v1/bookings",
        Some(&token),
        Some(booking_body(&Uuid::new_v4().to_string(), 1)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "GET", "/v1/bookings?bookingStatus=shipped", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_operators_are_isolated() {
    let store = InMemoryStore::new();
    let owner = store.add_operator("Diriyah Walks", None).await;
    let other = store.add_operator("Jeddah Boats", None).await;
    let owner_token = token_for(Some(owner));
    let other_token = token_for(Some(other));
    let app = test_app(&store);

    let (tour_id, schedule_id) = seed_schedule(&app, &owner_token, 4).await;
    let (_, body) = call(&app, "POST", "/v1/bookings", Some(&owner_token), Some(booking_body(&schedule_id, 2))).await;
    let booking_id = body["data"]["booking"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(&app, "POST", "/v1/bookings", Some(&other_token), Some(booking_body(&schedule_id, 1))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");

    let (status, _) = call(&app, "GET", &format!("/v1/bookings/{}", booking_id), Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, "POST", &format!("/v1/bookings/{}/cancel", booking_id), Some(&other_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "GET", &format!("/v1/tours/{}", tour_id), Some(&other_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = call(&app, "GET", "/v1/bookings", Some(&other_token), None).await;
    assert_eq!(body["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_archived_tour_takes_no_new_departures() {
    let store = InMemoryStore::new();
    let operator_id = store.add_operator("Diriyah Walks", None).await;
    let token = token_for(Some(operator_id));
    let app = test_app(&store);
    let (tour_id, _) = seed_schedule(&app, &token, 4).await;

    let (status, _) = call(&app, "DELETE", &format!("/v1/tours/{}", tour_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = call(&app, "GET", "/v1/tours?isActive=false", Some(&token), None).await;
    assert_eq!(body["data"]["tours"][0]["id"], tour_id.as_str());

    let departure = (Utc::now() + Duration::days(5)).to_rfc3339();
    let (status, _) = call(
        &app,
        "POST",
        &format!("/v1/tours/{}/schedules", tour_id),
        Some(&token),
        Some(json!({ "departureDatetime": departure })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tour_update_keeps_capacity_once_scheduled() {
    let store = InMemoryStore::new();
    let operator_id = store.add_operator("Diriyah Walks", None).await;
    let token = token_for(Some(operator_id));
    let app = test_app(&store);
    let (tour_id, schedule_id) = seed_schedule(&app, &token, 4).await;
    let uri = format!("/v1/tours/{}", tour_id);

    let (status, body) = call(&app, "PUT", &uri, Some(&token), Some(json!({ "maxCapacity": 40 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "maxCapacity cannot change once the tour has schedules");

    let (status, body) = call(
        &app,
        "PUT",
        &uri,
        Some(&token),
        Some(json!({ "titleEn": "Diriyah by Lantern", "basePriceSar": "175.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["tour"]["titleEn"], "Diriyah by Lantern");
    assert_eq!(body["data"]["tour"]["maxCapacity"], 4);
    assert_eq!(body["data"]["tour"]["meetingPoint"], "At-Turaif gate");

    let (_, body) = call(&app, "GET", &format!("/v1/tours/{}/schedules", tour_id), Some(&token), None).await;
    assert_eq!(body["data"]["schedules"][0]["id"], schedule_id.as_str());
    assert_eq!(body["data"]["schedules"][0]["availableSpots"], 4);

    let other_token = token_for(Some(store.add_operator("Jeddah Boats", None).await));
    let (status, _) = call(&app, "PUT", &uri, Some(&other_token), Some(json!({ "titleEn": "Taken" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let store = InMemoryStore::new();
    let operator_id = store.add_operator("Diriyah Walks", None).await;
    let token = token_for(Some(operator_id));
    let app = test_app(&store);
    let (tour_id, schedule_id) = seed_schedule(&app, &token, 5).await;

    let mut body = booking_body(&schedule_id, 1);
    body["numGuests"] = json!("3");
    let (status, resp) = call(&app, "POST", "/v1/bookings", Some(&token), Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["success"], false);
    assert!(resp["error"].is_string());

    let (status, resp) = call(&app, "POST", "/v1/tours", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["success"], false);

    let (status, resp) = call(
        &app,
        "POST",
        &format!("/v1/tours/{}/schedules", tour_id),
        Some(&token),
        Some(json!({ "departureDatetime": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["success"], false);
    assert_eq!(spots_left(&store, &schedule_id).await, 5);
}

async fn spots_left(store: &InMemoryStore, schedule_id: &str) -> i32 {
    let id = Uuid::parse_str(schedule_id).unwrap();
    store.schedule(id).await.unwrap().available_spots
}
