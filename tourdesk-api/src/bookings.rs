use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tourdesk_booking::CreateBookingRequest;
use tourdesk_core::{BookingFilter, BookingStatus, PageRequest, PaymentStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::OperatorId;
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBookingsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub booking_status: Option<String>,
    pub payment_status: Option<String>,
}

impl ListBookingsQuery {
    fn into_filter(self) -> Result<BookingFilter, AppError> {
        let booking_status = self
            .booking_status
            .map(|s| {
                s.parse::<BookingStatus>()
                    .map_err(|_| AppError::ValidationError(format!("Unknown bookingStatus '{}'", s)))
            })
            .transpose()?;
        let payment_status = self
            .payment_status
            .map(|s| {
                s.parse::<PaymentStatus>()
                    .map_err(|_| AppError::ValidationError(format!("Unknown paymentStatus '{}'", s)))
            })
            .transpose()?;

        Ok(BookingFilter {
            page: PageRequest::new(self.page, self.limit),
            booking_status,
            payment_status,
        })
    }
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    AppJson(req): AppJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), AppError> {
    let details = state.engine.create_booking(operator_id, req).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(json!({ "booking": details }))))
}

/// GET /v1/bookings
async fn list_bookings(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let filter = query.into_filter()?;
    let page = state.bookings.list_bookings(operator_id, &filter).await?;

    Ok(ApiResponse::ok(json!({
        "pagination": Pagination::from(&page),
        "bookings": page.items,
    })))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let details = state
        .bookings
        .get_booking(operator_id, booking_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Booking not found".to_string()))?;

    Ok(ApiResponse::ok(json!({ "booking": details })))
}

/// POST /v1/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let booking = state.manager.confirm_booking(operator_id, booking_id).await?;
    Ok(ApiResponse::ok(json!({ "booking": booking })))
}

/// POST /v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let booking = state.manager.cancel_booking(operator_id, booking_id).await?;
    Ok(ApiResponse::ok(json!({ "booking": booking })))
}
