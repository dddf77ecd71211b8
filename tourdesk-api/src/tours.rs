use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tourdesk_catalog::{NewSchedule, NewTour, Tour, TourUpdate};
use tourdesk_core::{PageRequest, TourFilter};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::middleware::OperatorId;
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tours", post(create_tour).get(list_tours))
        .route("/v1/tours/{id}", get(get_tour).put(update_tour).delete(archive_tour))
        .route("/v1/tours/{id}/schedules", post(create_schedule).get(list_schedules))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToursQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub is_active: Option<bool>,
}

async fn owned_tour(state: &AppState, operator_id: Uuid, tour_id: Uuid) -> Result<Tour, AppError> {
    state
        .catalog
        .get_tour(operator_id, tour_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Tour not found".to_string()))
}

/// POST /v1/tours
async fn create_tour(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    AppJson(req): AppJson<NewTour>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), AppError> {
    let tour = req.into_tour(operator_id)?;
    state.catalog.create_tour(&tour).await?;

    info!("Tour {} created for operator {}", tour.id, operator_id);
    Ok((StatusCode::CREATED, ApiResponse::ok(json!({ "tour": tour }))))
}

/// GET /v1/tours
async fn list_tours(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Query(query): Query<ListToursQuery>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let filter = TourFilter {
        page: PageRequest::new(query.page, query.limit),
        is_active: query.is_active,
    };
    let page = state.catalog.list_tours(operator_id, &filter).await?;

    Ok(ApiResponse::ok(json!({
        "pagination": Pagination::from(&page),
        "tours": page.items,
    })))
}

/// GET /v1/tours/{id}
async fn get_tour(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let tour = owned_tour(&state, operator_id, tour_id).await?;
    Ok(ApiResponse::ok(json!({ "tour": tour })))
}

/// PUT /v1/tours/{id}
async fn update_tour(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(tour_id): Path<Uuid>,
    AppJson(req): AppJson<TourUpdate>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let mut tour = owned_tour(&state, operator_id, tour_id).await?;
    let has_schedules = !state.catalog.list_schedules(tour.id).await?.is_empty();

    req.apply(&mut tour, has_schedules)?;
    if !state.catalog.update_tour(&tour).await? {
        return Err(AppError::NotFoundError("Tour not found".to_string()));
    }

    info!("Tour {} updated", tour.id);
    Ok(ApiResponse::ok(json!({ "tour": tour })))
}

/// DELETE /v1/tours/{id}
async fn archive_tour(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    if !state.catalog.archive_tour(operator_id, tour_id).await? {
        return Err(AppError::NotFoundError("Tour not found".to_string()));
    }

    info!("Tour {} archived", tour_id);
    Ok(ApiResponse::ok(json!({ "id": tour_id, "isActive": false })))
}

/// POST /v1/tours/{id}/schedules
async fn create_schedule(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(tour_id): Path<Uuid>,
    AppJson(req): AppJson<NewSchedule>,
) -> Result<(StatusCode, Json<ApiResponse<Value>>), AppError> {
    let tour = owned_tour(&state, operator_id, tour_id).await?;
    if !tour.is_active {
        return Err(AppError::ValidationError("Tour is archived".to_string()));
    }

    let schedule = req.into_schedule(&tour)?;
    state.catalog.create_schedule(&schedule).await?;

    info!(
        "Schedule {} opened on tour {} with {} spots",
        schedule.id, tour.id, schedule.available_spots
    );
    Ok((StatusCode::CREATED, ApiResponse::ok(json!({ "schedule": schedule }))))
}

/// GET /v1/tours/{id}/schedules
async fn list_schedules(
    State(state): State<AppState>,
    Extension(OperatorId(operator_id)): Extension<OperatorId>,
    Path(tour_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let tour = owned_tour(&state, operator_id, tour_id).await?;
    let schedules = state.catalog.list_schedules(tour.id).await?;
    Ok(ApiResponse::ok(json!({ "schedules": schedules })))
}
