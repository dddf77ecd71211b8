use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod state;
pub mod tours;

pub use error::AppError;
pub use state::{AppState, AuthConfig};

const RATE_LIMIT_REQUESTS: i64 = 100;
const RATE_LIMIT_WINDOW_SECONDS: i64 = 60;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let protected = Router::new()
        .merge(tours::routes())
        .merge(bookings::routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::operator_auth_middleware));

    let mut router = Router::new().route("/health", get(health)).merge(protected);

    // The limiter keys on the peer address, so it needs `ConnectInfo` from the server.
    if state.rate_limiter.is_some() {
        router = router.layer(from_fn_with_state(state.clone(), rate_limit_middleware));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return Ok(next.run(req).await);
    };

    let key = format!("ratelimit:{}", addr.ip());
    match limiter
        .check_rate_limit(&key, RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_SECONDS)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err(AppError::RateLimited),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            Ok(next.run(req).await)
        }
    }
}
