use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OperatorClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub operator_id: Option<Uuid>,
    pub exp: usize,
}

/// Tenant of the authenticated request. Every route below the auth layer
/// scopes its reads and writes to this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorId(pub Uuid);

pub async fn operator_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("No token provided".to_string()))?;

    let token_data = decode::<OperatorClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthenticationError("Invalid or expired access token".to_string()))?;

    // Accounts without an operator (e.g. platform staff) cannot act on bookings.
    let operator_id = token_data
        .claims
        .operator_id
        .ok_or_else(|| AppError::AuthenticationError("Not authenticated".to_string()))?;

    req.extensions_mut().insert(OperatorId(operator_id));
    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
