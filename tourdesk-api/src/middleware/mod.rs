pub mod auth;

pub use auth::{operator_auth_middleware, OperatorClaims, OperatorId};
