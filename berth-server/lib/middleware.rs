//! Middleware components for the berth server.
//!
//! This module provides:
//! - Bearer token authentication that resolves the requesting user
//! - Request and response logging

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use berth_core::models::UserId;

use crate::{auth, state::AppState, ServerError};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The authenticated user of a request, inserted into the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

//--------------------------------------------------------------------------------------------------
// Middleware Functions
//--------------------------------------------------------------------------------------------------

/// Rejects requests without a valid bearer token and records the caller as [`AuthUser`].
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ServerError> {
    let credential = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ServerError::AuthenticationError("missing bearer token".to_string())
        })?;

    let user_id = auth::authenticate(state.get_config().get_key(), credential).inspect_err(|e| {
        tracing::warn!("rejected request to {}: {}", req.uri(), e);
    })?;

    req.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(req).await)
}

/// Log incoming requests
pub async fn logging_middleware(
    req: Request<Body>,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let method = req.method().clone();
    let uri = req.uri().clone();

    tracing::info!("Request: {} {}", method, uri);

    let response = next.run(req).await;

    tracing::info!("Response: {} {}: {}", method, uri, response.status());

    Ok(response)
}
