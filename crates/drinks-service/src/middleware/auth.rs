//! Authorization middleware for protected routes.
//!
//! Runs the [`AuthGate`] for a fixed permission and injects the verified
//! claims into request extensions. On failure the handler never runs and
//! the gate's error is returned verbatim.

use crate::auth::AuthGate;
use crate::errors::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::instrument;

/// State for the permission middleware: the shared gate and the permission
/// this route requires.
#[derive(Clone)]
pub struct PermissionGuard {
    gate: AuthGate,
    permission: &'static str,
}

impl PermissionGuard {
    pub fn new(gate: AuthGate, permission: &'static str) -> Self {
        Self { gate, permission }
    }

    pub fn permission(&self) -> &'static str {
        self.permission
    }
}

/// Middleware that authorizes the request for the guard's permission.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns the [`AuthError`](crate::errors::AuthError) status and code on failure
/// - Continues to the handler with `Claims` in extensions on success
#[instrument(skip_all, name = "drinks.middleware.auth", fields(permission = guard.permission))]
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = guard.gate.authorize(guard.permission, req.headers()).await?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
