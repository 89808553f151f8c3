//! Permission check on verified claims.

use crate::auth::claims::Claims;
use crate::errors::AuthError;

/// Confirm that `claims` grants `required`.
///
/// # Errors
///
/// - `MalformedToken` if the token carries no `permissions` claim at all.
/// - `Forbidden` if `required` is not one of the granted permissions.
pub fn check_permission(required: &str, claims: &Claims) -> Result<(), AuthError> {
    let permissions = claims.permissions.as_ref().ok_or_else(|| {
        tracing::debug!(target: "drinks.auth.permissions", "Token has no permissions claim");
        AuthError::MalformedToken
    })?;

    if !claims.has_permission(required) {
        tracing::debug!(
            target: "drinks.auth.permissions",
            required = %required,
            granted = permissions.len(),
            "Required permission not granted"
        );
        return Err(AuthError::Forbidden);
    }

    Ok(())
}
