//! Authorization gate composing extraction, verification and permission checks.
//!
//! ```text
//! Unauthenticated -> TokenExtracted -> Verified -> Authorized
//! ```
//!
//! A failure at any stage ends the run with that stage's [`AuthError`];
//! nothing downstream executes.

use crate::auth::claims::Claims;
use crate::auth::extractor::bearer_token_from_headers;
use crate::auth::jwks::JwksClient;
use crate::auth::jwt::{JwtVerifier, VerifierSettings};
use crate::auth::permissions::check_permission;
use crate::config::Config;
use crate::errors::AuthError;
use crate::observability::metrics::record_auth_decision;
use axum::http::HeaderMap;
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

/// Last stage an authorization run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    TokenExtracted,
    Verified,
    Authorized,
}

impl AuthStage {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStage::Unauthenticated => "unauthenticated",
            AuthStage::TokenExtracted => "token_extracted",
            AuthStage::Verified => "verified",
            AuthStage::Authorized => "authorized",
        }
    }
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guard for protected operations.
///
/// Cheap to clone; clones share the verifier and its key cache.
#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<JwtVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<JwtVerifier>) -> Self {
        Self { verifier }
    }

    /// Build the gate, its verifier and its key-set cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        let jwks_client = Arc::new(JwksClient::new(
            config.jwks_url.clone(),
            config.jwks_fetch_timeout,
            config.jwks_cache_ttl,
        ));
        let verifier = JwtVerifier::new(
            jwks_client,
            VerifierSettings {
                audience: config.api_audience.clone(),
                issuer: config.jwt_issuer.clone(),
                algorithms: config.jwt_algorithms.clone(),
                leeway_seconds: config.jwt_clock_skew_seconds,
            },
        );
        Self::new(Arc::new(verifier))
    }

    pub fn verifier(&self) -> &Arc<JwtVerifier> {
        &self.verifier
    }

    /// Authorize a request for `required_permission`.
    ///
    /// Returns the verified claims on success.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`] from the stage that failed, unchanged.
    #[instrument(skip_all, name = "drinks.auth.authorize", fields(permission = %required_permission))]
    pub async fn authorize(
        &self,
        required_permission: &str,
        headers: &HeaderMap,
    ) -> Result<Claims, AuthError> {
        match self.run(required_permission, headers).await {
            Ok(claims) => {
                record_auth_decision("allowed", AuthStage::Authorized, "ok");
                tracing::debug!(target: "drinks.auth.gate", "Request authorized");
                Ok(claims)
            }
            Err((stage, err)) => {
                record_auth_decision("denied", stage, err.code());
                tracing::info!(
                    target: "drinks.auth.gate",
                    stage = %stage,
                    code = err.code(),
                    status = err.status_code().as_u16(),
                    "Request not authorized"
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        required_permission: &str,
        headers: &HeaderMap,
    ) -> Result<Claims, (AuthStage, AuthError)> {
        let token = bearer_token_from_headers(headers)
            .map_err(|e| (AuthStage::Unauthenticated, e))?;

        let claims = self
            .verifier
            .verify(token)
            .await
            .map_err(|e| (AuthStage::TokenExtracted, e))?;

        check_permission(required_permission, &claims).map_err(|e| (AuthStage::Verified, e))?;

        Ok(claims)
    }
}
