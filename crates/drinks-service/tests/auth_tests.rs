//! Authorization integration tests.
//!
//! Drives the full pipeline (header extraction, JWKS lookup, RS256
//! verification, permission check) against a spawned server and a mocked
//! identity provider.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use drinks_service::auth::{AuthGate, Jwk};
use drinks_service::config::Config;
use drinks_service::errors::AuthError;
use drinks_test_utils::*;
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::time::Duration;

struct TestResponse {
    status: u16,
    body: Value,
}

async fn get_detail(server: &TestDrinksServer, authorization: Option<&str>) -> Result<TestResponse> {
    let mut request = reqwest::Client::new().get(format!("{}/drinks-detail", server.url()));
    if let Some(value) = authorization {
        request = request.header("Authorization", value);
    }
    let response = request.send().await?;
    let status = response.status().as_u16();
    let body = response.json().await?;
    Ok(TestResponse { status, body })
}

fn assert_auth_error(response: &TestResponse, status: u16, code: &str) {
    assert_eq!(
        response.status, status,
        "unexpected status, body: {}",
        response.body
    );
    assert_eq!(response.body["success"], false);
    assert_eq!(response.body["error"], status);
    assert_eq!(response.body["code"], code);
}

fn detail_token() -> TestTokenBuilder {
    TestTokenBuilder::new().with_permissions(&["get:drinks-detail"])
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn test_valid_token_with_permission_is_authorized() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_eq!(response.status, 200);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["drinks"][0]["recipe"][0]["name"], "water");

    Ok(())
}

#[tokio::test]
async fn test_authorize_returns_full_token_payload() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let config = Config::from_vars(&test_config_vars(&jwks.jwks_url()))?;
    let gate = AuthGate::from_config(&config);

    let builder = detail_token()
        .with_audiences(&[TEST_AUDIENCE, "https://dev-test.us.auth0.com/userinfo"])
        .with_claim("azp", json!("client-123"))
        .with_claim("scope", json!("openid profile"));
    let token = builder.sign(&TestKey::primary());

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer(&token))?);

    let claims = gate.authorize("get:drinks-detail", &headers).await?;

    assert_eq!(serde_json::to_value(&claims)?, builder.claims());

    Ok(())
}

#[tokio::test]
async fn test_injected_key_round_trips_payload_without_network() -> Result<()> {
    // Nothing listens on the discard port; any fetch would fail.
    let config = Config::from_vars(&test_config_vars("http://127.0.0.1:9/.well-known/jwks.json"))?;
    let gate = AuthGate::from_config(&config);

    let jwk: Jwk = serde_json::from_value(TestKey::primary().jwk())?;
    gate.verifier().jwks_client().replace_keys(vec![jwk]).await;

    let builder = detail_token().for_subject("auth0|barista-07");
    let token = builder.sign(&TestKey::primary());

    let claims = gate.verifier().verify(&token).await?;

    assert_eq!(serde_json::to_value(&claims)?, builder.claims());

    Ok(())
}

#[tokio::test]
async fn test_lowercase_bearer_scheme_is_accepted() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign(&TestKey::primary());
    let response = get_detail(&server, Some(&format!("bearer {}", token))).await?;

    assert_eq!(response.status, 200);

    Ok(())
}

// ============================================================================
// Header extraction
// ============================================================================

#[tokio::test]
async fn test_missing_header_is_unauthorized() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let response = get_detail(&server, None).await?;

    assert_auth_error(&response, 401, "authorization_header_missing");
    assert_eq!(jwks.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_wrong_scheme_is_bad_request() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let response = get_detail(&server, Some("Token abc")).await?;

    assert_auth_error(&response, 400, "invalid_header");

    Ok(())
}

#[tokio::test]
async fn test_extra_header_parts_are_bad_request() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let response = get_detail(&server, Some("Bearer a b")).await?;

    assert_auth_error(&response, 400, "invalid_header");

    Ok(())
}

// ============================================================================
// Algorithm allow-list
// ============================================================================

#[tokio::test]
async fn test_none_algorithm_is_rejected_without_fetching_keys() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().unsigned(PRIMARY_KEY_ID);
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_header");
    assert_eq!(jwks.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_hmac_token_is_rejected_without_fetching_keys() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    // Signing with the public modulus as an HMAC secret is the classic
    // algorithm-confusion attack.
    let token = detail_token().sign_hs256(PRIMARY_KEY_ID, TestKey::primary().modulus.as_bytes());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_header");
    assert_eq!(jwks.fetch_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_rsa_variant_outside_allow_list_is_rejected() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign_with(&TestKey::primary(), Algorithm::RS512);
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_header");

    Ok(())
}

// ============================================================================
// Signature
// ============================================================================

#[tokio::test]
async fn test_tampered_signature_is_rejected() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = tamper_signature(&detail_token().sign(&TestKey::primary()));
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_header");

    Ok(())
}

#[tokio::test]
async fn test_token_signed_by_other_key_under_known_kid_is_rejected() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let impostor = TestKey::secondary().with_kid(PRIMARY_KEY_ID);
    let token = detail_token().sign(&impostor);
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_header");

    Ok(())
}

// ============================================================================
// Key lookup
// ============================================================================

#[tokio::test]
async fn test_unknown_kid_is_unauthorized() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign(&TestKey::secondary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "unknown_key");

    Ok(())
}

#[tokio::test]
async fn test_key_set_is_cached_between_requests() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign(&TestKey::primary());
    for _ in 0..3 {
        let response = get_detail(&server, Some(&bearer(&token))).await?;
        assert_eq!(response.status, 200);
    }

    assert_eq!(jwks.fetch_count().await, 1);

    Ok(())
}

#[tokio::test]
async fn test_rotated_key_is_picked_up_without_restart() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    // Warm the cache with the original key set.
    let old_token = detail_token().sign(&TestKey::primary());
    assert_eq!(get_detail(&server, Some(&bearer(&old_token))).await?.status, 200);

    jwks.serve_keys(&[TestKey::primary(), TestKey::secondary()])
        .await;

    let new_token = detail_token().sign(&TestKey::secondary());
    let response = get_detail(&server, Some(&bearer(&new_token))).await?;

    assert_eq!(response.status, 200, "body: {}", response.body);

    Ok(())
}

#[tokio::test]
async fn test_key_set_with_kidless_entry_still_verifies() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    jwks.serve_document(json!({
        "keys": [
            {"kty": "EC", "crv": "P-256", "x": "a", "y": "b", "use": "enc"},
            TestKey::primary().jwk()
        ]
    }))
    .await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_eq!(response.status, 200, "body: {}", response.body);

    Ok(())
}

#[tokio::test]
async fn test_unavailable_key_set_is_service_unavailable() -> Result<()> {
    let jwks = MockJwks::start_failing(500).await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 503, "jwks_unavailable");

    Ok(())
}

#[tokio::test]
async fn test_slow_key_set_times_out() -> Result<()> {
    let jwks = MockJwks::start_slow(&[TestKey::primary()], Duration::from_secs(3)).await;
    let mut vars = test_config_vars(&jwks.jwks_url());
    vars.insert("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "1".to_string());
    let server = TestDrinksServer::spawn_with(vars, Default::default()).await?;

    let token = detail_token().sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 503, "jwks_unavailable");

    Ok(())
}

// ============================================================================
// Standard claims
// ============================================================================

#[tokio::test]
async fn test_expired_token_is_forbidden() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().expires_in(-120).sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 403, "token_expired");

    Ok(())
}

#[tokio::test]
async fn test_token_expiring_now_is_forbidden() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().expires_in(0).sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 403, "token_expired");

    Ok(())
}

#[tokio::test]
async fn test_clock_skew_tolerates_recent_expiry() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let mut vars = test_config_vars(&jwks.jwks_url());
    vars.insert("JWT_CLOCK_SKEW_SECONDS".to_string(), "300".to_string());
    let server =
        TestDrinksServer::spawn_with(vars, drinks_service::repositories::InMemoryDrinkRepository::seeded())
            .await?;

    let token = detail_token().expires_in(-60).sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_eq!(response.status, 200);

    Ok(())
}

#[tokio::test]
async fn test_wrong_audience_is_invalid_claims() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token()
        .with_audience("https://other-api.example.com")
        .sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_claims");

    Ok(())
}

#[tokio::test]
async fn test_wrong_issuer_is_invalid_claims() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token()
        .with_issuer("https://evil.example.com/")
        .sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_claims");

    Ok(())
}

#[tokio::test]
async fn test_missing_standard_claims_are_invalid_claims() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    for builder in [
        detail_token().without_expiry(),
        detail_token().without_audience(),
        detail_token().without_issuer(),
    ] {
        let token = builder.sign(&TestKey::primary());
        let response = get_detail(&server, Some(&bearer(&token))).await?;
        assert_auth_error(&response, 401, "invalid_claims");
    }

    Ok(())
}

#[tokio::test]
async fn test_future_not_before_is_invalid_claims() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = detail_token().not_before_in(600).sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "invalid_claims");

    Ok(())
}

// ============================================================================
// Permissions
// ============================================================================

#[tokio::test]
async fn test_missing_permission_is_forbidden_code() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = TestTokenBuilder::new()
        .with_permissions(&["post:drinks"])
        .sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 401, "forbidden");

    Ok(())
}

#[tokio::test]
async fn test_missing_permissions_claim_is_malformed_token() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;

    let token = TestTokenBuilder::new()
        .without_permissions()
        .sign(&TestKey::primary());
    let response = get_detail(&server, Some(&bearer(&token))).await?;

    assert_auth_error(&response, 400, "malformed_token");

    Ok(())
}

#[tokio::test]
async fn test_gate_error_variants_match_http_codes() -> Result<()> {
    let jwks = MockJwks::start_default().await;
    let config = Config::from_vars(&test_config_vars(&jwks.jwks_url()))?;
    let gate = AuthGate::from_config(&config);

    let token = TestTokenBuilder::new()
        .with_permissions(&["get:drinks-detail"])
        .sign(&TestKey::primary());
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&bearer(&token))?);

    let err = gate.authorize("post:drinks", &headers).await.unwrap_err();
    assert_eq!(err, AuthError::Forbidden);

    let claims = gate.authorize("get:drinks-detail", &headers).await?;
    assert!(claims.has_permission("get:drinks-detail"));

    Ok(())
}
