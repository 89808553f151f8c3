//! Mock identity provider JWKS endpoint
//!
//! Wraps a wiremock server that publishes a key set at
//! `/.well-known/jwks.json`.

use crate::crypto_fixtures::{jwks_document, TestKey};
use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the identity provider publishes its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running mock JWKS endpoint.
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    /// Serve a key set containing `keys`.
    pub async fn start(keys: &[TestKey]) -> Self {
        let mock = Self {
            server: MockServer::start().await,
        };
        mock.serve_keys(keys).await;
        mock
    }

    /// Serve the primary test key only.
    pub async fn start_default() -> Self {
        Self::start(&[TestKey::primary()]).await
    }

    /// Respond to every fetch with `status` and no key set.
    pub async fn start_failing(status: u16) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        Self { server }
    }

    /// Respond with `keys` only after `delay`.
    pub async fn start_slow(keys: &[TestKey], delay: Duration) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_document(keys))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
        Self { server }
    }

    /// Replace the published key set (simulates provider key rotation).
    ///
    /// Also clears the recorded request history.
    pub async fn serve_keys(&self, keys: &[TestKey]) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
            .mount(&self.server)
            .await;
    }

    /// Replace the published body with an arbitrary JSON document.
    ///
    /// Also clears the recorded request history.
    pub async fn serve_document(&self, document: Value) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Full URL of the key set endpoint.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Number of key set fetches received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| {
                requests
                    .iter()
                    .filter(|r| r.url.path() == JWKS_PATH)
                    .count()
            })
            .unwrap_or(0)
    }
}
