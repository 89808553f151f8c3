//! Builder patterns for test tokens
//!
//! Builds claims payloads and signs them with the fixed test keys.

use crate::crypto_fixtures::TestKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Identity provider domain used across tests.
pub const TEST_AUTH_DOMAIN: &str = "dev-test.us.auth0.com";

/// Issuer matching [`TEST_AUTH_DOMAIN`].
pub const TEST_ISSUER: &str = "https://dev-test.us.auth0.com/";

/// Audience the test service expects.
pub const TEST_AUDIENCE: &str = "http://localhost:5000";

/// Builder for test access tokens.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .with_permissions(&["post:drinks"])
///     .expires_in(3600)
///     .sign(&TestKey::primary());
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    iss: Option<String>,
    aud: Option<Value>,
    sub: String,
    exp: Option<i64>,
    iat: i64,
    nbf: Option<i64>,
    permissions: Option<Vec<String>>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new builder with valid defaults and an empty permission list.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iss: Some(TEST_ISSUER.to_string()),
            aud: Some(json!(TEST_AUDIENCE)),
            sub: "auth0|test-barista".to_string(),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            iat: now.timestamp(),
            nbf: None,
            permissions: Some(Vec::new()),
            extra: Map::new(),
        }
    }

    /// Set the subject.
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the granted permissions.
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Omit the `permissions` claim entirely.
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Omit the `iss` claim.
    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Set a single audience.
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = Some(json!(audience));
        self
    }

    /// Set a list of audiences.
    pub fn with_audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = Some(json!(audiences));
        self
    }

    /// Omit the `aud` claim.
    pub fn without_audience(mut self) -> Self {
        self.aud = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Omit the `exp` claim.
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set `nbf` in seconds from now.
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Add an arbitrary claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims payload.
    pub fn claims(&self) -> Value {
        let mut claims = self.extra.clone();
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iat".to_string(), json!(self.iat));
        if let Some(iss) = &self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(aud) = &self.aud {
            claims.insert("aud".to_string(), aud.clone());
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(nbf) = self.nbf {
            claims.insert("nbf".to_string(), json!(nbf));
        }
        if let Some(permissions) = &self.permissions {
            claims.insert("permissions".to_string(), json!(permissions));
        }
        Value::Object(claims)
    }

    /// Sign with RS256 under the key's id.
    pub fn sign(&self, key: &TestKey) -> String {
        self.sign_with(key, Algorithm::RS256)
    }

    /// Sign with the given RSA algorithm under the key's id.
    pub fn sign_with(&self, key: &TestKey, algorithm: Algorithm) -> String {
        let mut header = Header::new(algorithm);
        header.kid = Some(key.kid.to_string());
        encode(&header, &self.claims(), &key.encoding_key()).expect("test token should encode")
    }

    /// Sign with HS256 using `secret`, claiming key id `kid`.
    pub fn sign_hs256(&self, kid: &str, secret: &[u8]) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.to_string());
        encode(&header, &self.claims(), &EncodingKey::from_secret(secret))
            .expect("test token should encode")
    }

    /// Build an unsigned token with `"alg": "none"`.
    pub fn unsigned(&self, kid: &str) -> String {
        let header = json!({"alg": "none", "typ": "JWT", "kid": kid});
        format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(self.claims().to_string())
        )
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the signature segment of `token` with zero bytes.
pub fn tamper_signature(token: &str) -> String {
    let forged = URL_SAFE_NO_PAD.encode([0u8; 256]);
    let mut parts: Vec<&str> = token.split('.').collect();
    if let Some(signature) = parts.last_mut() {
        *signature = &forged;
    }
    parts.join(".")
}

/// `Authorization` header value for `token`.
pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
