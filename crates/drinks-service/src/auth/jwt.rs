//! JWT verification against the identity provider's key set.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The header algorithm must be on the configured RSA allow-list; this is
//!   checked before any key lookup, so `none` and HMAC tokens never reach
//!   the network
//! - Signature, `exp`, `aud` and `iss` are all validated; `nbf` when present

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::errors::AuthError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tracing::instrument;

/// Maximum accepted token size in bytes (8KB).
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

const UNPARSEABLE_TOKEN: &str = "Unable to parse authentication token.";

/// What a token must satisfy besides a valid signature.
#[derive(Debug, Clone)]
pub struct VerifierSettings {
    /// Expected `aud`.
    pub audience: String,

    /// Expected `iss`, e.g. `https://tenant.auth0.com/`.
    pub issuer: String,

    /// Accepted signing algorithms. RSA only.
    pub algorithms: Vec<Algorithm>,

    /// Leeway in seconds for `exp` and `nbf`.
    pub leeway_seconds: u64,
}

/// JWT verifier backed by a [`JwksClient`].
pub struct JwtVerifier {
    jwks_client: Arc<JwksClient>,
    settings: VerifierSettings,
}

impl JwtVerifier {
    /// Create a new verifier sharing `jwks_client`'s key cache.
    pub fn new(jwks_client: Arc<JwksClient>, settings: VerifierSettings) -> Self {
        Self {
            jwks_client,
            settings,
        }
    }

    /// The key-set client this verifier reads from.
    pub fn jwks_client(&self) -> &Arc<JwksClient> {
        &self.jwks_client
    }

    /// Verify `token` and return its claims.
    ///
    /// # Steps
    ///
    /// 1. Size check
    /// 2. Read the unverified header; require an allow-listed `alg` and a `kid`
    /// 3. Look up the key by `kid`
    /// 4. Verify the RSA signature
    /// 5. Validate `exp`, `nbf`, `aud`, `iss`
    ///
    /// # Errors
    ///
    /// - `InvalidHeader` for oversized or unparseable tokens, a missing `kid`,
    ///   a disallowed algorithm, an unusable key or a bad signature
    /// - `UnknownKey` / `KeySetUnavailable` from the key lookup
    /// - `ExpiredToken` when `exp` has passed
    /// - `InvalidClaims` for audience/issuer mismatch or missing standard claims
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let (kid, alg) = self.inspect_header(token)?;

        let jwk = self.jwks_client.get_key(&kid).await?;

        let claims = self.verify_with_key(token, alg, &jwk)?;

        tracing::debug!(target: "drinks.auth.jwt", "Token verified successfully");
        Ok(claims)
    }

    /// Read `kid` and `alg` from the unverified header.
    fn inspect_header(&self, token: &str) -> Result<(String, Algorithm), AuthError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "drinks.auth.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string()));
        }

        // Fails for unknown algorithms, "none" included.
        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = %e, "Failed to decode token header");
            AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string())
        })?;

        if !self.settings.algorithms.contains(&header.alg) {
            tracing::warn!(target: "drinks.auth.jwt", alg = ?header.alg, "Token rejected: algorithm not allowed");
            return Err(AuthError::InvalidHeader(
                "Token signing algorithm is not allowed.".to_string(),
            ));
        }

        let kid = header.kid.filter(|kid| !kid.is_empty()).ok_or_else(|| {
            tracing::debug!(target: "drinks.auth.jwt", "Token header has no kid");
            AuthError::InvalidHeader("Authorization malformed.".to_string())
        })?;

        Ok((kid, header.alg))
    }

    /// Verify signature and claims against a specific key.
    fn verify_with_key(&self, token: &str, alg: Algorithm, jwk: &Jwk) -> Result<Claims, AuthError> {
        let decoding_key = self.decoding_key(jwk)?;

        let mut validation = Validation::new(alg);
        validation.algorithms = self.settings.algorithms.clone();
        validation.leeway = self.settings.leeway_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[self.settings.audience.as_str()]);
        validation.set_issuer(&[self.settings.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        // Decode to a JSON value first so claim validation runs before our
        // struct's required fields are enforced.
        let token_data = decode::<serde_json::Value>(token, &decoding_key, &validation)
            .map_err(|e| map_decode_error(e.kind()))?;

        let claims = serde_json::from_value::<Claims>(token_data.claims).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = %e, "Verified payload has unexpected claim shapes");
            AuthError::InvalidClaims
        })?;

        // jsonwebtoken still accepts exp == now; expiry must be strictly in the future.
        let now = i64::try_from(jsonwebtoken::get_current_timestamp()).unwrap_or(i64::MAX);
        let leeway = i64::try_from(self.settings.leeway_seconds).unwrap_or(i64::MAX);
        if claims.exp.saturating_add(leeway) <= now {
            tracing::debug!(target: "drinks.auth.jwt", "Token rejected: expires at verification time");
            return Err(AuthError::ExpiredToken);
        }

        Ok(claims)
    }

    /// Build a decoding key from an RSA JWK.
    fn decoding_key(&self, jwk: &Jwk) -> Result<DecodingKey, AuthError> {
        let unusable = || AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string());

        if jwk.kty != "RSA" {
            tracing::warn!(target: "drinks.auth.jwt", kid = %jwk.kid, kty = %jwk.kty, "Unexpected JWK key type");
            return Err(unusable());
        }
        if let Some(key_use) = &jwk.key_use {
            if key_use != "sig" {
                tracing::warn!(target: "drinks.auth.jwt", kid = %jwk.kid, key_use = %key_use, "JWK is not a signing key");
                return Err(unusable());
            }
        }
        if let Some(alg) = &jwk.alg {
            let allowed = alg
                .parse::<Algorithm>()
                .is_ok_and(|a| self.settings.algorithms.contains(&a));
            if !allowed {
                tracing::warn!(target: "drinks.auth.jwt", kid = %jwk.kid, alg = %alg, "JWK algorithm not allowed");
                return Err(unusable());
            }
        }

        let (n, e) = match (&jwk.n, &jwk.e) {
            (Some(n), Some(e)) => (n, e),
            _ => {
                tracing::error!(target: "drinks.auth.jwt", kid = %jwk.kid, "JWK missing modulus or exponent");
                return Err(unusable());
            }
        };

        DecodingKey::from_rsa_components(n, e).map_err(|e| {
            tracing::error!(target: "drinks.auth.jwt", error = %e, "Invalid RSA key components");
            unusable()
        })
    }
}

/// Map a jsonwebtoken failure onto the auth taxonomy.
fn map_decode_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
        other => {
            tracing::debug!(target: "drinks.auth.jwt", error = ?other, "Token verification failed");
            AuthError::InvalidHeader(UNPARSEABLE_TOKEN.to_string())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use std::time::Duration;

    fn settings() -> VerifierSettings {
        VerifierSettings {
            audience: "http://localhost:5000".to_string(),
            issuer: "https://dev-test.us.auth0.com/".to_string(),
            algorithms: vec![Algorithm::RS256],
            leeway_seconds: 0,
        }
    }

    /// Verifier whose key set is unreachable; any test that gets past the
    /// header checks fails with KeySetUnavailable.
    fn offline_verifier() -> JwtVerifier {
        let jwks = Arc::new(JwksClient::new(
            "http://127.0.0.1:9/.well-known/jwks.json".to_string(),
            Duration::from_millis(200),
            Duration::from_secs(300),
        ));
        JwtVerifier::new(jwks, settings())
    }

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            br#"{"iss":"https://dev-test.us.auth0.com/","aud":"http://localhost:5000","exp":9999999999,"permissions":[]}"#,
        );
        format!("{}.{}.c2lnbmF0dXJl", header_b64, payload_b64)
    }

    fn rsa_jwk() -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: "test-key".to_string(),
            key_use: Some("sig".to_string()),
            n: Some("rc8APmDNIBMSg0lnsCG_xc1hYpTxd5_ip1EluNed4Y6l_2J5HV5l22AOm2rpHWWrKZ4BMKLblZYSsMsP-gMzVtFSY653BV5sHqv6kRvbc1koa0eyi5gfo9mWY1vbPxAMbP915j-h-kSZ7HFsAmjPHV9diJN7TWicgoL_klnxlelnPk7qGC8SpSU1JzSrG0PTyRbWXdz0OoMxg0LFzbyI54TmpHzjyjacL6zsQi8eyGIZ-H-3E9obt9fBabAvWoV4R46STpNFf5zLuUjkBz19grEh6_2r-QhcAwjY3mG-Z6aYAomPIf5mkRXMNcEJGSvU6H_ItY06FPIH7J0zLf_wJw".to_string()),
            e: Some("AQAB".to_string()),
            alg: Some("RS256".to_string()),
        }
    }

    #[tokio::test]
    async fn test_oversized_token_rejected_before_parsing() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

        let err = offline_verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidHeader(_)));
    }

    #[tokio::test]
    async fn test_garbage_token_is_invalid_header() {
        for token in ["", "single", "only.two", "!!!.payload.sig"] {
            let err = offline_verifier().verify(token).await.unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidHeader(_)),
                "{:?} -> {:?}",
                token,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_missing_kid_is_invalid_header() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);

        let err = offline_verifier().verify(&token).await.unwrap_err();
        assert_eq!(
            err,
            AuthError::InvalidHeader("Authorization malformed.".to_string())
        );
    }

    #[tokio::test]
    async fn test_empty_kid_is_invalid_header() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":""}"#);

        let err = offline_verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidHeader(_)));
    }

    #[tokio::test]
    async fn test_none_algorithm_rejected_without_key_lookup() {
        let token = token_with_header(r#"{"alg":"none","typ":"JWT","kid":"test-key"}"#);

        // An offline key set would yield KeySetUnavailable if a lookup happened.
        let err = offline_verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidHeader(_)));
    }

    #[tokio::test]
    async fn test_hmac_algorithm_rejected_without_key_lookup() {
        for alg in ["HS256", "HS512", "ES256", "PS256", "RS384"] {
            let token = token_with_header(&format!(
                r#"{{"alg":"{}","typ":"JWT","kid":"test-key"}}"#,
                alg
            ));

            let err = offline_verifier().verify(&token).await.unwrap_err();
            assert!(
                matches!(err, AuthError::InvalidHeader(_)),
                "{} should be rejected, got {:?}",
                alg,
                err
            );
        }
    }

    #[tokio::test]
    async fn test_allowed_header_reaches_key_lookup() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"test-key"}"#);

        let err = offline_verifier().verify(&token).await.unwrap_err();
        assert_eq!(err, AuthError::KeySetUnavailable);
    }

    #[test]
    fn test_decoding_key_rejects_non_rsa_key() {
        let mut jwk = rsa_jwk();
        jwk.kty = "OKP".to_string();

        assert!(offline_verifier().decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_rejects_encryption_key() {
        let mut jwk = rsa_jwk();
        jwk.key_use = Some("enc".to_string());

        assert!(offline_verifier().decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_rejects_disallowed_jwk_alg() {
        let mut jwk = rsa_jwk();
        jwk.alg = Some("RS512".to_string());

        assert!(offline_verifier().decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_rejects_missing_components() {
        let mut jwk = rsa_jwk();
        jwk.n = None;
        assert!(offline_verifier().decoding_key(&jwk).is_err());

        let mut jwk = rsa_jwk();
        jwk.e = None;
        assert!(offline_verifier().decoding_key(&jwk).is_err());
    }

    #[test]
    fn test_decoding_key_accepts_rsa_signing_key() {
        assert!(offline_verifier().decoding_key(&rsa_jwk()).is_ok());

        let mut jwk = rsa_jwk();
        jwk.alg = None;
        jwk.key_use = None;
        assert!(offline_verifier().decoding_key(&jwk).is_ok());
    }

    #[test]
    fn test_bad_signature_is_invalid_header() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"test-key"}"#);

        let err = offline_verifier()
            .verify_with_key(&token, Algorithm::RS256, &rsa_jwk())
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidHeader(_)));
    }

    #[test]
    fn test_map_decode_error() {
        assert_eq!(
            map_decode_error(&ErrorKind::ExpiredSignature),
            AuthError::ExpiredToken
        );
        assert_eq!(
            map_decode_error(&ErrorKind::InvalidAudience),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_decode_error(&ErrorKind::InvalidIssuer),
            AuthError::InvalidClaims
        );
        assert_eq!(
            map_decode_error(&ErrorKind::MissingRequiredClaim("aud".to_string())),
            AuthError::InvalidClaims
        );
        assert!(matches!(
            map_decode_error(&ErrorKind::InvalidSignature),
            AuthError::InvalidHeader(_)
        ));
        assert!(matches!(
            map_decode_error(&ErrorKind::InvalidAlgorithm),
            AuthError::InvalidHeader(_)
        ));
    }
}
