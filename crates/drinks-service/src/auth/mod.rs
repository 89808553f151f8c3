//! Authorization pipeline for the drinks API.
//!
//! Tokens are issued by an external identity provider and verified against
//! its published JWKS.
//!
//! # Components
//!
//! - `extractor` - Bearer token extraction from the `Authorization` header
//! - `jwks` - JWKS client with an owned, TTL-bounded key cache
//! - `jwt` - Signature and standard-claim verification
//! - `claims` - Verified claims structure
//! - `permissions` - Required-permission check
//! - `gate` - Composition of the above into a single guard

pub mod claims;
pub mod extractor;
pub mod gate;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::{Audience, Claims};
pub use extractor::{bearer_token_from_headers, extract_bearer_token};
pub use gate::{AuthGate, AuthStage};
pub use jwks::{Jwk, JwksClient};
pub use jwt::{JwtVerifier, VerifierSettings};
pub use permissions::check_permission;
