//! # Drinks Test Utilities
//!
//! Shared test utilities for the drinks service.
//!
//! This crate provides:
//! - Deterministic RSA key fixtures with their JWK forms
//! - Test token builder (`TestTokenBuilder`)
//! - Mock identity provider JWKS endpoint (`MockJwks`)
//! - Server test harness (`TestDrinksServer`) and router builder
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drinks_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let jwks = MockJwks::start_default().await;
//!     let server = TestDrinksServer::spawn(&jwks.jwks_url()).await?;
//!
//!     let token = TestTokenBuilder::new()
//!         .with_permissions(&["get:drinks-detail"])
//!         .sign(&TestKey::primary());
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/drinks-detail", server.url()))
//!         .header("Authorization", bearer(&token))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
