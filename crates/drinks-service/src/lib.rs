//! Drinks Service Library
//!
//! A drinks catalog HTTP API. Reads of the short listing are public; every
//! other operation requires a bearer token issued by an external identity
//! provider and carrying the matching permission.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> repositories/*.rs
//!                        |
//!                  auth::AuthGate
//!          (extractor -> jwt + jwks -> permissions)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token extraction, JWKS cache, JWT verification, permission checks
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Permission guard and HTTP metrics middleware
//! - `models` - Drink model, views and request validation
//! - `observability` - Metrics definitions
//! - `repositories` - Drink storage
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
