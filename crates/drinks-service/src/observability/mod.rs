//! Observability for the drinks service.
//!
//! Provides metrics definitions and the Prometheus recorder setup.

pub mod metrics;
