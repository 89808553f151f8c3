//! Repository layer for the drinks service.
//!
//! Handlers depend on the [`DrinkRepository`] trait; the Postgres
//! implementation backs production and the in-memory one backs tests.

pub mod drinks;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use crate::errors::ApiError;
use crate::models::{Drink, DrinkPatch, NewDrink};

pub use drinks::PgDrinkRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryDrinkRepository;

/// Storage for drinks.
///
/// Not-found is reported as `None`/`false`, distinct from storage failures.
#[async_trait::async_trait]
pub trait DrinkRepository: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), ApiError>;

    /// All drinks ordered by id.
    async fn list(&self) -> Result<Vec<Drink>, ApiError>;

    async fn get(&self, id: i32) -> Result<Option<Drink>, ApiError>;

    /// Insert a drink. A duplicate title is a `Conflict`.
    async fn create(&self, drink: NewDrink) -> Result<Drink, ApiError>;

    /// Apply `patch` to drink `id`, returning the updated drink or `None`
    /// if it does not exist.
    async fn update(&self, id: i32, patch: DrinkPatch) -> Result<Option<Drink>, ApiError>;

    /// Delete drink `id`. Returns `false` if it did not exist.
    async fn delete(&self, id: i32) -> Result<bool, ApiError>;
}
