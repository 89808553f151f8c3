//! In-memory drink repository for tests.

use crate::errors::ApiError;
use crate::models::{Drink, DrinkPatch, Ingredient, NewDrink};
use crate::repositories::DrinkRepository;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    next_id: i32,
    drinks: BTreeMap<i32, Drink>,
}

/// Drink repository held in memory.
///
/// Enforces the same unique-title rule as the Postgres table. Can be
/// switched to "unavailable" to simulate a database outage.
#[derive(Default)]
pub struct InMemoryDrinkRepository {
    store: RwLock<Store>,
    unavailable: AtomicBool,
}

impl InMemoryDrinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with the starter drink (id 1, "water").
    pub fn seeded() -> Self {
        let mut store = Store {
            next_id: 1,
            drinks: BTreeMap::new(),
        };
        store.drinks.insert(
            1,
            Drink {
                id: 1,
                title: "water".to_string(),
                recipe: vec![Ingredient {
                    name: "water".to_string(),
                    color: "blue".to_string(),
                    parts: 1,
                }],
            },
        );
        Self {
            store: RwLock::new(store),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), ApiError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ApiError::Database("in-memory store unavailable".to_string()));
        }
        Ok(())
    }
}

fn title_taken(store: &Store, title: &str, except: Option<i32>) -> bool {
    store
        .drinks
        .values()
        .any(|d| d.title == title && Some(d.id) != except)
}

fn conflict() -> ApiError {
    ApiError::Conflict("A drink with that title already exists".to_string())
}

#[async_trait::async_trait]
impl DrinkRepository for InMemoryDrinkRepository {
    async fn ping(&self) -> Result<(), ApiError> {
        self.check_available()
    }

    async fn list(&self) -> Result<Vec<Drink>, ApiError> {
        self.check_available()?;
        Ok(self.store.read().await.drinks.values().cloned().collect())
    }

    async fn get(&self, id: i32) -> Result<Option<Drink>, ApiError> {
        self.check_available()?;
        Ok(self.store.read().await.drinks.get(&id).cloned())
    }

    async fn create(&self, drink: NewDrink) -> Result<Drink, ApiError> {
        self.check_available()?;
        let mut store = self.store.write().await;

        if title_taken(&store, &drink.title, None) {
            return Err(conflict());
        }

        store.next_id += 1;
        let created = Drink {
            id: store.next_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        store.drinks.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, id: i32, patch: DrinkPatch) -> Result<Option<Drink>, ApiError> {
        self.check_available()?;
        let mut store = self.store.write().await;

        if let Some(title) = &patch.title {
            if title_taken(&store, title, Some(id)) {
                return Err(conflict());
            }
        }

        let Some(drink) = store.drinks.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            drink.title = title;
        }
        if let Some(recipe) = patch.recipe {
            drink.recipe = recipe;
        }

        Ok(Some(drink.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool, ApiError> {
        self.check_available()?;
        Ok(self.store.write().await.drinks.remove(&id).is_some())
    }
}
