//! Postgres-backed drink repository.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//! - Recipe contents are not logged

use crate::errors::ApiError;
use crate::models::{Drink, DrinkPatch, Ingredient, NewDrink};
use crate::observability::metrics;
use crate::repositories::DrinkRepository;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Drink repository over a Postgres pool.
#[derive(Clone)]
pub struct PgDrinkRepository {
    pool: PgPool,
}

impl PgDrinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Remove every drink, restart ids and insert the starter drink.
    ///
    /// Destroys all data. Only run when explicitly requested at startup.
    #[instrument(skip_all)]
    pub async fn reset_and_seed(&self) -> Result<(), ApiError> {
        let start = Instant::now();

        let result = async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("TRUNCATE TABLE drinks RESTART IDENTITY")
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
                .bind("water")
                .bind(r#"[{"name": "water", "color": "blue", "parts": 1}]"#)
                .execute(&mut *tx)
                .await?;
            tx.commit().await
        }
        .await;

        metrics::record_db_query("reset_and_seed", status_of(&result), start.elapsed());
        result?;

        tracing::warn!(target: "drinks.repository", "Drinks table reset and seeded");

        Ok(())
    }
}

fn status_of<T>(result: &Result<T, sqlx::Error>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "error"
    }
}

fn drink_from_row(row: &PgRow) -> Result<Drink, ApiError> {
    let recipe: String = row.try_get("recipe")?;
    let recipe: Vec<Ingredient> = serde_json::from_str(&recipe)?;

    Ok(Drink {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        recipe,
    })
}

#[async_trait::async_trait]
impl DrinkRepository for PgDrinkRepository {
    #[instrument(skip_all)]
    async fn ping(&self) -> Result<(), ApiError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT 1").execute(&self.pool).await;
        metrics::record_db_query("ping", status_of(&result), start.elapsed());

        result?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn list(&self) -> Result<Vec<Drink>, ApiError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await;
        metrics::record_db_query("list_drinks", status_of(&result), start.elapsed());

        result?.iter().map(drink_from_row).collect()
    }

    #[instrument(skip_all, fields(drink_id = id))]
    async fn get(&self, id: i32) -> Result<Option<Drink>, ApiError> {
        let start = Instant::now();
        let result = sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        metrics::record_db_query("get_drink", status_of(&result), start.elapsed());

        result?.as_ref().map(drink_from_row).transpose()
    }

    #[instrument(skip_all)]
    async fn create(&self, drink: NewDrink) -> Result<Drink, ApiError> {
        let recipe = serde_json::to_string(&drink.recipe)?;

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO drinks (title, recipe)
            VALUES ($1, $2)
            RETURNING id, title, recipe
            "#,
        )
        .bind(&drink.title)
        .bind(&recipe)
        .fetch_one(&self.pool)
        .await;
        metrics::record_db_query("create_drink", status_of(&result), start.elapsed());

        let created = drink_from_row(&result?)?;

        tracing::info!(target: "drinks.repository", drink_id = created.id, "Drink created");

        Ok(created)
    }

    #[instrument(skip_all, fields(drink_id = id))]
    async fn update(&self, id: i32, patch: DrinkPatch) -> Result<Option<Drink>, ApiError> {
        let recipe = patch
            .recipe
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let start = Instant::now();
        let result = sqlx::query(
            r#"
            UPDATE drinks
            SET
                title = COALESCE($2, title),
                recipe = COALESCE($3, recipe)
            WHERE id = $1
            RETURNING id, title, recipe
            "#,
        )
        .bind(id)
        .bind(patch.title.as_deref())
        .bind(recipe.as_deref())
        .fetch_optional(&self.pool)
        .await;
        metrics::record_db_query("update_drink", status_of(&result), start.elapsed());

        let updated = result?.as_ref().map(drink_from_row).transpose()?;

        if updated.is_some() {
            tracing::info!(target: "drinks.repository", drink_id = id, "Drink updated");
        }

        Ok(updated)
    }

    #[instrument(skip_all, fields(drink_id = id))]
    async fn delete(&self, id: i32) -> Result<bool, ApiError> {
        let start = Instant::now();
        let result = sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        metrics::record_db_query("delete_drink", status_of(&result), start.elapsed());

        let deleted = result?.rows_affected() > 0;

        if deleted {
            tracing::info!(target: "drinks.repository", drink_id = id, "Drink deleted");
        }

        Ok(deleted)
    }
}
