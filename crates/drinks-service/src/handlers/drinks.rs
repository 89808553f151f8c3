//! Drinks handlers.
//!
//! `GET /drinks` is public. Every other route runs behind
//! [`require_permission`](crate::middleware::require_permission), which puts
//! the verified [`Claims`] into request extensions before the handler runs.

use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{
    CreateDrinkRequest, DeleteResponse, DrinkLong, DrinkShort, DrinksResponse,
    UpdateDrinkRequest,
};
use crate::routes::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /drinks
///
/// Lists every drink in the short view.
#[instrument(skip_all, name = "drinks.handlers.get_drinks")]
pub async fn get_drinks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<DrinkShort>>, ApiError> {
    let drinks = state.repository.list().await?;

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(|d| d.short()).collect(),
    )))
}

/// Handler for GET /drinks-detail
///
/// Lists every drink in the long view. Requires `get:drinks-detail`.
#[instrument(skip_all, name = "drinks.handlers.get_drinks_detail")]
pub async fn get_drinks_detail(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DrinksResponse<DrinkLong>>, ApiError> {
    let drinks = state.repository.list().await?;

    Ok(Json(DrinksResponse::new(
        drinks.iter().map(|d| d.long()).collect(),
    )))
}

/// Handler for POST /drinks
///
/// Requires `post:drinks`. Responds with the created drink as a one-element
/// list in the long view.
#[instrument(skip_all, name = "drinks.handlers.create_drink")]
pub async fn create_drink(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, ApiError> {
    let Json(request) = body.map_err(unprocessable_body)?;
    let new_drink = request.validate()?;

    let created = state.repository.create(new_drink).await?;

    tracing::info!(
        target: "drinks.handlers.drinks",
        drink_id = created.id,
        permissions = ?claims.permissions,
        "Drink created"
    );

    Ok(Json(DrinksResponse::new(vec![created.long()])))
}

/// Handler for PATCH /drinks/:id
///
/// Requires `patch:drinks`. Title and recipe are both optional but at least
/// one must be present.
#[instrument(skip_all, name = "drinks.handlers.update_drink")]
pub async fn update_drink(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
    body: Result<Json<UpdateDrinkRequest>, JsonRejection>,
) -> Result<Json<DrinksResponse<DrinkLong>>, ApiError> {
    let id = drink_id(id)?;
    let Json(request) = body.map_err(unprocessable_body)?;
    let patch = request.validate()?;

    let updated = state
        .repository
        .update(id, patch)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(
        target: "drinks.handlers.drinks",
        drink_id = id,
        permissions = ?claims.permissions,
        "Drink updated"
    );

    Ok(Json(DrinksResponse::new(vec![updated.long()])))
}

/// Handler for DELETE /drinks/:id
///
/// Requires `delete:drinks`.
#[instrument(skip_all, name = "drinks.handlers.delete_drink")]
pub async fn delete_drink(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = drink_id(id)?;

    if !state.repository.delete(id).await? {
        return Err(not_found(id));
    }

    tracing::info!(
        target: "drinks.handlers.drinks",
        drink_id = id,
        permissions = ?claims.permissions,
        "Drink deleted"
    );

    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}

/// Non-integer ids name no drink.
fn drink_id(id: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("Drink not found".to_string()))
}

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Drink {} not found", id))
}

fn unprocessable_body(rejection: JsonRejection) -> ApiError {
    tracing::debug!(target: "drinks.handlers.drinks", error = %rejection, "Rejected request body");
    ApiError::Unprocessable(rejection.body_text())
}
