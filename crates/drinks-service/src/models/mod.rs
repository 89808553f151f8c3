//! Data models for the drinks service.
//!
//! A drink is a title plus a recipe (ordered ingredient list). The recipe is
//! stored as JSON text and exposed in two views:
//!
//! - short: ingredient colors and parts only (public listing)
//! - long: full ingredients including names (requires a permission)

use crate::errors::ApiError;
use serde::{Deserialize, Serialize};

/// Maximum length of a drink title, in characters.
pub const MAX_TITLE_LENGTH: usize = 80;

/// One recipe entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: i32,
}

/// Recipe entry without its name, used by the public listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: i32,
}

/// A stored drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Public view of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrinkShort {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

/// Detailed view of a drink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrinkLong {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|i| ShortIngredient {
                    color: i.color.clone(),
                    parts: i.parts,
                })
                .collect(),
        }
    }

    pub fn long(&self) -> DrinkLong {
        DrinkLong {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        }
    }
}

/// Validated input for creating a drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Validated partial update. At least one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrinkPatch {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

/// A request recipe: a single ingredient object or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    One(Ingredient),
    Many(Vec<Ingredient>),
}

impl RecipeInput {
    fn into_vec(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::One(ingredient) => vec![ingredient],
            RecipeInput::Many(ingredients) => ingredients,
        }
    }
}

/// Body of `POST /drinks`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

/// Body of `PATCH /drinks/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDrinkRequest {
    pub title: Option<String>,
    pub recipe: Option<RecipeInput>,
}

impl CreateDrinkRequest {
    /// Validate into a [`NewDrink`].
    ///
    /// # Errors
    ///
    /// `Unprocessable` if the title or recipe is missing or invalid.
    pub fn validate(self) -> Result<NewDrink, ApiError> {
        let title = self
            .title
            .ok_or_else(|| ApiError::Unprocessable("title is required".to_string()))?;
        let recipe = self
            .recipe
            .ok_or_else(|| ApiError::Unprocessable("recipe is required".to_string()))?;

        Ok(NewDrink {
            title: validate_title(&title)?,
            recipe: validate_recipe(recipe.into_vec())?,
        })
    }
}

impl UpdateDrinkRequest {
    /// Validate into a [`DrinkPatch`].
    ///
    /// # Errors
    ///
    /// `Unprocessable` if neither field is present or a present field is invalid.
    pub fn validate(self) -> Result<DrinkPatch, ApiError> {
        if self.title.is_none() && self.recipe.is_none() {
            return Err(ApiError::Unprocessable(
                "title or recipe is required".to_string(),
            ));
        }

        let title = self.title.as_deref().map(validate_title).transpose()?;
        let recipe = self
            .recipe
            .map(|r| validate_recipe(r.into_vec()))
            .transpose()?;

        Ok(DrinkPatch { title, recipe })
    }
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::Unprocessable(
            "title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::Unprocessable(format!(
            "title must be at most {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(title.to_string())
}

fn validate_recipe(recipe: Vec<Ingredient>) -> Result<Vec<Ingredient>, ApiError> {
    if recipe.is_empty() {
        return Err(ApiError::Unprocessable(
            "recipe must contain at least one ingredient".to_string(),
        ));
    }
    for ingredient in &recipe {
        if ingredient.name.trim().is_empty() || ingredient.color.trim().is_empty() {
            return Err(ApiError::Unprocessable(
                "ingredient name and color must not be empty".to_string(),
            ));
        }
        if ingredient.parts <= 0 {
            return Err(ApiError::Unprocessable(
                "ingredient parts must be positive".to_string(),
            ));
        }
    }
    Ok(recipe)
}

/// Response for `GET /drinks` and `GET /drinks-detail`, and for single-drink
/// mutations (which return a one-element list).
#[derive(Debug, Serialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// Response for `DELETE /drinks/:id`.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i32,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status ("healthy" or "unhealthy").
    pub status: String,

    /// Database status.
    pub database: String,
}
