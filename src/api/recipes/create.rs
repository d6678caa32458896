use super::form::{RecipeBody, RecipeForm, RecipeInput, RecipeUpload};
use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::{NewRecipe, Recipe};
use crate::store::RECIPE_COUNTER;
use crate::uploads::StoredImages;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub message: String,
    pub recipe: Recipe,
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    tag = "recipes",
    request_body(content(
        (RecipeUpload = "multipart/form-data"),
        (RecipeBody = "application/json"),
        (RecipeBody = "application/x-www-form-urlencoded")
    )),
    responses(
        (status = 200, description = "Recipe created successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 500, description = "Failed to create recipe", body = ErrorResponse)
    )
)]
pub async fn create_recipe(
    State(state): State<AppState>,
    form: RecipeForm,
) -> Result<Json<RecipeResponse>, AppError> {
    let input = form.for_create()?;
    input.check_image_urls(&state.uploads, &[])?;
    let RecipeInput {
        title,
        author,
        ingredients,
        steps,
        images,
    } = input;

    let StoredImages { paths, written } = state
        .uploads
        .store(images)
        .await
        .map_err(|e| AppError::upload("Failed to save images", e))?;

    let new_recipe = |id| NewRecipe {
        id,
        title,
        author,
        ingredients,
        steps,
        images: paths,
    };

    match insert_recipe(&state, new_recipe).await {
        Ok(recipe) => {
            tracing::info!(recipe_id = recipe.id, images = recipe.images.len(), "created recipe");
            Ok(Json(RecipeResponse {
                message: "Recipe created".to_string(),
                recipe,
            }))
        }
        Err(e) => {
            // The row was never written, so the files would be orphans.
            state.uploads.release_images(&written).await;
            Err(e)
        }
    }
}

async fn insert_recipe(
    state: &AppState,
    new_recipe: impl FnOnce(i64) -> NewRecipe,
) -> Result<Recipe, AppError> {
    let id = state
        .allocator
        .next(RECIPE_COUNTER)
        .await
        .map_err(|e| AppError::store("Failed to generate recipe id", e))?;
    if id < 1 {
        return Err(AppError::IdAllocation);
    }

    state
        .recipes
        .create(new_recipe(id))
        .await
        .map_err(|e| AppError::store("Failed to create recipe", e))
}
