use super::parse_id;
use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteRecipeResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeleteAllRecipesResponse {
    pub message: String,
    /// Number of recipes removed
    pub deleted: usize,
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe deleted successfully", body = DeleteRecipeResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Failed to delete recipe", body = ErrorResponse)
    )
)]
pub async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteRecipeResponse>, AppError> {
    let id = parse_id(&id)?;

    let recipe = state
        .recipes
        .delete_by_id(id)
        .await
        .map_err(|e| AppError::store("Failed to delete recipe", e))?
        .ok_or(AppError::NotFound)?;

    let removed = state.uploads.release_images(&recipe.images).await;
    tracing::info!(recipe_id = id, removed_images = removed, "deleted recipe");

    Ok(Json(DeleteRecipeResponse {
        message: "Recipe deleted".to_string(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/recipes",
    tag = "recipes",
    responses(
        (status = 200, description = "All recipes deleted", body = DeleteAllRecipesResponse),
        (status = 500, description = "Failed to delete recipes", body = ErrorResponse)
    )
)]
pub async fn delete_all_recipes(
    State(state): State<AppState>,
) -> Result<Json<DeleteAllRecipesResponse>, AppError> {
    let recipes = state
        .recipes
        .delete_all()
        .await
        .map_err(|e| AppError::store("Failed to delete recipes", e))?;

    let images: Vec<String> = recipes
        .iter()
        .flat_map(|recipe| recipe.images.iter().cloned())
        .collect();
    let removed = state.uploads.release_images(&images).await;
    tracing::info!(
        deleted = recipes.len(),
        removed_images = removed,
        "deleted all recipes"
    );

    Ok(Json(DeleteAllRecipesResponse {
        message: "All recipes deleted".to_string(),
        deleted: recipes.len(),
    }))
}
