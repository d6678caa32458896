use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::Recipe;
use crate::AppState;
use axum::{extract::State, Json};

#[utoipa::path(
    get,
    path = "/api/recipes",
    tag = "recipes",
    responses(
        (status = 200, description = "All recipes, oldest first", body = Vec<Recipe>),
        (status = 500, description = "Failed to fetch recipes", body = ErrorResponse)
    )
)]
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    let recipes = state
        .recipes
        .list_all()
        .await
        .map_err(|e| AppError::store("Failed to fetch recipes", e))?;

    Ok(Json(recipes))
}
