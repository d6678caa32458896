use super::parse_id;
use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::Recipe;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    responses(
        (status = 200, description = "Recipe details", body = Recipe),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Failed to fetch recipe", body = ErrorResponse)
    )
)]
pub async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, AppError> {
    let id = parse_id(&id)?;

    state
        .recipes
        .find_by_id(id)
        .await
        .map_err(|e| AppError::store("Failed to fetch recipe", e))?
        .map(Json)
        .ok_or(AppError::NotFound)
}
