use super::create::RecipeResponse;
use super::form::{RecipeBody, RecipeForm, RecipeInput, RecipeUpload};
use super::parse_id;
use crate::api::ErrorResponse;
use crate::error::AppError;
use crate::models::RecipeChanges;
use crate::uploads::StoredImages;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

#[utoipa::path(
    put,
    path = "/api/recipes/{id}",
    tag = "recipes",
    params(
        ("id" = i64, Path, description = "Recipe ID")
    ),
    request_body(content(
        (RecipeUpload = "multipart/form-data"),
        (RecipeBody = "application/json"),
        (RecipeBody = "application/x-www-form-urlencoded")
    )),
    responses(
        (status = 200, description = "Recipe updated successfully", body = RecipeResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Recipe not found", body = ErrorResponse),
        (status = 500, description = "Failed to update recipe", body = ErrorResponse)
    )
)]
pub async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: RecipeForm,
) -> Result<Json<RecipeResponse>, AppError> {
    let id = parse_id(&id)?;
    let input = form.for_update()?;

    // Check before writing any files for a recipe that does not exist.
    let existing = state
        .recipes
        .find_by_id(id)
        .await
        .map_err(|e| AppError::store("Failed to fetch recipe", e))?
        .ok_or(AppError::NotFound)?;
    input.check_image_urls(&state.uploads, &existing.images)?;

    let RecipeInput {
        title,
        author,
        ingredients,
        steps,
        images,
    } = input;

    let replace_images = !images.is_empty();
    let StoredImages { paths, written } = state
        .uploads
        .store(images)
        .await
        .map_err(|e| AppError::upload("Failed to save images", e))?;

    let changes = RecipeChanges {
        title,
        author,
        ingredients,
        steps,
        images: replace_images.then_some(paths),
    };

    let updated = match state.recipes.update_by_id(id, changes).await {
        Ok(Some(updated)) => updated,
        Ok(None) => {
            state.uploads.release_images(&written).await;
            return Err(AppError::NotFound);
        }
        Err(e) => {
            state.uploads.release_images(&written).await;
            return Err(AppError::store("Failed to update recipe", e));
        }
    };

    let stale = updated.stale_images();
    let removed = state.uploads.release_images(&stale).await;
    tracing::info!(recipe_id = id, removed_images = removed, "updated recipe");

    Ok(Json(RecipeResponse {
        message: "Recipe updated".to_string(),
        recipe: updated.recipe,
    }))
}
