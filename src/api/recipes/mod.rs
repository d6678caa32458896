pub mod create;
pub mod delete;
pub mod form;
pub mod get;
pub mod list;
pub mod update;

use crate::error::AppError;
use crate::uploads::{MAX_FILE_SIZE, MAX_UPLOADS};
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;

/// Largest request body: a full set of uploads plus room for the text fields.
const MAX_REQUEST_SIZE: usize = MAX_UPLOADS * MAX_FILE_SIZE + 1024 * 1024;

/// Returns the router for /api/recipes endpoints (mounted at /api/recipes)
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list::list_recipes)
                .post(create::create_recipe)
                .delete(delete::delete_all_recipes),
        )
        .route(
            "/{id}",
            get(get::get_recipe)
                .put(update::update_recipe)
                .delete(delete::delete_recipe),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
}

/// Recipe ids are positive integers; anything else cannot match a recipe.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| AppError::NotFound)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        create::create_recipe,
        list::list_recipes,
        get::get_recipe,
        update::update_recipe,
        delete::delete_recipe,
        delete::delete_all_recipes,
    ),
    components(schemas(
        crate::models::Recipe,
        create::RecipeResponse,
        form::RecipeBody,
        form::RecipeUpload,
        delete::DeleteRecipeResponse,
        delete::DeleteAllRecipesResponse,
    ))
)]
pub struct ApiDoc;
