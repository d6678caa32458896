use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

/// A persisted recipe. `id` comes from the `recetaId` counter and never changes.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    /// Upload paths (`uploads/<file>`) or external URLs, in display order.
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::recipes)]
pub struct NewRecipe {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub images: Vec<String>,
}

/// Wholesale replacement of a recipe's editable fields.
///
/// `images: None` keeps the stored images untouched.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub title: String,
    pub author: String,
    pub ingredients: Vec<String>,
    pub steps: Vec<String>,
    pub images: Option<Vec<String>>,
}

/// Result of an update: the new row plus the image list it replaced.
///
/// `replaced_images` is empty when the update kept the existing images.
#[derive(Debug, Clone)]
pub struct UpdatedRecipe {
    pub recipe: Recipe,
    pub replaced_images: Vec<String>,
}

impl UpdatedRecipe {
    /// Replaced images the updated recipe no longer references.
    pub fn stale_images(&self) -> Vec<String> {
        self.replaced_images
            .iter()
            .filter(|image| !self.recipe.images.contains(image))
            .cloned()
            .collect()
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::counters)]
pub struct NewCounter<'a> {
    pub name: &'a str,
    pub seq: i64,
}
