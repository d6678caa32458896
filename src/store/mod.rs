//! Persistence for recipes and the id counters that number them.
//!
//! Two backends implement the traits here: [`PgStore`] for production and
//! [`MemoryStore`] for tests and local development (`DATABASE_URL=memory:`).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{NewRecipe, Recipe, RecipeChanges, UpdatedRecipe};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Counter that numbers recipes.
pub const RECIPE_COUNTER: &str = "recetaId";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Recipe id {0} already exists")]
    DuplicateId(i64),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Issues unique, monotonically increasing integers per counter name.
#[async_trait]
pub trait IdAllocator: Send + Sync + fmt::Debug {
    /// Atomically increment `name` and return the new value.
    ///
    /// A counter that does not exist yet is created, so the first call yields 1.
    async fn next(&self, name: &str) -> Result<i64, StoreError>;
}

/// Recipe records keyed by their allocated id.
#[async_trait]
pub trait RecipeStore: Send + Sync + fmt::Debug {
    /// Insert a new recipe. Fails with [`StoreError::DuplicateId`] if the id is taken.
    async fn create(&self, recipe: NewRecipe) -> Result<Recipe, StoreError>;

    /// All recipes, ordered by id.
    async fn list_all(&self) -> Result<Vec<Recipe>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Recipe>, StoreError>;

    /// Replace the editable fields of recipe `id`. Returns `None` if it does not exist.
    async fn update_by_id(
        &self,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<UpdatedRecipe>, StoreError>;

    /// Remove recipe `id`, returning the removed row.
    async fn delete_by_id(&self, id: i64) -> Result<Option<Recipe>, StoreError>;

    /// Remove every recipe, returning the removed rows.
    async fn delete_all(&self) -> Result<Vec<Recipe>, StoreError>;
}
