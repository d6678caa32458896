use super::{IdAllocator, RecipeStore, StoreError};
use crate::db::DbPool;
use crate::models::{NewCounter, NewRecipe, Recipe, RecipeChanges, UpdatedRecipe};
use crate::schema::{counters, recipes};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::query_builder::QueryFragment;
use diesel::query_dsl::LoadQuery;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::fmt;

/// Postgres-backed store. Diesel is synchronous, so every query runs on
/// tokio's blocking pool with a connection checked out of the r2d2 pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl fmt::Debug for PgStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgStore")
            .field("connections", &self.pool.state().connections)
            .finish()
    }
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            query(&mut *conn)
        })
        .await?
    }
}

/// Create counter `name` at 1 or bump it, returning the new value.
/// Single statement: concurrent callers serialize on the row lock.
fn increment_counter<'a>(
    name: &'a str,
) -> impl LoadQuery<'a, PgConnection, i64> + QueryFragment<Pg> + 'a {
    diesel::insert_into(counters::table)
        .values(NewCounter { name, seq: 1 })
        .on_conflict(counters::name)
        .do_update()
        .set(counters::seq.eq(counters::seq + 1))
        .returning(counters::seq)
}

/// Current images of recipe `id`, locking the row until the transaction ends.
fn lock_recipe_images(
    id: i64,
) -> impl LoadQuery<'static, PgConnection, Vec<String>> + QueryFragment<Pg> {
    recipes::table
        .filter(recipes::id.eq(id))
        .select(recipes::images)
        .for_update()
}

#[async_trait]
impl IdAllocator for PgStore {
    async fn next(&self, name: &str) -> Result<i64, StoreError> {
        let name = name.to_owned();
        self.run(move |conn| Ok(increment_counter(&name).get_result::<i64>(conn)?))
            .await
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn create(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        self.run(move |conn| {
            let id = recipe.id;
            diesel::insert_into(recipes::table)
                .values(recipe)
                .returning(Recipe::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateId(id)
                    }
                    other => other.into(),
                })
        })
        .await
    }

    async fn list_all(&self) -> Result<Vec<Recipe>, StoreError> {
        self.run(|conn| {
            Ok(recipes::table
                .order(recipes::id.asc())
                .select(Recipe::as_select())
                .load(conn)?)
        })
        .await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        self.run(move |conn| {
            Ok(recipes::table
                .filter(recipes::id.eq(id))
                .select(Recipe::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn update_by_id(
        &self,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<UpdatedRecipe>, StoreError> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let previous: Option<Vec<String>> =
                    lock_recipe_images(id).get_result(conn).optional()?;
                let Some(previous) = previous else {
                    return Ok(None);
                };

                let (images, replaced_images) = match changes.images {
                    Some(images) => (images, previous),
                    None => (previous, Vec::new()),
                };

                let recipe = diesel::update(recipes::table.filter(recipes::id.eq(id)))
                    .set((
                        recipes::title.eq(changes.title),
                        recipes::author.eq(changes.author),
                        recipes::ingredients.eq(changes.ingredients),
                        recipes::steps.eq(changes.steps),
                        recipes::images.eq(images),
                        recipes::updated_at.eq(Utc::now()),
                    ))
                    .returning(Recipe::as_returning())
                    .get_result(conn)?;

                Ok(Some(UpdatedRecipe {
                    recipe,
                    replaced_images,
                }))
            })
        })
        .await
    }

    async fn delete_by_id(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        self.run(move |conn| {
            Ok(diesel::delete(recipes::table.filter(recipes::id.eq(id)))
                .returning(Recipe::as_returning())
                .get_result(conn)
                .optional()?)
        })
        .await
    }

    async fn delete_all(&self) -> Result<Vec<Recipe>, StoreError> {
        self.run(|conn| {
            Ok(diesel::delete(recipes::table)
                .returning(Recipe::as_returning())
                .get_results(conn)?)
        })
        .await
    }
}
