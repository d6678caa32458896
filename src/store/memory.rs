//! In-memory store used by the test suite and `DATABASE_URL=memory:`.
//!
//! Data is lost when the process exits.

use super::{IdAllocator, RecipeStore, StoreError};
use crate::models::{NewRecipe, Recipe, RecipeChanges, UpdatedRecipe};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: Mutex<HashMap<String, i64>>,
    recipes: RwLock<BTreeMap<i64, Recipe>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdAllocator for MemoryStore {
    async fn next(&self, name: &str) -> Result<i64, StoreError> {
        let mut counters = self.counters.lock();
        let seq = counters.entry(name.to_owned()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn create(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        let mut recipes = self.recipes.write();
        if recipes.contains_key(&recipe.id) {
            return Err(StoreError::DuplicateId(recipe.id));
        }

        let now = Utc::now();
        let row = Recipe {
            id: recipe.id,
            title: recipe.title,
            author: recipe.author,
            ingredients: recipe.ingredients,
            steps: recipe.steps,
            images: recipe.images,
            created_at: now,
            updated_at: now,
        };
        recipes.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_all(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.recipes.read().values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        Ok(self.recipes.read().get(&id).cloned())
    }

    async fn update_by_id(
        &self,
        id: i64,
        changes: RecipeChanges,
    ) -> Result<Option<UpdatedRecipe>, StoreError> {
        let mut recipes = self.recipes.write();
        let Some(row) = recipes.get_mut(&id) else {
            return Ok(None);
        };

        row.title = changes.title;
        row.author = changes.author;
        row.ingredients = changes.ingredients;
        row.steps = changes.steps;
        row.updated_at = Utc::now();
        let replaced_images = match changes.images {
            Some(images) => std::mem::replace(&mut row.images, images),
            None => Vec::new(),
        };

        Ok(Some(UpdatedRecipe {
            recipe: row.clone(),
            replaced_images,
        }))
    }

    async fn delete_by_id(&self, id: i64) -> Result<Option<Recipe>, StoreError> {
        Ok(self.recipes.write().remove(&id))
    }

    async fn delete_all(&self) -> Result<Vec<Recipe>, StoreError> {
        let removed = std::mem::take(&mut *self.recipes.write());
        Ok(removed.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RECIPE_COUNTER;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn new_recipe(id: i64) -> NewRecipe {
        NewRecipe {
            id,
            title: "Tortilla".to_string(),
            author: "Ana".to_string(),
            ingredients: vec!["egg".to_string(), "potato".to_string()],
            steps: vec!["fry".to_string(), "flip".to_string()],
            images: vec!["uploads/1-tortilla.jpg".to_string()],
        }
    }

    fn changes(images: Option<Vec<String>>) -> RecipeChanges {
        RecipeChanges {
            title: "Tortilla de patatas".to_string(),
            author: "Luis".to_string(),
            ingredients: vec!["egg".to_string()],
            steps: vec!["cook".to_string()],
            images,
        }
    }

    #[tokio::test]
    async fn test_first_allocation_is_one() {
        let store = MemoryStore::new();
        assert_eq!(store.next(RECIPE_COUNTER).await.unwrap(), 1);
        assert_eq!(store.next(RECIPE_COUNTER).await.unwrap(), 2);
        assert_eq!(store.next("other").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_unique() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.next(RECIPE_COUNTER).await.unwrap() })
            })
            .collect();

        let mut ids = BTreeSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids, (1..=64).collect::<BTreeSet<i64>>());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() {
        let store = MemoryStore::new();
        store.create(new_recipe(1)).await.unwrap();
        let err = store.create(new_recipe(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(1)));
    }

    #[tokio::test]
    async fn test_find_returns_created_fields() {
        let store = MemoryStore::new();
        store.create(new_recipe(7)).await.unwrap();

        let found = store.find_by_id(7).await.unwrap().unwrap();
        assert_eq!(found.id, 7);
        assert_eq!(found.ingredients, vec!["egg", "potato"]);
        assert_eq!(found.steps, vec!["fry", "flip"]);
        assert!(store.find_by_id(8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_does_not_create() {
        let store = MemoryStore::new();
        assert!(store.update_by_id(3, changes(None)).await.unwrap().is_none());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_images_when_none_supplied() {
        let store = MemoryStore::new();
        store.create(new_recipe(1)).await.unwrap();

        let updated = store.update_by_id(1, changes(None)).await.unwrap().unwrap();
        assert_eq!(updated.recipe.title, "Tortilla de patatas");
        assert_eq!(updated.recipe.images, vec!["uploads/1-tortilla.jpg"]);
        assert!(updated.replaced_images.is_empty());
    }

    #[tokio::test]
    async fn test_update_reports_replaced_images() {
        let store = MemoryStore::new();
        store.create(new_recipe(1)).await.unwrap();

        let new_images = vec!["uploads/2-new.jpg".to_string()];
        let updated = store
            .update_by_id(1, changes(Some(new_images.clone())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.recipe.images, new_images);
        assert_eq!(updated.replaced_images, vec!["uploads/1-tortilla.jpg"]);
        assert_eq!(updated.stale_images(), vec!["uploads/1-tortilla.jpg"]);
    }

    #[tokio::test]
    async fn test_delete_all_returns_removed_rows() {
        let store = MemoryStore::new();
        store.create(new_recipe(1)).await.unwrap();
        store.create(new_recipe(2)).await.unwrap();

        let removed = store.delete_all().await.unwrap();
        assert_eq!(removed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(store.delete_by_id(1).await.unwrap().is_none());
    }
}
