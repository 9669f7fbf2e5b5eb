use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey, Store},
    error::{AppError, AppResult},
    models::{
        AddIngredientsResponse, CatalogSnapshot, EnrichedRecipe, Ingredient, ProductClick,
        RecipeTiers,
    },
    services::matching::{self, MatchEngine},
};

/// Connects the storage port to the match engine
///
/// Every call resolves the device to a user, fetches a fresh snapshot (from the
/// cache when configured) and runs the pure engine over it.
#[derive(Clone)]
pub struct PantryService {
    store: Arc<dyn Store>,
    cache: Option<Cache>,
    catalog_ttl: u64,
}

impl PantryService {
    pub fn new(store: Arc<dyn Store>, cache: Option<Cache>, catalog_ttl: u64) -> Self {
        Self {
            store,
            cache,
            catalog_ttl,
        }
    }

    pub fn cache(&self) -> &Option<Cache> {
        &self.cache
    }

    /// Current catalog snapshot
    pub async fn catalog(&self) -> AppResult<CatalogSnapshot> {
        cached!(self.cache, CacheKey::Catalog, self.catalog_ttl, async {
            self.store.load_catalog().await
        })
    }

    /// The ingredient catalog sorted by name
    pub async fn ingredient_catalog(&self) -> AppResult<Vec<Ingredient>> {
        let mut ingredients = self.catalog().await?.ingredients;
        ingredients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(ingredients)
    }

    /// Ingredients in the device's pantry, sorted by name
    pub async fn user_ingredients(&self, device_id: &str) -> AppResult<Vec<Ingredient>> {
        let user_id = self.store.resolve_user(device_id).await?;
        let owned = self.store.user_ingredient_ids(user_id).await?;
        let catalog = self.catalog().await?;

        Ok(matching::ingredients_of_user(&owned, &catalog.ingredients))
    }

    /// Adds ingredients to the device's pantry
    ///
    /// Every id must exist in the ingredient table. The reported count is the
    /// number of rows the store inserted, so ids already held are not counted.
    pub async fn add_ingredients(
        &self,
        device_id: &str,
        ingredient_ids: Vec<i32>,
    ) -> AppResult<AddIngredientsResponse> {
        // Checked against the store, not the cached catalog, so fresh rows are accepted
        let known = self.store.existing_ingredient_ids(&ingredient_ids).await?;
        let unknown: Vec<i32> = ingredient_ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::NotFound(format!(
                "Ingredients not found: {:?}",
                unknown
            )));
        }

        let user_id = self.store.resolve_user(device_id).await?;
        let existing = self.store.user_ingredient_ids(user_id).await?;
        let (_, expected) = matching::add_ingredients(&existing, &ingredient_ids);

        let added_count = if expected > 0 {
            let inserted = self
                .store
                .add_user_ingredients(user_id, &ingredient_ids)
                .await?;
            usize::try_from(inserted).unwrap_or(expected)
        } else {
            0
        };

        tracing::info!(
            user_id,
            requested = ingredient_ids.len(),
            expected,
            added = added_count,
            "Pantry ingredients added"
        );

        Ok(AddIngredientsResponse {
            status: "success",
            added_count,
            total_requested: ingredient_ids.len(),
        })
    }

    /// Removes one ingredient from the device's pantry
    pub async fn remove_ingredient(&self, device_id: &str, ingredient_id: i32) -> AppResult<()> {
        let user_id = self.store.resolve_user(device_id).await?;
        let existing = self.store.user_ingredient_ids(user_id).await?;

        let (_, removed) = matching::remove_ingredient(&existing, ingredient_id);
        if !removed {
            return Err(AppError::NotFound(format!(
                "Ingredient {} is not associated with this user",
                ingredient_id
            )));
        }

        self.store
            .remove_user_ingredient(user_id, ingredient_id)
            .await?;

        tracing::info!(user_id, ingredient_id, "Pantry ingredient removed");
        Ok(())
    }

    /// Every recipe sharing an ingredient with the pantry, with products for what is missing
    pub async fn recipes(&self, device_id: &str) -> AppResult<Vec<EnrichedRecipe>> {
        let user_id = self.store.resolve_user(device_id).await?;
        let owned = self.store.user_ingredient_ids(user_id).await?;
        let catalog = self.catalog().await?;

        let recipes = MatchEngine::new(&catalog).compute_matches_with_products(&owned);

        tracing::info!(
            user_id,
            pantry_size = owned.len(),
            recipe_count = recipes.len(),
            "Matched recipes"
        );

        Ok(recipes)
    }

    /// Cookable and almost-cookable recipes for the pantry
    pub async fn recipe_tiers(&self, device_id: &str) -> AppResult<RecipeTiers> {
        let user_id = self.store.resolve_user(device_id).await?;
        let owned = self.store.user_ingredient_ids(user_id).await?;
        let catalog = self.catalog().await?;

        let engine = MatchEngine::new(&catalog);
        let tiers = engine.classify_tiers(engine.compute_matches(&owned));

        tracing::info!(
            user_id,
            cookable = tiers.cookable.len(),
            almost_cookable = tiers.almost_cookable.len(),
            "Classified recipes"
        );

        Ok(tiers)
    }

    /// Records that the device opened a product link
    pub async fn record_click(&self, device_id: &str, product_id: i32) -> AppResult<ProductClick> {
        if self.store.find_product(product_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        let user_id = self.store.resolve_user(device_id).await?;
        let click = self.store.record_product_click(user_id, product_id).await?;

        tracing::info!(user_id, product_id, click_id = click.id, "Product click recorded");
        Ok(click)
    }
}
