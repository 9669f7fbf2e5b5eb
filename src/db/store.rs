use std::collections::HashSet;

use crate::{
    error::AppResult,
    models::{CatalogSnapshot, Product, ProductClick},
};

/// Storage port for everything the service persists
///
/// The HTTP layer owns an implementation (PostgreSQL in production) and hands
/// snapshots to the match engine; the engine itself never sees this trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Maps a device identifier to a user id, creating the user on first sight
    ///
    /// The same device id always yields the same user id.
    async fn resolve_user(&self, device_id: &str) -> AppResult<i32>;

    /// Loads the full catalog: ingredients, recipes, links and products
    async fn load_catalog(&self) -> AppResult<CatalogSnapshot>;

    /// The subset of `ingredient_ids` present in the ingredient table
    async fn existing_ingredient_ids(&self, ingredient_ids: &[i32]) -> AppResult<HashSet<i32>>;

    /// Ingredient ids currently in the user's pantry
    async fn user_ingredient_ids(&self, user_id: i32) -> AppResult<HashSet<i32>>;

    /// Inserts pantry entries, ignoring ones that already exist
    ///
    /// Returns how many rows were actually inserted.
    async fn add_user_ingredients(&self, user_id: i32, ingredient_ids: &[i32]) -> AppResult<u64>;

    /// Deletes one pantry entry; deleting an absent entry is not an error
    async fn remove_user_ingredient(&self, user_id: i32, ingredient_id: i32) -> AppResult<()>;

    async fn find_product(&self, product_id: i32) -> AppResult<Option<Product>>;

    /// Appends a click event for the product
    async fn record_product_click(&self, user_id: i32, product_id: i32)
        -> AppResult<ProductClick>;
}
