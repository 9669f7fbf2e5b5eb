use std::collections::HashSet;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::Store,
    error::{AppError, AppResult},
    models::{CatalogSnapshot, Ingredient, Product, ProductClick, Recipe, RecipeIngredientLink},
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the bundled schema migrations
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed [`Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_ingredients(&self) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, localized_name, img_url FROM ingredient ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_recipes(&self) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT id, name, localized_name, minutes, rating, instructions,
                   localized_instructions, img_url, video_url
            FROM recipe
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_links(&self) -> AppResult<Vec<RecipeIngredientLink>> {
        let rows = sqlx::query_as::<_, RecipeIngredientLink>(
            "SELECT recipe_id, ingredient_id FROM recipe_ingredient",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn load_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, url, ingredient_id FROM product ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl Store for PgStore {
    async fn resolve_user(&self, device_id: &str) -> AppResult<i32> {
        // The no-op update makes RETURNING yield the id for existing rows too
        let user_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO "user" (device_id) VALUES ($1)
            ON CONFLICT (device_id) DO UPDATE SET device_id = EXCLUDED.device_id
            RETURNING id
            "#,
        )
        .bind(device_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_id)
    }

    async fn load_catalog(&self) -> AppResult<CatalogSnapshot> {
        let (ingredients, recipes, links, products) = tokio::try_join!(
            self.load_ingredients(),
            self.load_recipes(),
            self.load_links(),
            self.load_products(),
        )?;

        tracing::debug!(
            ingredients = ingredients.len(),
            recipes = recipes.len(),
            links = links.len(),
            products = products.len(),
            "Loaded catalog from database"
        );

        Ok(CatalogSnapshot {
            ingredients,
            recipes,
            links,
            products,
        })
    }

    async fn user_ingredient_ids(&self, user_id: i32) -> AppResult<HashSet<i32>> {
        let ids = sqlx::query_scalar::<_, i32>(
            "SELECT ingredient_id FROM user_ingredient WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    async fn existing_ingredient_ids(&self, ingredient_ids: &[i32]) -> AppResult<HashSet<i32>> {
        if ingredient_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = sqlx::query_scalar::<_, i32>("SELECT id FROM ingredient WHERE id = ANY($1)")
            .bind(ingredient_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().collect())
    }

    async fn add_user_ingredients(&self, user_id: i32, ingredient_ids: &[i32]) -> AppResult<u64> {
        if ingredient_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO user_ingredient (user_id, ingredient_id)
            SELECT $1, UNNEST($2::int4[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(ingredient_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            // An ingredient deleted between validation and insert
            if let sqlx::Error::Database(db) = &e {
                if db.is_foreign_key_violation() {
                    return AppError::NotFound(format!(
                        "Ingredients not found: {:?}",
                        ingredient_ids
                    ));
                }
            }
            AppError::Database(e)
        })?;

        tracing::debug!(
            user_id,
            inserted = result.rows_affected(),
            "Stored pantry ingredients"
        );

        Ok(result.rows_affected())
    }

    async fn remove_user_ingredient(&self, user_id: i32, ingredient_id: i32) -> AppResult<()> {
        sqlx::query("DELETE FROM user_ingredient WHERE user_id = $1 AND ingredient_id = $2")
            .bind(user_id)
            .bind(ingredient_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_product(&self, product_id: i32) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, url, ingredient_id FROM product WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn record_product_click(
        &self,
        user_id: i32,
        product_id: i32,
    ) -> AppResult<ProductClick> {
        let click = sqlx::query_as::<_, ProductClick>(
            r#"
            INSERT INTO product_click (user_id, product_id)
            VALUES ($1, $2)
            RETURNING id, user_id, product_id, created_at
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(click)
    }
}
