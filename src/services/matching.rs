use std::collections::{HashMap, HashSet};

use crate::models::{
    CatalogSnapshot, EnrichedRecipe, Ingredient, MissingIngredient, Product, RecipeTiers,
};

/// Matches a user's pantry against the recipe catalog
///
/// The engine borrows a catalog snapshot and builds its lookup indices once,
/// so a single instance can answer several queries for the same snapshot.
/// It performs no I/O and never fails: links pointing at ingredients that are
/// missing from the snapshot are skipped.
pub struct MatchEngine<'a> {
    catalog: &'a CatalogSnapshot,
    /// Recipe id to the ids of its linked ingredients
    recipe_links: HashMap<i32, HashSet<i32>>,
    /// Ingredient id to its position in the catalog list
    ingredient_positions: HashMap<i32, usize>,
    /// Ingredient id to the products that supply it, in catalog order
    products_by_ingredient: HashMap<i32, Vec<&'a Product>>,
}

impl<'a> MatchEngine<'a> {
    /// Creates an engine over the given snapshot
    pub fn new(catalog: &'a CatalogSnapshot) -> Self {
        let mut recipe_links: HashMap<i32, HashSet<i32>> = HashMap::new();
        for link in &catalog.links {
            recipe_links
                .entry(link.recipe_id)
                .or_default()
                .insert(link.ingredient_id);
        }

        let mut ingredient_positions = HashMap::with_capacity(catalog.ingredients.len());
        for (position, ingredient) in catalog.ingredients.iter().enumerate() {
            ingredient_positions.entry(ingredient.id).or_insert(position);
        }

        let mut products_by_ingredient: HashMap<i32, Vec<&'a Product>> = HashMap::new();
        for product in &catalog.products {
            if let Some(ingredient_id) = product.ingredient_id {
                products_by_ingredient
                    .entry(ingredient_id)
                    .or_default()
                    .push(product);
            }
        }

        Self {
            catalog,
            recipe_links,
            ingredient_positions,
            products_by_ingredient,
        }
    }

    /// Returns every recipe sharing at least one ingredient with the user
    ///
    /// Recipes keep the catalog order; ingredients inside each recipe keep the
    /// order of the ingredient catalog.
    pub fn compute_matches(&self, user_ingredient_ids: &HashSet<i32>) -> Vec<EnrichedRecipe> {
        self.enrich(user_ingredient_ids, false)
    }

    /// Same as [`compute_matches`](Self::compute_matches), with each recipe's
    /// `missing_products` holding the products for all of its missing ingredients
    pub fn compute_matches_with_products(
        &self,
        user_ingredient_ids: &HashSet<i32>,
    ) -> Vec<EnrichedRecipe> {
        self.enrich(user_ingredient_ids, true)
    }

    /// Splits enriched recipes into the cookable and almost-cookable tiers
    ///
    /// Recipes missing two or more ingredients are dropped. The single missing
    /// ingredient of each almost-cookable recipe is annotated with its products.
    pub fn classify_tiers(&self, recipes: Vec<EnrichedRecipe>) -> RecipeTiers {
        let mut tiers = RecipeTiers::default();

        for recipe in recipes {
            if recipe.is_cookable() {
                tiers.cookable.push(recipe);
            } else if recipe.is_almost_cookable() {
                let annotated = recipe.map_missing(|missing| {
                    let products = self.products_for(missing.id());
                    MissingIngredient::with_products(missing.into_ingredient(), products)
                });
                tiers.almost_cookable.push(annotated);
            }
        }

        tiers
    }

    /// Products that can supply the given ingredient, in catalog order
    pub fn products_for(&self, ingredient_id: i32) -> Vec<Product> {
        self.products_by_ingredient
            .get(&ingredient_id)
            .map(|products| products.iter().map(|p| (*p).clone()).collect())
            .unwrap_or_default()
    }

    fn enrich(&self, user_ingredient_ids: &HashSet<i32>, with_products: bool) -> Vec<EnrichedRecipe> {
        self.catalog
            .recipes
            .iter()
            .filter_map(|recipe| {
                let linked = self.recipe_links.get(&recipe.id)?;
                if linked.is_disjoint(user_ingredient_ids) {
                    return None;
                }

                let ingredients = self.resolve(linked);
                let (matching, missing): (Vec<Ingredient>, Vec<Ingredient>) = ingredients
                    .iter()
                    .cloned()
                    .partition(|ingredient| user_ingredient_ids.contains(&ingredient.id));

                // The overlap may have been a dangling link only
                if matching.is_empty() {
                    return None;
                }

                let missing_products = with_products.then(|| {
                    missing
                        .iter()
                        .flat_map(|ingredient| self.products_for(ingredient.id))
                        .collect()
                });

                Some(EnrichedRecipe::new(
                    recipe.clone(),
                    ingredients,
                    matching,
                    missing.into_iter().map(MissingIngredient::new).collect(),
                    missing_products,
                ))
            })
            .collect()
    }

    /// Looks up linked ids in the catalog, skipping unknown ones
    fn resolve(&self, linked: &HashSet<i32>) -> Vec<Ingredient> {
        let mut positions: Vec<usize> = linked
            .iter()
            .filter_map(|id| self.ingredient_positions.get(id).copied())
            .collect();
        positions.sort_unstable();

        positions
            .into_iter()
            .map(|position| self.catalog.ingredients[position].clone())
            .collect()
    }
}

/// Ingredients held by the user, sorted by name (byte order, then id)
pub fn ingredients_of_user(
    user_ingredient_ids: &HashSet<i32>,
    all_ingredients: &[Ingredient],
) -> Vec<Ingredient> {
    let mut owned: Vec<Ingredient> = all_ingredients
        .iter()
        .filter(|ingredient| user_ingredient_ids.contains(&ingredient.id))
        .cloned()
        .collect();
    owned.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    owned
}

/// Adds ids to a pantry, returning the new set and how many ids were new
///
/// Ids are not checked against the catalog here.
pub fn add_ingredients(existing: &HashSet<i32>, requested: &[i32]) -> (HashSet<i32>, usize) {
    let mut updated = existing.clone();
    let added = requested.iter().filter(|id| updated.insert(**id)).count();
    (updated, added)
}

/// Removes one id from a pantry; `false` when it was not there
pub fn remove_ingredient(existing: &HashSet<i32>, ingredient_id: i32) -> (HashSet<i32>, bool) {
    let mut updated = existing.clone();
    let removed = updated.remove(&ingredient_id);
    (updated, removed)
}
