use serde::Serialize;

use super::catalog::{Ingredient, Product, Recipe};

/// An ingredient a recipe needs but the user does not have
///
/// `products` is only present when the engine was asked to annotate this
/// ingredient with purchase offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingIngredient {
    #[serde(flatten)]
    ingredient: Ingredient,
    #[serde(skip_serializing_if = "Option::is_none")]
    products: Option<Vec<Product>>,
}

impl MissingIngredient {
    pub(crate) fn new(ingredient: Ingredient) -> Self {
        Self {
            ingredient,
            products: None,
        }
    }

    pub(crate) fn with_products(ingredient: Ingredient, products: Vec<Product>) -> Self {
        Self {
            ingredient,
            products: Some(products),
        }
    }

    pub fn id(&self) -> i32 {
        self.ingredient.id
    }

    pub fn ingredient(&self) -> &Ingredient {
        &self.ingredient
    }

    pub fn products(&self) -> Option<&[Product]> {
        self.products.as_deref()
    }

    pub(crate) fn into_ingredient(self) -> Ingredient {
        self.ingredient
    }
}

/// A recipe joined with its ingredients, split by what the user already holds
///
/// Built once by the match engine. Fields are read through accessors so a
/// value handed to a caller stays exactly as the engine produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecipe {
    #[serde(flatten)]
    recipe: Recipe,
    ingredients: Vec<Ingredient>,
    matching_ingredients: Vec<Ingredient>,
    missing_ingredients: Vec<MissingIngredient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    missing_products: Option<Vec<Product>>,
}

impl EnrichedRecipe {
    pub(crate) fn new(
        recipe: Recipe,
        ingredients: Vec<Ingredient>,
        matching_ingredients: Vec<Ingredient>,
        missing_ingredients: Vec<MissingIngredient>,
        missing_products: Option<Vec<Product>>,
    ) -> Self {
        Self {
            recipe,
            ingredients,
            matching_ingredients,
            missing_ingredients,
            missing_products,
        }
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn id(&self) -> i32 {
        self.recipe.id
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn matching_ingredients(&self) -> &[Ingredient] {
        &self.matching_ingredients
    }

    pub fn missing_ingredients(&self) -> &[MissingIngredient] {
        &self.missing_ingredients
    }

    /// Products for every missing ingredient, set by the full-listing variant
    pub fn missing_products(&self) -> Option<&[Product]> {
        self.missing_products.as_deref()
    }

    /// True when the user holds every ingredient
    pub fn is_cookable(&self) -> bool {
        self.missing_ingredients.is_empty()
    }

    /// True when exactly one ingredient is missing
    pub fn is_almost_cookable(&self) -> bool {
        self.missing_ingredients.len() == 1
    }

    /// Rebuilds the recipe with each missing ingredient passed through `f`
    pub(crate) fn map_missing<F>(self, f: F) -> Self
    where
        F: FnMut(MissingIngredient) -> MissingIngredient,
    {
        Self {
            missing_ingredients: self.missing_ingredients.into_iter().map(f).collect(),
            ..self
        }
    }
}

/// Candidate recipes split into the two cookability tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeTiers {
    #[serde(rename = "cookable_recipes")]
    pub cookable: Vec<EnrichedRecipe>,
    #[serde(rename = "almost_cookable_recipes")]
    pub almost_cookable: Vec<EnrichedRecipe>,
}
