use serde::{Deserialize, Serialize};

/// An ingredient from the shared catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub localized_name: Option<String>,
    #[serde(rename = "img_url", default)]
    #[sqlx(rename = "img_url")]
    pub image_url: Option<String>,
}

impl Ingredient {
    /// Creates a catalog ingredient with no translation or image
    pub fn new(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            localized_name: None,
            image_url: None,
        }
    }
}

/// A recipe from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub localized_name: Option<String>,
    pub minutes: i32,
    pub rating: Option<f32>,
    pub instructions: String,
    #[serde(default)]
    pub localized_instructions: Option<String>,
    #[serde(rename = "img_url", default)]
    #[sqlx(rename = "img_url")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// Association between a recipe and one of its ingredients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct RecipeIngredientLink {
    pub recipe_id: i32,
    pub ingredient_id: i32,
}

impl RecipeIngredientLink {
    pub fn new(recipe_id: i32, ingredient_id: i32) -> Self {
        Self {
            recipe_id,
            ingredient_id,
        }
    }
}

/// A purchasable retailer product, optionally tied to the ingredient it supplies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub name: String,
    /// Price in the smallest currency unit
    pub price: i32,
    pub url: String,
    pub ingredient_id: Option<i32>,
}

/// Everything the match engine reads, loaded from storage in one go
///
/// A snapshot is never mutated once loaded; each request either reuses a cached
/// copy or fetches a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub ingredients: Vec<Ingredient>,
    pub recipes: Vec<Recipe>,
    pub links: Vec<RecipeIngredientLink>,
    pub products: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_serializes_image_as_img_url() {
        let mut egg = Ingredient::new(1, "Egg");
        egg.image_url = Some("https://img.local/egg.png".to_string());

        let json = serde_json::to_value(&egg).unwrap();
        assert_eq!(json["img_url"], "https://img.local/egg.png");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn test_recipe_deserializes_without_optional_fields() {
        let json = r#"{
            "id": 7,
            "name": "Pancakes",
            "minutes": 20,
            "rating": null,
            "instructions": "Mix and fry."
        }"#;

        let recipe: Recipe = serde_json::from_str(json).unwrap();
        assert_eq!(recipe.id, 7);
        assert_eq!(recipe.localized_name, None);
        assert_eq!(recipe.image_url, None);
        assert_eq!(recipe.video_url, None);
    }
}
