use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod catalog;
pub mod recipe_match;

pub use catalog::{CatalogSnapshot, Ingredient, Product, Recipe, RecipeIngredientLink};
pub use recipe_match::{EnrichedRecipe, MissingIngredient, RecipeTiers};

/// Recorded when a user follows a product link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductClick {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub created_at: DateTime<Utc>,
}

/// An ingredient recognised in an uploaded photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedIngredient {
    pub id: i32,
    pub name: String,
}

// ============================================================================
// API Response Types
// ============================================================================

/// Response for a bulk add to the user's pantry
#[derive(Debug, Serialize)]
pub struct AddIngredientsResponse {
    pub status: &'static str,
    pub added_count: usize,
    pub total_requested: usize,
}

/// Response listing every candidate recipe
#[derive(Debug, Serialize)]
pub struct RecipesResponse {
    pub recipes: Vec<EnrichedRecipe>,
}

/// Response for an ingredient scan
#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub status: &'static str,
    pub detected_count: usize,
    pub ingredients: Vec<DetectedIngredient>,
}

impl From<Vec<DetectedIngredient>> for ScanResponse {
    fn from(ingredients: Vec<DetectedIngredient>) -> Self {
        Self {
            status: "success",
            detected_count: ingredients.len(),
            ingredients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_response_counts_ingredients() {
        let response = ScanResponse::from(vec![
            DetectedIngredient {
                id: 12,
                name: "Tomato".to_string(),
            },
            DetectedIngredient {
                id: 40,
                name: "Onion".to_string(),
            },
        ]);

        assert_eq!(response.status, "success");
        assert_eq!(response.detected_count, 2);
    }

    #[test]
    fn test_detected_ingredient_deserializes_model_output() {
        let parsed: Vec<DetectedIngredient> =
            serde_json::from_str(r#"[{"id": 123, "name": "tomato"}]"#).unwrap();
        assert_eq!(
            parsed,
            vec![DetectedIngredient {
                id: 123,
                name: "tomato".to_string()
            }]
        );
    }
}
