use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{AddIngredientsResponse, Ingredient},
    routes::AppState,
};

/// Full ingredient catalog, sorted by name
pub async fn catalog(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Ingredient>>> {
    let ingredients = state.pantry.ingredient_catalog().await?;
    Ok(Json(ingredients))
}

/// Ingredients in the device's pantry
pub async fn list(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let ingredients = state.pantry.user_ingredients(&device_id).await?;
    Ok(Json(ingredients))
}

/// Adds ingredient ids to the device's pantry
pub async fn add(
    State(state): State<Arc<AppState>>,
    Path(device_id): Path<String>,
    Json(ingredient_ids): Json<Vec<i32>>,
) -> AppResult<Json<AddIngredientsResponse>> {
    let response = state
        .pantry
        .add_ingredients(&device_id, ingredient_ids)
        .await?;
    Ok(Json(response))
}

/// Removes one ingredient from the device's pantry
pub async fn remove(
    State(state): State<Arc<AppState>>,
    Path((device_id, ingredient_id)): Path<(String, i32)>,
) -> AppResult<StatusCode> {
    state
        .pantry
        .remove_ingredient(&device_id, ingredient_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
