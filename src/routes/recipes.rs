use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecipeTiers, RecipesResponse},
    routes::AppState,
};

/// Every recipe sharing at least one ingredient with the pantry
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(device_id): Path<String>,
) -> AppResult<Json<RecipesResponse>> {
    tracing::debug!(request_id = %request_id, device_id = %device_id, "Listing matched recipes");

    let recipes = state.pantry.recipes(&device_id).await?;
    Ok(Json(RecipesResponse { recipes }))
}

/// Recipes the device can cook now, or with one more ingredient
pub async fn cookable(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(device_id): Path<String>,
) -> AppResult<Json<RecipeTiers>> {
    tracing::debug!(request_id = %request_id, device_id = %device_id, "Classifying recipes");

    let tiers = state.pantry.recipe_tiers(&device_id).await?;
    Ok(Json(tiers))
}
