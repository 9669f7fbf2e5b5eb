use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{error::AppResult, models::ProductClick, routes::AppState};

/// Records that the device followed a product link
pub async fn click(
    State(state): State<Arc<AppState>>,
    Path((device_id, product_id)): Path<(String, i32)>,
) -> AppResult<(StatusCode, Json<ProductClick>)> {
    let click = state.pantry.record_click(&device_id, product_id).await?;
    Ok((StatusCode::CREATED, Json(click)))
}
