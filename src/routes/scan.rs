use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::ScanResponse,
    routes::AppState,
    services::{detection, ImageUpload},
};

/// Multipart field holding the image
const FILE_FIELD: &str = "file";

/// Detects catalog ingredients in an uploaded photo
pub async fn scan(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    mut multipart: Multipart,
) -> AppResult<Json<ScanResponse>> {
    let image = read_image(&mut multipart).await?;

    tracing::info!(
        request_id = %request_id,
        mime_type = %image.mime_type,
        "Processing ingredient scan"
    );

    let catalog = state.pantry.catalog().await?;
    let detected = detection::scan_ingredients(
        state.detector.as_ref(),
        state.pantry.cache(),
        &catalog.ingredients,
        image,
    )
    .await?;

    Ok(Json(ScanResponse::from(detected)))
}

async fn read_image(multipart: &mut Multipart) -> AppResult<ImageUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read image: {}", e)))?;

        return Ok(ImageUpload::new(bytes.to_vec(), content_type.as_deref()));
    }

    Err(AppError::InvalidInput(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
