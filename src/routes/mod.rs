use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{Cache, Store},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{IngredientDetector, PantryService},
};

pub mod ingredients;
pub mod products;
pub mod recipes;
pub mod scan;

/// Largest accepted image upload
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Shared handler state
pub struct AppState {
    pub pantry: PantryService,
    pub detector: Arc<dyn IngredientDetector>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Option<Cache>,
        detector: Arc<dyn IngredientDetector>,
        catalog_ttl: u64,
    ) -> Self {
        Self {
            pantry: PantryService::new(store, cache, catalog_ttl),
            detector,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ingredients", get(ingredients::catalog))
        .route(
            "/users/:device_id/ingredients",
            get(ingredients::list).post(ingredients::add),
        )
        .route(
            "/users/:device_id/ingredients/:ingredient_id",
            delete(ingredients::remove),
        )
        .route("/users/:device_id/recipes", get(recipes::list))
        .route("/users/:device_id/recipes/cookable", get(recipes::cookable))
        .route(
            "/users/:device_id/products/:product_id/clicks",
            post(products::click),
        )
        .route(
            "/scan-ingredients",
            post(scan::scan).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
