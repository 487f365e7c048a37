use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use scheduling_cell::router::scheduling_routes;
use scheduling_cell::SchedulingCell;

pub fn create_router(cell: Arc<SchedulingCell>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", scheduling_routes(cell))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "clinic-scheduler-api",
    }))
}
