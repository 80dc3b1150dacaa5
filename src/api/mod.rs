pub mod handlers;

pub use handlers::*;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;

/// 看板 API 路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/dashboard/activity", get(dashboard_activity))
        .route("/api/dashboard/sales/trailing", get(trailing_sales))
        .route("/api/dashboard/classification-gaps", get(classification_gaps))
        .route("/api/orders/:id/prioritize", post(prioritize_order))
        .layer(ServiceBuilder::new())
        .with_state(state)
}
