use crate::service::{ActivityMonitor, LiveDashboard, StatsAggregator, StatusClassifier};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<LiveDashboard>,
    pub aggregator: Arc<StatsAggregator>,
    pub monitor: Arc<ActivityMonitor>,
    pub classifier: Arc<StatusClassifier>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TrailingParams {
    pub days: Option<u32>,
}

/// 通用响应体
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GapEntry {
    pub status: String,
    pub count: u64,
}

/// 未识别状态统计
#[derive(Debug, Serialize)]
pub struct GapsResponse {
    pub total: u64,
    pub gaps: Vec<GapEntry>,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 最新统计快照 (实时维护)
pub async fn dashboard_stats(State(state): State<AppState>) -> Response {
    let snapshot = state.dashboard.latest();
    (StatusCode::OK, Json(snapshot.stats)).into_response()
}

/// 活动流; limit 与实时维护的条数不同时按需计算
pub async fn dashboard_activity(State(state): State<AppState>, Query(params): Query<ActivityParams>) -> Response {
    let latest = state.dashboard.latest();
    let limit = params.limit.unwrap_or(latest.activity_limit);
    if limit == latest.activity_limit {
        return (StatusCode::OK, Json(latest.activity)).into_response();
    }

    match state.monitor.try_build_activity(limit).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => unavailable(format!("Error: {}", e)),
    }
}

/// 最近 N 天销售 (默认 7 天)
pub async fn trailing_sales(State(state): State<AppState>, Query(params): Query<TrailingParams>) -> Response {
    match state.aggregator.try_trailing_sales(params.days.unwrap_or(7)).await {
        Ok(sales) => (StatusCode::OK, Json(sales)).into_response(),
        Err(e) => unavailable(format!("Error: {}", e)),
    }
}

pub async fn classification_gaps(State(state): State<AppState>) -> Response {
    let response = GapsResponse {
        total: state.classifier.gap_total(),
        gaps: state
            .classifier
            .gaps()
            .into_iter()
            .map(|(status, count)| GapEntry { status, count })
            .collect(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// 优先处理订单
pub async fn prioritize_order(State(state): State<AppState>, Path(order_id): Path<i64>) -> Response {
    if state.monitor.prioritize_order(order_id).await {
        state.dashboard.refresh();
        let response = ActionResponse {
            success: true,
            message: format!("Order {} prioritized", order_id),
        };
        (StatusCode::OK, Json(response)).into_response()
    } else {
        let response = ActionResponse {
            success: false,
            message: format!("Order {} could not be prioritized", order_id),
        };
        (StatusCode::UNPROCESSABLE_ENTITY, Json(response)).into_response()
    }
}

fn unavailable(message: String) -> Response {
    let response = ActionResponse {
        success: false,
        message,
    };
    (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
}
