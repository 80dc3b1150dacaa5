//! Shared fixtures for integration tests

#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, Utc};
use pos_order_metrics::config::DashboardConfig;
use pos_order_metrics::db::MemoryOrderRepository;
use pos_order_metrics::models::{ChangeEvent, OrderItemRecord, OrderRecord, RowChange};
use pos_order_metrics::service::{
    ActivityMonitor, EngineContext, FixedClock, InMemoryChangeSource, RealtimeCoordinator, StatsAggregator,
    StatusClassifier,
};
use std::sync::Arc;

/// Fixed "now" used by every fixture: mid-afternoon UTC
pub const NOW: &str = "2026-05-10T15:00:00Z";

pub fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

pub fn now() -> DateTime<Utc> {
    at(NOW)
}

pub fn order(id: i64, total: i64, status: &str, minutes_ago: i64) -> OrderRecord {
    OrderRecord::new(id, BigDecimal::from(total), status, now() - Duration::minutes(minutes_ago))
}

pub fn yesterday_order(id: i64, total: i64, status: &str) -> OrderRecord {
    OrderRecord::new(id, BigDecimal::from(total), status, now() - Duration::days(1))
}

pub fn item(id: i64, order_id: i64, menu_item_id: i64, name: &str, quantity: i64) -> OrderItemRecord {
    OrderItemRecord::new(id, order_id, name, quantity, BigDecimal::from(8)).with_menu_item(menu_item_id)
}

pub fn inserted(order: OrderRecord) -> ChangeEvent {
    ChangeEvent::Order(RowChange::Insert { current: order })
}

pub fn settings() -> DashboardConfig {
    DashboardConfig {
        utc_offset_minutes: Some(0),
        fetch_timeout_ms: 200,
        ..DashboardConfig::default()
    }
}

/// Fully wired engine over in-memory adapters
pub struct Harness {
    pub repo: Arc<MemoryOrderRepository>,
    pub clock: FixedClock,
    pub classifier: Arc<StatusClassifier>,
    pub aggregator: Arc<StatsAggregator>,
    pub monitor: Arc<ActivityMonitor>,
    pub source: Arc<InMemoryChangeSource>,
    pub coordinator: RealtimeCoordinator,
}

impl Harness {
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        let repo = Arc::new(MemoryOrderRepository::with_orders(orders));
        let clock = FixedClock::new(now());
        let classifier = Arc::new(StatusClassifier::default());
        let ctx = EngineContext::new(repo.clone(), classifier.clone(), Arc::new(clock.clone()), settings());
        let source = Arc::new(InMemoryChangeSource::new());

        Self {
            aggregator: Arc::new(StatsAggregator::new(ctx.clone())),
            monitor: Arc::new(ActivityMonitor::new(ctx, repo.clone())),
            coordinator: RealtimeCoordinator::new(source.clone()),
            repo,
            clock,
            classifier,
            source,
        }
    }
}
