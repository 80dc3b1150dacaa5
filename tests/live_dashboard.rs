//! End-to-end tests: change events -> coalesced recompute -> published snapshot

mod common;

use bigdecimal::BigDecimal;
use common::*;
use pos_order_metrics::models::{CanonicalStatus, ChangeTable};
use pos_order_metrics::service::LiveDashboard;
use std::time::Duration;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn test_initial_snapshot_is_computed() {
    let h = Harness::new(vec![
        order(1, 10, "pagado", 30).with_customer("Ana"),
        order(2, 20, "Cancelado", 20).with_customer("ANA"),
        order(3, 15, "pendiente", 18).with_customer("Luis"),
        yesterday_order(4, 30, "pagado"),
    ]);

    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    settle().await;

    let snapshot = dashboard.latest();
    assert!(snapshot.stats.available);
    assert_eq!(snapshot.stats.sales.daily_total, BigDecimal::from(45));
    assert_eq!(snapshot.stats.sales.transaction_count, 3);
    assert_eq!(snapshot.stats.sales.change_percentage, 50.0);
    assert_eq!(snapshot.stats.orders.pending_orders, 1);
    assert_eq!(snapshot.stats.orders.active_orders, 1);
    assert_eq!(snapshot.stats.customers.today_count, 2);

    assert_eq!(snapshot.activity.len(), 4);
    let pending = snapshot.activity.iter().find(|a| a.order_id == 3).unwrap();
    assert_eq!(pending.canonical_status, CanonicalStatus::Pending);
    assert!(pending.is_delayed);
    assert!(dashboard.is_live());
}

#[tokio::test(start_paused = true)]
async fn test_change_event_refreshes_snapshot() {
    let h = Harness::new(vec![order(1, 10, "pendiente", 5)]);
    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    settle().await;
    assert_eq!(dashboard.latest().stats.sales.transaction_count, 1);

    let new_order = order(2, 40, "preparando", 1);
    h.repo.insert_order(new_order.clone());
    h.source.publish(inserted(new_order));
    settle().await;

    let snapshot = dashboard.latest();
    assert_eq!(snapshot.stats.sales.transaction_count, 2);
    assert_eq!(snapshot.stats.orders.in_preparation_orders, 1);
    assert_eq!(snapshot.stats.orders.active_orders, 2);
    assert_eq!(snapshot.activity[0].order_id, 2);
}

#[tokio::test(start_paused = true)]
async fn test_event_burst_is_coalesced() {
    let h = Harness::new(vec![order(1, 10, "pendiente", 5)]);
    h.repo.set_latency(Some(Duration::from_millis(20)));

    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    // 首次计算进行中
    tokio::time::sleep(Duration::from_millis(5)).await;

    for id in 10..60 {
        h.source.publish(inserted(order(id, 1, "pendiente", 0)));
    }
    tokio::time::sleep(Duration::from_millis(150)).await;

    // 一次初始计算 + 一次合并后的重算
    assert_eq!(dashboard.recompute_runs(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_yields_unavailable_snapshot() {
    let h = Harness::new(vec![order(1, 10, "pendiente", 5)]);
    h.repo.set_latency(Some(Duration::from_secs(5)));

    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let snapshot = dashboard.latest();
    assert!(!snapshot.stats.available);
    assert_eq!(snapshot.stats.sales.transaction_count, 0);
    assert!(snapshot.activity.is_empty());
    assert_eq!(dashboard.recompute_runs(), 1);

    let err = h.aggregator.try_compute_stats().await.unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_subscription_failure_still_serves_snapshot() {
    let h = Harness::new(vec![order(1, 10, "pendiente", 5)]);
    h.source.fail_on(ChangeTable::Orders);

    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    settle().await;

    assert!(!dashboard.is_live());
    assert!(dashboard.latest().stats.available);
    assert_eq!(h.source.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_listeners() {
    let h = Harness::new(vec![]);
    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    settle().await;
    assert_eq!(h.source.listener_count(), 2);

    dashboard.shutdown();
    dashboard.shutdown();
    assert_eq!(h.source.listener_count(), 0);

    let runs = dashboard.recompute_runs();
    h.source.publish(inserted(order(9, 1, "pendiente", 0)));
    settle().await;
    assert_eq!(dashboard.recompute_runs(), runs);
}

#[tokio::test(start_paused = true)]
async fn test_popular_items_use_completed_orders_only() {
    let h = Harness::new(vec![
        order(1, 10, "listo", 30),
        order(2, 10, "pagado", 30),
        order(3, 10, "Listo", 10),
    ]);
    h.repo.insert_item(item(1, 1, 100, "Tacos", 2));
    h.repo.insert_item(item(2, 2, 200, "Pozole", 9));
    h.repo.insert_item(item(3, 3, 100, "Tacos", 1));
    h.repo.insert_item(item(4, 3, 300, "Agua fresca", 3));

    let snapshot = h.aggregator.compute_stats().await;
    let names: Vec<(&str, i64)> = snapshot
        .popular_items
        .iter()
        .map(|p| (p.name.as_str(), p.quantity))
        .collect();
    // "pagado" 不属于已完成口径, 其明细不计入
    assert_eq!(names, vec![("Agua fresca", 3), ("Tacos", 3)]);
}

#[tokio::test(start_paused = true)]
async fn test_updates_receiver_sees_new_snapshot() {
    let h = Harness::new(vec![order(1, 10, "pendiente", 5)]);
    let dashboard = LiveDashboard::start(h.aggregator.clone(), h.monitor.clone(), &h.coordinator, 10, now()).await;
    settle().await;

    let mut updates = dashboard.updates();
    updates.borrow_and_update();

    let new_order = order(2, 25, "preparando", 1);
    h.repo.insert_order(new_order.clone());
    h.source.publish(inserted(new_order));

    tokio::time::timeout(Duration::from_secs(1), updates.changed())
        .await
        .expect("snapshot published")
        .unwrap();
    assert_eq!(updates.borrow().stats.sales.transaction_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_fuzzy_ready_status_counts_in_popular_items() {
    let h = Harness::new(vec![order(1, 10, "Listo!", 30), order(2, 10, "unpaid", 20)]);
    h.repo.insert_item(item(1, 1, 100, "Tacos", 4));
    h.repo.insert_item(item(2, 2, 200, "Pozole", 2));

    let snapshot = h.aggregator.compute_stats().await;
    assert_eq!(snapshot.orders.ready_orders, 1);
    assert_eq!(snapshot.orders.pending_orders, 1);
    assert_eq!(snapshot.popular_items.len(), 1);
    assert_eq!(snapshot.popular_items[0].name, "Tacos");
    assert_eq!(snapshot.popular_items[0].quantity, 4);
}
