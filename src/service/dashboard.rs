use crate::models::{ActivityItem, StatsSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use super::activity::ActivityMonitor;
use super::aggregator::StatsAggregator;
use super::realtime::{RealtimeCoordinator, RecomputeScheduler, SubscriptionGuard};

/// 看板最新快照 (统计 + 活动流)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub stats: StatsSnapshot,
    pub activity: Vec<ActivityItem>,
    pub activity_limit: usize,
    pub refreshed_at: DateTime<Utc>,
}

/// 实时看板: 变更事件 -> 合并重算 -> watch 通道发布最新快照
pub struct LiveDashboard {
    scheduler: RecomputeScheduler,
    subscription: SubscriptionGuard,
    snapshots: watch::Receiver<DashboardSnapshot>,
}

impl LiveDashboard {
    /// 立即触发首次计算, 随后按变更事件刷新; 订阅失败时仍提供首次快照
    pub async fn start(
        aggregator: Arc<StatsAggregator>,
        monitor: Arc<ActivityMonitor>,
        coordinator: &RealtimeCoordinator,
        activity_limit: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let (tx, rx) = watch::channel(DashboardSnapshot {
            stats: StatsSnapshot::unavailable(now),
            activity: Vec::new(),
            activity_limit,
            refreshed_at: now,
        });
        let tx = Arc::new(tx);

        let scheduler = RecomputeScheduler::spawn(move || {
            let aggregator = aggregator.clone();
            let monitor = monitor.clone();
            let tx = tx.clone();
            async move {
                let (stats, activity) =
                    tokio::join!(aggregator.compute_stats(), monitor.build_activity(activity_limit));
                let refreshed_at = stats.generated_at;
                tx.send_replace(DashboardSnapshot {
                    stats,
                    activity,
                    activity_limit,
                    refreshed_at,
                });
            }
        });
        scheduler.trigger();

        let trigger = scheduler.trigger_handle();
        let subscription = coordinator.subscribe(move || trigger.fire()).await;
        if !subscription.is_live() {
            tracing::warn!("Dashboard running without live updates");
        }

        Self {
            scheduler,
            subscription,
            snapshots: rx,
        }
    }

    pub fn latest(&self) -> DashboardSnapshot {
        self.snapshots.borrow().clone()
    }

    /// 订阅快照更新
    pub fn updates(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshots.clone()
    }

    /// 手动请求刷新 (与事件触发共享合并策略)
    pub fn refresh(&self) {
        self.scheduler.trigger();
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_live()
    }

    pub fn recompute_runs(&self) -> u64 {
        self.scheduler.runs()
    }

    pub fn shutdown(&self) {
        self.subscription.unsubscribe();
        self.scheduler.shutdown();
        tracing::info!("Live dashboard stopped");
    }
}
