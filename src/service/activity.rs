use bigdecimal::{BigDecimal, Zero};
use crate::db::{with_deadline, OrderQuery, OrderWriter};
use crate::error::RepositoryError;
use crate::models::{ActionDescriptor, ActivityItem, CanonicalStatus, OrderRecord, Severity};
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::context::EngineContext;
use super::safe::safe_compute;

/// 订单活动流: 最近订单 + 延误/取消/折扣标记 + 建议操作
pub struct ActivityMonitor {
    ctx: EngineContext,
    writer: Arc<dyn OrderWriter>,
}

impl ActivityMonitor {
    pub fn new(ctx: EngineContext, writer: Arc<dyn OrderWriter>) -> Self {
        Self { ctx, writer }
    }

    /// 后端失败时返回空列表
    pub async fn build_activity(&self, limit: usize) -> Vec<ActivityItem> {
        safe_compute("build activity", self.try_build_activity(limit), Vec::new).await
    }

    pub async fn try_build_activity(&self, limit: usize) -> Result<Vec<ActivityItem>, RepositoryError> {
        let limit = limit.clamp(1, self.ctx.settings.max_activity_limit.max(1));
        let query = OrderQuery::recent(limit);
        let orders = with_deadline(
            "list recent orders",
            self.ctx.fetch_timeout(),
            self.ctx.repository.list_orders(&query),
        )
        .await?;

        let now = self.ctx.now();
        let items: Vec<ActivityItem> = orders.iter().map(|o| self.annotate(o, now)).collect();

        let flagged = items
            .iter()
            .filter(|i| i.is_delayed || i.has_cancellation || i.is_high_discount)
            .count();
        tracing::debug!("Activity built: {} orders, {} need attention", items.len(), flagged);
        Ok(items)
    }

    /// 单条订单标注 (纯函数, 不修改源记录)
    pub fn annotate(&self, order: &OrderRecord, now: DateTime<Utc>) -> ActivityItem {
        let settings = &self.ctx.settings;
        let status = self.ctx.classifier.classify(&order.raw_status);
        let time_elapsed_minutes = (now - order.created_at).num_minutes().max(0);

        let is_delayed = status.is_in_progress() && time_elapsed_minutes > settings.delay_threshold_minutes;
        let has_cancellation = status == CanonicalStatus::Cancelled;
        let has_discount = order.discount_percentage > BigDecimal::zero();
        let is_high_discount =
            has_discount && order.discount_percentage >= BigDecimal::from(settings.high_discount_threshold);

        let mut actions = vec![ActionDescriptor::new("View Details", "view", order.id, Severity::Default)];
        if is_delayed {
            actions.push(ActionDescriptor::new("Prioritize", "prioritize", order.id, Severity::Warning));
        }
        if has_cancellation {
            actions.push(ActionDescriptor::new(
                "Review Cancellation",
                "review-cancel",
                order.id,
                Severity::Danger,
            ));
        }
        if is_high_discount {
            actions.push(ActionDescriptor::new(
                "Review Discount",
                "review-discount",
                order.id,
                Severity::Warning,
            ));
        }

        ActivityItem {
            order_id: order.id,
            canonical_status: status,
            customer: order.customer_name.clone(),
            total: order.total.clone(),
            timestamp: order.created_at,
            time_elapsed_minutes,
            is_delayed,
            has_cancellation,
            has_discount,
            is_high_discount,
            discount_percentage: order.discount_percentage.clone(),
            items_count: order.items_count,
            actions,
        }
    }

    /// 优先处理订单; 写入失败或超时返回 false, 不向上抛错
    pub async fn prioritize_order(&self, order_id: i64) -> bool {
        let result = with_deadline(
            "prioritize order",
            self.ctx.fetch_timeout(),
            self.writer.prioritize(order_id),
        )
        .await;

        match result {
            Ok(true) => {
                tracing::info!("Order {} marked as priority", order_id);
                true
            }
            Ok(false) => {
                tracing::warn!("Order {} not found, nothing to prioritize", order_id);
                false
            }
            Err(e) => {
                tracing::error!("Prioritizing order {} failed: {}", order_id, e);
                false
            }
        }
    }
}
