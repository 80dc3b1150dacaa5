use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use crate::db::{with_deadline, OrderQuery, StatusFilter};
use crate::error::RepositoryError;
use crate::models::{
    CanonicalStatus, CustomersStats, OrderItemRecord, OrderRecord, OrdersStats, PopularItem, SalesStats,
    StatsSnapshot,
};
use chrono::{DateTime, Utc};
use futures::future::{try_join, try_join3};
use std::collections::{HashMap, HashSet};

use super::context::EngineContext;
use super::safe::safe_compute;

/// "已完成订单" 口径对应的状态桶 (热销菜品只统计该桶)
/// 注意与销售口径不同: 销售统计今日全部订单, 不看状态
pub const COMPLETED_BUCKET: CanonicalStatus = CanonicalStatus::Ready;

/// 热销菜品条数
pub const POPULAR_ITEMS_LIMIT: usize = 5;

pub const MAX_TRAILING_DAYS: u32 = 366;

/// 看板统计聚合
pub struct StatsAggregator {
    ctx: EngineContext,
}

impl StatsAggregator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// 计算统计快照; 后端失败时返回 available=false 的零值快照
    pub async fn compute_stats(&self) -> StatsSnapshot {
        safe_compute("compute stats", self.try_compute_stats(), || {
            StatsSnapshot::unavailable(self.ctx.now())
        })
        .await
    }

    pub async fn try_compute_stats(&self) -> Result<StatsSnapshot, RepositoryError> {
        let today = self.ctx.ranges.today_range();
        let yesterday = self.ctx.ranges.yesterday_range(today.start);
        let timeout = self.ctx.fetch_timeout();
        let repo = &self.ctx.repository;

        let today_query = OrderQuery::in_range(today);
        let yesterday_query = OrderQuery::in_range(yesterday);

        // 第一阶段: 三个读取互不依赖, 并发执行
        let (all_orders_today, orders_yesterday, statuses) = try_join3(
            with_deadline("list today's orders", timeout, repo.list_orders(&today_query)),
            with_deadline("list yesterday's orders", timeout, repo.list_orders(&yesterday_query)),
            with_deadline("list order statuses", timeout, repo.list_distinct_statuses()),
        )
        .await?;

        // 第二阶段: 按实际分类为已完成的原始状态取明细
        let completed_filter = self.completed_filter(&statuses);
        let completed_items = with_deadline(
            "list completed order items",
            timeout,
            repo.list_order_items_by_parent_status(&completed_filter),
        )
        .await?;

        let now = self.ctx.now();
        let snapshot = StatsSnapshot {
            available: true,
            sales: sales_stats(&all_orders_today, &orders_yesterday, now),
            orders: self.orders_stats(&all_orders_today, now),
            customers: customers_stats(&all_orders_today, &orders_yesterday, now),
            popular_items: self.popular_items(&completed_items),
            generated_at: now,
        };

        tracing::info!(
            "Stats computed: {} orders today, {} active, total {}",
            snapshot.sales.transaction_count,
            snapshot.orders.active_orders,
            snapshot.sales.daily_total
        );
        Ok(snapshot)
    }

    /// 最近 days 天 (截止今日结束) 的销售, 与之前等长区间对比
    pub async fn try_trailing_sales(&self, days: u32) -> Result<SalesStats, RepositoryError> {
        let days = days.clamp(1, MAX_TRAILING_DAYS);
        let today = self.ctx.ranges.today_range();
        let window = self.ctx.ranges.trailing_window(days, today.end);
        let previous = window.preceding();
        let timeout = self.ctx.fetch_timeout();
        let repo = &self.ctx.repository;

        let current_query = OrderQuery::in_range(window);
        let previous_query = OrderQuery::in_range(previous);
        let (current, baseline) = try_join(
            with_deadline("list trailing orders", timeout, repo.list_orders(&current_query)),
            with_deadline("list preceding orders", timeout, repo.list_orders(&previous_query)),
        )
        .await?;

        Ok(sales_stats(&current, &baseline, self.ctx.now()))
    }

    /// 同义词 + 观测到的原始状态中分类为已完成的部分 (含子串回退命中的)
    pub fn completed_filter(&self, observed: &[String]) -> StatusFilter {
        let classifier = &self.ctx.classifier;
        let matched = observed
            .iter()
            .filter(|raw| classifier.classify_untracked(raw) == COMPLETED_BUCKET)
            .cloned();
        StatusFilter::new(classifier.table().synonyms_for(COMPLETED_BUCKET).into_iter().chain(matched))
    }

    /// 按状态桶计数; active 只含待处理 + 制作中
    pub fn orders_stats(&self, orders: &[OrderRecord], now: DateTime<Utc>) -> OrdersStats {
        let mut stats = OrdersStats::zero(now);
        for order in orders {
            match self.ctx.classifier.classify(&order.raw_status) {
                CanonicalStatus::Pending => stats.pending_orders += 1,
                CanonicalStatus::Preparing => stats.in_preparation_orders += 1,
                CanonicalStatus::Ready => stats.ready_orders += 1,
                _ => {}
            }
        }
        stats.active_orders = stats.pending_orders + stats.in_preparation_orders;
        stats
    }

    /// 按菜品 (menu_item_id, 缺失时按名称) 汇总数量, 取前 5
    pub fn popular_items(&self, items: &[OrderItemRecord]) -> Vec<PopularItem> {
        let mut grouped: HashMap<String, PopularItem> = HashMap::new();

        for item in items {
            // 仓储已按原始状态预过滤, 这里再按分类结果确认 (规范化后相同的文本分类也相同)
            if let Some(parent_status) = &item.parent_status {
                if self.ctx.classifier.classify(parent_status) != COMPLETED_BUCKET {
                    continue;
                }
            }

            let id = match item.menu_item_id {
                Some(menu_item_id) => menu_item_id.to_string(),
                None => item.name.trim().to_lowercase(),
            };
            let entry = grouped.entry(id.clone()).or_insert_with(|| PopularItem {
                id,
                name: item.name.clone(),
                quantity: 0,
            });
            entry.quantity += item.quantity;
            if item.name < entry.name {
                entry.name = item.name.clone();
            }
        }

        let mut popular: Vec<PopularItem> = grouped.into_values().collect();
        popular.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        popular.truncate(POPULAR_ITEMS_LIMIT);
        popular
    }
}

/// 销售统计: 今日全部订单金额 (不区分状态)
pub fn sales_stats(today: &[OrderRecord], yesterday: &[OrderRecord], now: DateTime<Utc>) -> SalesStats {
    let daily_total = sum_totals(today);
    let yesterday_total = sum_totals(yesterday);
    let transaction_count = today.len() as i64;

    let average_ticket = if transaction_count > 0 {
        &daily_total / BigDecimal::from(transaction_count)
    } else {
        BigDecimal::zero()
    };

    SalesStats {
        change_percentage: change_percentage(&daily_total, &yesterday_total),
        daily_total,
        transaction_count,
        average_ticket,
        last_updated: now,
    }
}

pub fn customers_stats(today: &[OrderRecord], yesterday: &[OrderRecord], now: DateTime<Utc>) -> CustomersStats {
    let today_count = unique_customers(today).len() as i64;
    let yesterday_count = unique_customers(yesterday).len() as i64;

    CustomersStats {
        today_count,
        change_percentage: change_percentage(&BigDecimal::from(today_count), &BigDecimal::from(yesterday_count)),
        last_updated: now,
    }
}

/// 顾客姓名去重 (忽略大小写与首尾空白, 空名不计)
pub fn unique_customers(orders: &[OrderRecord]) -> HashSet<String> {
    orders
        .iter()
        .filter_map(|o| o.customer_name.as_deref())
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// 相对变化百分比 (不取整, 展示层自行格式化), 基数不为正时为 0
pub fn change_percentage(current: &BigDecimal, baseline: &BigDecimal) -> f64 {
    if *baseline <= BigDecimal::zero() {
        return 0.0;
    }
    let ratio = (current - baseline) / baseline * BigDecimal::from(100);
    ratio.to_f64().filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn sum_totals(orders: &[OrderRecord]) -> BigDecimal {
    orders.iter().fold(BigDecimal::zero(), |acc, o| acc + &o.total)
}
