use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 销售统计 (口径: 今日下单的全部订单, 不区分状态)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub daily_total: BigDecimal,
    pub transaction_count: i64,
    pub average_ticket: BigDecimal,
    pub change_percentage: f64,
    pub last_updated: DateTime<Utc>,
}

impl SalesStats {
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            daily_total: BigDecimal::zero(),
            transaction_count: 0,
            average_ticket: BigDecimal::zero(),
            change_percentage: 0.0,
            last_updated: now,
        }
    }
}

/// 订单状态统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersStats {
    /// = pending_orders + in_preparation_orders (不含 ready)
    pub active_orders: i64,
    pub pending_orders: i64,
    pub in_preparation_orders: i64,
    pub ready_orders: i64,
    pub last_updated: DateTime<Utc>,
}

impl OrdersStats {
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            active_orders: 0,
            pending_orders: 0,
            in_preparation_orders: 0,
            ready_orders: 0,
            last_updated: now,
        }
    }
}

/// 顾客统计 (按姓名去重, 忽略大小写)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomersStats {
    pub today_count: i64,
    pub change_percentage: f64,
    pub last_updated: DateTime<Utc>,
}

impl CustomersStats {
    pub fn zero(now: DateTime<Utc>) -> Self {
        Self {
            today_count: 0,
            change_percentage: 0.0,
            last_updated: now,
        }
    }
}

/// 热销菜品 (口径: 已完成订单)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularItem {
    pub id: String,
    pub name: String,
    pub quantity: i64,
}

/// 一次聚合的完整结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// false 表示后端读取失败, 数值为默认零值
    pub available: bool,
    pub sales: SalesStats,
    pub orders: OrdersStats,
    pub customers: CustomersStats,
    pub popular_items: Vec<PopularItem>,
    pub generated_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// 读取失败时返回的零值快照
    pub fn unavailable(now: DateTime<Utc>) -> Self {
        Self {
            available: false,
            sales: SalesStats::zero(now),
            orders: OrdersStats::zero(now),
            customers: CustomersStats::zero(now),
            popular_items: Vec::new(),
            generated_at: now,
        }
    }
}
