use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

/// 订单主表 (orders)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub total: BigDecimal,
    /// 原始状态文本 (自由输入, 多语言)
    #[sqlx(rename = "status")]
    #[serde(rename = "status")]
    pub raw_status: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub kitchen_id: Option<i64>,
    #[serde(default)]
    pub table_number: Option<i32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_delivery: bool,
    /// 折扣百分比 0-100
    #[serde(default, deserialize_with = "null_as_default")]
    pub discount_percentage: BigDecimal,
    /// 明细行数 (查询时统计, 变更通知中不携带)
    #[sqlx(default)]
    #[serde(default, deserialize_with = "null_as_default")]
    pub items_count: i64,
}

/// 变更通知中的 NULL 列按默认值处理
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl OrderRecord {
    pub fn new(id: i64, total: BigDecimal, raw_status: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            total,
            raw_status: raw_status.into(),
            created_at,
            updated_at: None,
            customer_name: None,
            kitchen_id: None,
            table_number: None,
            is_delivery: false,
            discount_percentage: BigDecimal::from(0),
            items_count: 0,
        }
    }

    pub fn with_customer(mut self, name: impl Into<String>) -> Self {
        self.customer_name = Some(name.into());
        self
    }

    pub fn with_discount(mut self, percentage: BigDecimal) -> Self {
        self.discount_percentage = percentage;
        self
    }
}

/// 订单明细表 (order_items), 联表时附带父订单的状态/创建时间/厨房
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: i64,
    #[serde(default)]
    pub menu_item_id: Option<i64>,
    pub name: String,
    pub quantity: i64,
    pub price: BigDecimal,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub parent_status: Option<String>,
    #[serde(default)]
    pub parent_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_kitchen_id: Option<i64>,
}

impl OrderItemRecord {
    pub fn new(id: i64, order_id: i64, name: impl Into<String>, quantity: i64, price: BigDecimal) -> Self {
        Self {
            id,
            order_id,
            menu_item_id: None,
            name: name.into(),
            quantity,
            price,
            notes: None,
            parent_status: None,
            parent_created_at: None,
            parent_kitchen_id: None,
        }
    }

    pub fn with_menu_item(mut self, menu_item_id: i64) -> Self {
        self.menu_item_id = Some(menu_item_id);
        self
    }

    /// 附带父订单信息 (模拟联表结果)
    pub fn joined_with(mut self, parent: &OrderRecord) -> Self {
        self.parent_status = Some(parent.raw_status.clone());
        self.parent_created_at = Some(parent.created_at);
        self.parent_kitchen_id = parent.kitchen_id;
        self
    }
}
