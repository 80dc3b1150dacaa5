use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CanonicalStatus;

/// 建议操作的严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Default,
    Warning,
    Danger,
}

/// 建议操作
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDescriptor {
    pub label: String,
    pub action_code: String,
    pub severity: Severity,
}

impl ActionDescriptor {
    pub fn new(label: &str, verb: &str, order_id: i64, severity: Severity) -> Self {
        Self {
            label: label.to_string(),
            action_code: format!("{}:{}", verb, order_id),
            severity,
        }
    }
}

/// 活动流条目: 一条订单 + 异常标记 + 建议操作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub order_id: i64,
    pub canonical_status: CanonicalStatus,
    pub customer: Option<String>,
    pub total: BigDecimal,
    pub timestamp: DateTime<Utc>,
    pub time_elapsed_minutes: i64,
    pub is_delayed: bool,
    pub has_cancellation: bool,
    pub has_discount: bool,
    pub is_high_discount: bool,
    pub discount_percentage: BigDecimal,
    pub items_count: i64,
    pub actions: Vec<ActionDescriptor>,
}

impl ActivityItem {
    pub fn has_action(&self, verb: &str) -> bool {
        let prefix = format!("{}:", verb);
        self.actions.iter().any(|a| a.action_code.starts_with(&prefix))
    }
}
