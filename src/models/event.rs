use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;

use super::{OrderItemRecord, OrderRecord};

/// 订阅的数据表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeTable {
    Orders,
    OrderItems,
}

impl ChangeTable {
    pub const ALL: [ChangeTable; 2] = [ChangeTable::Orders, ChangeTable::OrderItems];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeTable::Orders => "orders",
            ChangeTable::OrderItems => "order_items",
        }
    }
}

impl fmt::Display for ChangeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单行变更: 携带变更前/后的强类型快照
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange<T> {
    Insert { current: T },
    Update { previous: Option<T>, current: T },
    Delete { previous: Option<T> },
}

impl<T> RowChange<T> {
    pub fn kind(&self) -> &'static str {
        match self {
            RowChange::Insert { .. } => "insert",
            RowChange::Update { .. } => "update",
            RowChange::Delete { .. } => "delete",
        }
    }

    pub fn current(&self) -> Option<&T> {
        match self {
            RowChange::Insert { current } | RowChange::Update { current, .. } => Some(current),
            RowChange::Delete { .. } => None,
        }
    }
}

/// 变更事件
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Order(RowChange<OrderRecord>),
    OrderItem(RowChange<OrderItemRecord>),
    /// 行确实变了, 但负载无法解析 (列类型漂移等); 仍需触发重算
    Opaque { table: ChangeTable },
}

impl ChangeEvent {
    pub fn table(&self) -> ChangeTable {
        match self {
            ChangeEvent::Order(_) => ChangeTable::Orders,
            ChangeEvent::OrderItem(_) => ChangeTable::OrderItems,
            ChangeEvent::Opaque { table } => *table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChangeEvent::Order(change) => change.kind(),
            ChangeEvent::OrderItem(change) => change.kind(),
            ChangeEvent::Opaque { .. } => "unparsed",
        }
    }

    /// 解析触发器发出的 NOTIFY 负载
    /// 格式: {"op": "INSERT"|"UPDATE"|"DELETE", "old": {...}, "new": {...}}
    pub fn from_notification(table: ChangeTable, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match table {
            ChangeTable::Orders => ChangeEvent::Order(decode_row_change(payload)?),
            ChangeTable::OrderItems => ChangeEvent::OrderItem(decode_row_change(payload)?),
        })
    }

    /// 同 from_notification, 解析失败时记录告警并退化为 Opaque
    pub fn from_notification_lossy(table: ChangeTable, payload: &str) -> Self {
        Self::from_notification(table, payload).unwrap_or_else(|e| {
            tracing::warn!("Undecodable {} change payload, refreshing anyway: {}", table, e);
            ChangeEvent::Opaque { table }
        })
    }
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "UPPERCASE")]
enum WirePayload<T> {
    Insert {
        new: T,
    },
    Update {
        old: Option<T>,
        new: T,
    },
    Delete {
        old: Option<T>,
    },
}

fn decode_row_change<T: DeserializeOwned>(payload: &str) -> Result<RowChange<T>, serde_json::Error> {
    let wire: WirePayload<T> = serde_json::from_str(payload)?;
    Ok(match wire {
        WirePayload::Insert { new } => RowChange::Insert { current: new },
        WirePayload::Update { old, new } => RowChange::Update {
            previous: old,
            current: new,
        },
        WirePayload::Delete { old } => RowChange::Delete { previous: old },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[test]
    fn test_decode_order_update() {
        let payload = r#"{
            "op": "UPDATE",
            "old": {"id": 7, "total": "12.50", "status": "pendiente", "created_at": "2026-03-01T10:00:00Z"},
            "new": {"id": 7, "total": "12.50", "status": "listo", "created_at": "2026-03-01T10:00:00Z",
                    "customer_name": "Ana", "discount_percentage": "0"}
        }"#;

        let event = ChangeEvent::from_notification(ChangeTable::Orders, payload).unwrap();
        assert_eq!(event.table(), ChangeTable::Orders);
        assert_eq!(event.kind(), "update");

        match event {
            ChangeEvent::Order(RowChange::Update { previous, current }) => {
                assert_eq!(previous.unwrap().raw_status, "pendiente");
                assert_eq!(current.raw_status, "listo");
                assert_eq!(current.customer_name.as_deref(), Some("Ana"));
                assert_eq!(current.items_count, 0);
                assert_eq!(current.total, "12.50".parse::<BigDecimal>().unwrap());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_item_delete_without_old_row() {
        let event = ChangeEvent::from_notification(ChangeTable::OrderItems, r#"{"op": "DELETE"}"#).unwrap();
        assert_eq!(event, ChangeEvent::OrderItem(RowChange::Delete { previous: None }));
    }

    #[test]
    fn test_decode_update_without_old_row() {
        let payload = r#"{"op": "UPDATE", "new": {"id": 3, "total": "5", "status": "listo", "created_at": "2026-03-01T10:00:00Z"}}"#;
        match ChangeEvent::from_notification(ChangeTable::Orders, payload).unwrap() {
            ChangeEvent::Order(RowChange::Update { previous, current }) => {
                assert!(previous.is_none());
                assert_eq!(current.id, 3);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_column_drift_still_yields_event() {
        // kitchen_id 变成 uuid 后强类型解析失败, 但变更本身不能丢
        let payload = r#"{"op": "INSERT", "new": {"id": 9, "total": "5", "status": "listo",
            "created_at": "2026-03-01T10:00:00Z", "kitchen_id": "b5c0e7f2-3a1d-4c55-9a0e-6f1f2b7c8d90"}}"#;
        assert!(ChangeEvent::from_notification(ChangeTable::Orders, payload).is_err());

        let event = ChangeEvent::from_notification_lossy(ChangeTable::Orders, payload);
        assert_eq!(event, ChangeEvent::Opaque { table: ChangeTable::Orders });
        assert_eq!(event.table(), ChangeTable::Orders);
        assert_eq!(event.kind(), "unparsed");
    }

    #[test]
    fn test_decode_rejects_unknown_op() {
        let result = ChangeEvent::from_notification(ChangeTable::Orders, r#"{"op": "TRUNCATE"}"#);
        assert!(result.is_err());
    }
}
