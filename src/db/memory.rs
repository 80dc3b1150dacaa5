//! 内存仓储: 测试与嵌入式使用, 支持注入故障与延迟

use crate::error::RepositoryError;
use crate::models::{OrderItemRecord, OrderRecord};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::repository::{OrderQuery, OrderRepository, OrderWriter, StatusFilter};

#[derive(Debug, Default)]
pub struct MemoryOrderRepository {
    orders: RwLock<Vec<OrderRecord>>,
    items: RwLock<Vec<OrderItemRecord>>,
    prioritized: RwLock<HashSet<i64>>,
    failure: RwLock<Option<String>>,
    latency: RwLock<Option<Duration>>,
    calls: AtomicUsize,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<OrderRecord>) -> Self {
        let repo = Self::new();
        *repo.orders.write() = orders;
        repo
    }

    pub fn insert_order(&self, order: OrderRecord) {
        self.orders.write().push(order);
    }

    pub fn insert_item(&self, item: OrderItemRecord) {
        self.items.write().push(item);
    }

    /// 之后的读取全部失败
    pub fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.write() = Some(reason.into());
    }

    /// 每次读取前等待
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// 读取调用次数
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_prioritized(&self, order_id: i64) -> bool {
        self.prioritized.read().contains(&order_id)
    }

    async fn before_read(&self) -> Result<(), RepositoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match self.failure.read().as_ref() {
            Some(reason) => Err(RepositoryError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.before_read().await?;

        let mut orders: Vec<OrderRecord> = self
            .orders
            .read()
            .iter()
            .filter(|o| query.accepts(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        if let Some(limit) = query.limit {
            orders.truncate(limit);
        }
        Ok(orders)
    }

    async fn list_distinct_statuses(&self) -> Result<Vec<String>, RepositoryError> {
        self.before_read().await?;

        let statuses: BTreeSet<String> = self.orders.read().iter().map(|o| o.raw_status.clone()).collect();
        Ok(statuses.into_iter().collect())
    }

    async fn list_order_items_by_parent_status(
        &self,
        filter: &StatusFilter,
    ) -> Result<Vec<OrderItemRecord>, RepositoryError> {
        self.before_read().await?;

        let orders = self.orders.read();
        let items = self.items.read();
        Ok(items
            .iter()
            .filter_map(|item| {
                let parent = orders.iter().find(|o| o.id == item.order_id)?;
                filter
                    .matches(&parent.raw_status)
                    .then(|| item.clone().joined_with(parent))
            })
            .collect())
    }
}

#[async_trait]
impl OrderWriter for MemoryOrderRepository {
    async fn prioritize(&self, order_id: i64) -> Result<bool, RepositoryError> {
        self.before_read().await?;
        let exists = self.orders.read().iter().any(|o| o.id == order_id);
        if exists {
            self.prioritized.write().insert(order_id);
        }
        Ok(exists)
    }
}
