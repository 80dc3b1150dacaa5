use crate::error::RepositoryError;
use crate::models::{OrderItemRecord, OrderRecord};
use async_trait::async_trait;
use sqlx::PgPool;

use super::queries;
use super::repository::{OrderQuery, OrderRepository, OrderWriter, StatusFilter};

/// PostgreSQL 订单仓储
#[derive(Debug, Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderRecord>, RepositoryError> {
        let orders = queries::list_orders(&self.pool, query).await?;
        tracing::debug!("Fetched {} orders ({:?})", orders.len(), query.range);
        Ok(orders)
    }

    async fn list_distinct_statuses(&self) -> Result<Vec<String>, RepositoryError> {
        Ok(queries::list_distinct_statuses(&self.pool).await?)
    }

    async fn list_order_items_by_parent_status(
        &self,
        filter: &StatusFilter,
    ) -> Result<Vec<OrderItemRecord>, RepositoryError> {
        let items = queries::list_order_items_by_parent_status(&self.pool, filter).await?;
        tracing::debug!("Fetched {} order items for {} statuses", items.len(), filter.as_slice().len());
        Ok(items)
    }
}

/// PostgreSQL 订单写入 (优先处理)
#[derive(Debug, Clone)]
pub struct PgOrderWriter {
    pool: PgPool,
}

impl PgOrderWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderWriter for PgOrderWriter {
    async fn prioritize(&self, order_id: i64) -> Result<bool, RepositoryError> {
        Ok(queries::mark_order_priority(&self.pool, order_id).await?)
    }
}
