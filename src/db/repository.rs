use crate::error::RepositoryError;
use crate::models::{DateRange, OrderItemRecord, OrderRecord};
use crate::service::classifier::normalize;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// 原始状态过滤条件 (规范化后的原始文本集合)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusFilter {
    statuses: Vec<String>,
}

impl StatusFilter {
    pub fn new<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut statuses: Vec<String> = statuses.into_iter().map(|s| normalize(s.as_ref())).collect();
        statuses.sort();
        statuses.dedup();
        Self { statuses }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.statuses
    }

    pub fn matches(&self, raw_status: &str) -> bool {
        let normalized = normalize(raw_status);
        self.statuses.iter().any(|s| *s == normalized)
    }
}

/// 订单查询条件; 结果按创建时间倒序
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub range: Option<DateRange>,
    pub status_filter: Option<StatusFilter>,
    pub limit: Option<usize>,
}

impl OrderQuery {
    pub fn in_range(range: DateRange) -> Self {
        Self {
            range: Some(range),
            ..Self::default()
        }
    }

    /// 最近 limit 条订单, 不限状态
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, filter: StatusFilter) -> Self {
        self.status_filter = Some(filter);
        self
    }

    /// 内存实现共用的过滤逻辑
    pub fn accepts(&self, order: &OrderRecord) -> bool {
        let in_range = self.range.map_or(true, |r| r.contains(order.created_at));
        let status_ok = self
            .status_filter
            .as_ref()
            .map_or(true, |f| f.matches(&order.raw_status));
        in_range && status_ok
    }
}

/// 订单只读仓储 (由持久层提供)
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<OrderRecord>, RepositoryError>;

    /// 订单表中出现过的全部原始状态 (去重)
    async fn list_distinct_statuses(&self) -> Result<Vec<String>, RepositoryError>;

    /// 订单明细, 附带父订单状态/创建时间/厨房
    async fn list_order_items_by_parent_status(
        &self,
        filter: &StatusFilter,
    ) -> Result<Vec<OrderItemRecord>, RepositoryError>;
}

/// 订单写入协作方 (优先处理)
#[async_trait]
pub trait OrderWriter: Send + Sync {
    /// 返回订单是否存在并被标记
    async fn prioritize(&self, order_id: i64) -> Result<bool, RepositoryError>;
}

/// 为单次读取加上截止时间, 超时返回 RepositoryError::Timeout
pub async fn with_deadline<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    let started = std::time::Instant::now();
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => {
            tracing::debug!("{} finished in {:?}", operation, started.elapsed());
            result
        }
        Err(_) => {
            tracing::error!("✗ {} timed out (>{:?})", operation, timeout);
            Err(RepositoryError::Timeout { operation, timeout })
        }
    }
}
