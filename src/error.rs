use std::time::Duration;
use thiserror::Error;

/// 仓储层错误 (读取订单/订单明细失败)
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库 I/O 失败
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),

    /// 单次查询超过截止时间
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// 后端不可用 (非 sqlx 的存储实现使用)
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RepositoryError::Timeout { .. })
    }
}

/// 变更事件订阅错误
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("failed to subscribe to {channel}: {reason}")]
    Establish { channel: String, reason: String },

    #[error("listener error: {0}")]
    Backend(#[from] sqlx::Error),
}
