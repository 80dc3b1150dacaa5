use crate::error::RepositoryError;
use std::future::Future;

/// 执行一次可失败的计算; 失败时记录日志并返回 fallback
/// 聚合与活动流的默认值边界都走这里
pub async fn safe_compute<T, F, D>(operation: &'static str, fut: F, fallback: D) -> T
where
    F: Future<Output = Result<T, RepositoryError>>,
    D: FnOnce() -> T,
{
    match fut.await {
        Ok(value) => value,
        Err(e) if e.is_timeout() => {
            tracing::warn!("{} timed out, serving default: {}", operation, e);
            fallback()
        }
        Err(e) => {
            tracing::error!("{} failed, serving default: {}", operation, e);
            fallback()
        }
    }
}
