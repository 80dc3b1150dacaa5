use crate::config::RealtimeConfig;
use crate::error::SubscriptionError;
use crate::models::{ChangeEvent, ChangeTable};
use crate::service::realtime::{ChangeHandler, ChangeSource, ChannelHandle};
use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 重连失败后的退避: 从 1 秒起翻倍, 上限 30 秒
const LISTENER_RETRY_INITIAL: Duration = Duration::from_secs(1);
const LISTENER_RETRY_MAX: Duration = Duration::from_secs(30);

/// 基于 LISTEN/NOTIFY 的变更事件源 (触发器见 sql/notify_triggers.sql)
#[derive(Debug, Clone)]
pub struct PgChangeSource {
    pool: PgPool,
    orders_channel: String,
    order_items_channel: String,
}

impl PgChangeSource {
    pub fn new(pool: PgPool, config: &RealtimeConfig) -> Self {
        Self {
            pool,
            orders_channel: config.orders_channel.clone(),
            order_items_channel: config.order_items_channel.clone(),
        }
    }

    fn channel_for(&self, table: ChangeTable) -> &str {
        match table {
            ChangeTable::Orders => &self.orders_channel,
            ChangeTable::OrderItems => &self.order_items_channel,
        }
    }
}

#[async_trait]
impl ChangeSource for PgChangeSource {
    async fn subscribe(&self, table: ChangeTable, handler: ChangeHandler) -> Result<ChannelHandle, SubscriptionError> {
        let channel = self.channel_for(table).to_string();

        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener
            .listen(&channel)
            .await
            .map_err(|e| SubscriptionError::Establish {
                channel: channel.clone(),
                reason: e.to_string(),
            })?;
        tracing::info!("Listening on {} for {} changes", channel, table);

        let open = Arc::new(AtomicBool::new(true));
        let task = {
            let open = open.clone();
            tokio::spawn(async move {
                let mut backoff = LISTENER_RETRY_INITIAL;
                // recv 会在下一次调用时自动重连并重新 LISTEN, 出错后继续循环即可
                loop {
                    match listener.recv().await {
                        Ok(notification) => {
                            if !open.swap(true, Ordering::SeqCst) {
                                tracing::info!("✓ Listener on {} reconnected", channel);
                            }
                            backoff = LISTENER_RETRY_INITIAL;
                            handler(ChangeEvent::from_notification_lossy(table, notification.payload()));
                        }
                        Err(e) => {
                            open.store(false, Ordering::SeqCst);
                            tracing::warn!("✗ Listener on {} failed, retrying in {:?}: {}", channel, backoff, e);
                            tokio::time::sleep(backoff).await;
                            backoff = (backoff * 2).min(LISTENER_RETRY_MAX);
                        }
                    }
                }
            })
        };

        Ok(ChannelHandle::new(table, open, move || task.abort()))
    }
}
