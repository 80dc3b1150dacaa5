//! 实时变更订阅与重算调度
//!
//! `RealtimeCoordinator` 同时订阅订单与订单明细两个通道, 任一通道有变更即回调;
//! `RecomputeScheduler` 保证同一时刻最多一次重算在执行, 期间到达的请求合并为一次后续重算。

use crate::error::SubscriptionError;
use crate::models::{ChangeEvent, ChangeTable};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// 变更事件回调
pub type ChangeHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// 已建立的单个通道, close 或 drop 时释放
/// open 由事件源维护: 连接断开期间为 false
pub struct ChannelHandle {
    table: ChangeTable,
    open: Arc<AtomicBool>,
    close: Option<Box<dyn FnOnce() + Send>>,
}

impl ChannelHandle {
    pub fn new(table: ChangeTable, open: Arc<AtomicBool>, close: impl FnOnce() + Send + 'static) -> Self {
        Self {
            table,
            open,
            close: Some(Box::new(close)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.close.is_some() && self.open.load(Ordering::SeqCst)
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(close) = self.close.take() {
            self.open.store(false, Ordering::SeqCst);
            close();
            tracing::debug!("Closed {} change channel", self.table);
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// 变更事件源 (由外部实时服务提供)
#[async_trait]
pub trait ChangeSource: Send + Sync {
    async fn subscribe(&self, table: ChangeTable, handler: ChangeHandler) -> Result<ChannelHandle, SubscriptionError>;
}

/// 订阅句柄: unsubscribe 幂等, drop 时自动释放
pub struct SubscriptionGuard {
    channels: Mutex<Vec<ChannelHandle>>,
    active: Arc<AtomicBool>,
    events: Arc<AtomicU64>,
}

impl SubscriptionGuard {
    /// 订阅失败时的空句柄: 无实时更新
    pub fn inactive() -> Self {
        Self {
            channels: Mutex::new(Vec::new()),
            active: Arc::new(AtomicBool::new(false)),
            events: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn unsubscribe(&self) {
        self.active.store(false, Ordering::SeqCst);
        let channels = std::mem::take(&mut *self.channels.lock());
        if !channels.is_empty() {
            tracing::info!("Unsubscribing from {} change channels", channels.len());
        }
        for channel in channels {
            channel.close();
        }
    }

    /// 已订阅且所有通道当前连通
    pub fn is_live(&self) -> bool {
        self.active.load(Ordering::SeqCst) && self.channels.lock().iter().all(ChannelHandle::is_open)
    }

    /// 已转发的事件数
    pub fn events_received(&self) -> u64 {
        self.events.load(Ordering::SeqCst)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// 将变更事件源桥接到重算回调
pub struct RealtimeCoordinator {
    source: Arc<dyn ChangeSource>,
}

impl RealtimeCoordinator {
    pub fn new(source: Arc<dyn ChangeSource>) -> Self {
        Self { source }
    }

    /// 订阅订单与订单明细变更; 任一通道建立失败则释放已建立的通道并返回空句柄
    pub async fn subscribe<F>(&self, on_change: F) -> SubscriptionGuard
    where
        F: Fn() + Send + Sync + 'static,
    {
        let on_change = Arc::new(on_change);
        let active = Arc::new(AtomicBool::new(true));
        let events = Arc::new(AtomicU64::new(0));
        let mut channels = Vec::with_capacity(ChangeTable::ALL.len());

        for table in ChangeTable::ALL {
            let handler: ChangeHandler = {
                let on_change = on_change.clone();
                let active = active.clone();
                let events = events.clone();
                Arc::new(move |event: ChangeEvent| {
                    // 退订后仍在途的事件直接丢弃
                    if !active.load(Ordering::SeqCst) {
                        return;
                    }
                    events.fetch_add(1, Ordering::SeqCst);
                    tracing::trace!("{} {} event received", event.table(), event.kind());
                    on_change();
                })
            };

            match self.source.subscribe(table, handler).await {
                Ok(channel) => channels.push(channel),
                Err(e) => {
                    tracing::warn!("Live updates disabled, {} subscription failed: {}", table, e);
                    active.store(false, Ordering::SeqCst);
                    for channel in channels {
                        channel.close();
                    }
                    return SubscriptionGuard::inactive();
                }
            }
        }

        tracing::info!("Subscribed to {} change channels", channels.len());
        SubscriptionGuard {
            channels: Mutex::new(channels),
            active,
            events,
        }
    }
}

/// 触发器 (可克隆, 供变更回调使用)
#[derive(Clone)]
pub struct RecomputeTrigger {
    notify: Arc<Notify>,
}

impl RecomputeTrigger {
    /// Notify 最多保存一个许可, 连续触发自然合并
    pub fn fire(&self) {
        self.notify.notify_one();
    }
}

/// 重算调度: 最多一个在执行 + 一个待执行
pub struct RecomputeScheduler {
    trigger: RecomputeTrigger,
    runs: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl RecomputeScheduler {
    pub fn spawn<F, Fut>(job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let notify = Arc::new(Notify::new());
        let runs = Arc::new(AtomicU64::new(0));

        let task = {
            let notify = notify.clone();
            let runs = runs.clone();
            tokio::spawn(async move {
                loop {
                    notify.notified().await;
                    job().await;
                    let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::debug!("Recompute #{} finished", n);
                }
            })
        };

        Self {
            trigger: RecomputeTrigger { notify },
            runs,
            task,
        }
    }

    pub fn trigger(&self) {
        self.trigger.fire();
    }

    pub fn trigger_handle(&self) -> RecomputeTrigger {
        self.trigger.clone()
    }

    /// 已完成的重算次数
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for RecomputeScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Registration {
    id: u64,
    table: ChangeTable,
    handler: ChangeHandler,
    open: Arc<AtomicBool>,
}

/// 进程内事件源: publish 同步调用已注册的回调
#[derive(Default)]
pub struct InMemoryChangeSource {
    handlers: Arc<Mutex<Vec<Registration>>>,
    next_id: AtomicU64,
    fail_tables: Mutex<Vec<ChangeTable>>,
}

impl InMemoryChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后对该表的订阅失败
    pub fn fail_on(&self, table: ChangeTable) {
        self.fail_tables.lock().push(table);
    }

    pub fn publish(&self, event: ChangeEvent) {
        let table = event.table();
        let handlers: Vec<ChangeHandler> = self
            .handlers
            .lock()
            .iter()
            .filter(|r| r.table == table)
            .map(|r| r.handler.clone())
            .collect();
        for handler in handlers {
            handler(event.clone());
        }
    }

    /// 模拟连接断开: 该表的通道不再连通, 事件也不再投递
    pub fn disconnect(&self, table: ChangeTable) {
        let mut handlers = self.handlers.lock();
        for registration in handlers.iter().filter(|r| r.table == table) {
            registration.open.store(false, Ordering::SeqCst);
        }
        handlers.retain(|r| r.table != table);
    }

    /// 当前注册的通道数
    pub fn listener_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

#[async_trait]
impl ChangeSource for InMemoryChangeSource {
    async fn subscribe(&self, table: ChangeTable, handler: ChangeHandler) -> Result<ChannelHandle, SubscriptionError> {
        if self.fail_tables.lock().contains(&table) {
            return Err(SubscriptionError::Establish {
                channel: table.to_string(),
                reason: "channel refused".to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let open = Arc::new(AtomicBool::new(true));
        self.handlers.lock().push(Registration {
            id,
            table,
            handler,
            open: open.clone(),
        });

        let handlers = self.handlers.clone();
        Ok(ChannelHandle::new(table, open, move || {
            handlers.lock().retain(|r| r.id != id);
        }))
    }
}
