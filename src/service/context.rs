use crate::config::DashboardConfig;
use crate::db::OrderRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::classifier::StatusClassifier;
use super::date_range::{Clock, DateRangeCalculator};

/// 引擎上下文: 时钟/仓储/分类器/参数, 显式注入到各服务
#[derive(Clone)]
pub struct EngineContext {
    pub repository: Arc<dyn OrderRepository>,
    pub classifier: Arc<StatusClassifier>,
    pub ranges: DateRangeCalculator,
    pub settings: DashboardConfig,
}

impl EngineContext {
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        classifier: Arc<StatusClassifier>,
        clock: Arc<dyn Clock>,
        settings: DashboardConfig,
    ) -> Self {
        let ranges = DateRangeCalculator::new(clock, settings.day_zone());
        Self {
            repository,
            classifier,
            ranges,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.ranges.now()
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.settings.fetch_timeout()
    }
}
