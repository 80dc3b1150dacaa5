use crate::service::date_range::DayZone;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "POS_METRICS_CONFIG";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub dashboard: DashboardConfig,
    pub realtime: RealtimeConfig,
    /// 额外状态同义词: 状态桶名 -> 原始文本列表
    #[serde(default)]
    pub synonyms: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 看板计算参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// 待处理/制作中超过该分钟数视为延误
    pub delay_threshold_minutes: i64,
    /// 折扣百分比达到该值需要复核
    pub high_discount_threshold: u32,
    /// 活动流默认条数
    pub activity_limit: usize,
    pub max_activity_limit: usize,
    /// 单次查询截止时间 (毫秒)
    pub fetch_timeout_ms: u64,
    /// 本地时区偏移 (分钟), 未设置时按主机时区 (含夏令时) 逐次解析
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// 实时通知通道
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub enabled: bool,
    pub orders_channel: String,
    pub order_items_channel: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/restaurant_pos".to_string()),
                max_connections: 10,
            },
            dashboard: DashboardConfig::default(),
            realtime: RealtimeConfig::default(),
            synonyms: HashMap::new(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            delay_threshold_minutes: 15,
            high_discount_threshold: 15,
            activity_limit: 20,
            max_activity_limit: 100,
            fetch_timeout_ms: 5_000,
            utc_offset_minutes: None,
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            orders_channel: "orders_changes".to_string(),
            order_items_channel: "order_items_changes".to_string(),
        }
    }
}

impl AppConfig {
    /// 加载配置: 内置默认值 -> 配置文件 (可选) -> POS__ 前缀环境变量
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "pos-metrics".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("POS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl DashboardConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// 自然日时区; 未配置或偏移非法时使用主机时区
    pub fn day_zone(&self) -> DayZone {
        match self.utc_offset_minutes.map(|minutes| FixedOffset::east_opt(minutes * 60)) {
            Some(Some(offset)) => DayZone::Fixed(offset),
            Some(None) => {
                tracing::warn!("Invalid utc_offset_minutes {:?}, using host time zone", self.utc_offset_minutes);
                DayZone::Host
            }
            None => DayZone::Host,
        }
    }
}
