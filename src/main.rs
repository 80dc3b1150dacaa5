use pos_order_metrics::api::{self, AppState};
use pos_order_metrics::db::{PgChangeSource, PgOrderRepository, PgOrderWriter};
use pos_order_metrics::service::{
    ActivityMonitor, ChangeSource, EngineContext, InMemoryChangeSource, LiveDashboard, RealtimeCoordinator,
    StatsAggregator, StatusClassifier, SynonymTable, SystemClock,
};
use pos_order_metrics::{create_pool, AppConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 创建数据库连接池
    let pool = create_pool(&config.database.url, config.database.max_connections).await?;
    info!("Database pool created");

    // 状态同义词表: 内置 + 配置扩展
    let mut synonyms = SynonymTable::builtin();
    synonyms.merge_config(&config.synonyms);
    let classifier = Arc::new(StatusClassifier::new(synonyms));

    let ctx = EngineContext::new(
        Arc::new(PgOrderRepository::new(pool.clone())),
        classifier.clone(),
        Arc::new(SystemClock),
        config.dashboard.clone(),
    );
    let aggregator = Arc::new(StatsAggregator::new(ctx.clone()));
    let monitor = Arc::new(ActivityMonitor::new(ctx.clone(), Arc::new(PgOrderWriter::new(pool.clone()))));

    // 实时通道关闭时使用空事件源, 看板只在启动和手动刷新时计算
    let source: Arc<dyn ChangeSource> = if config.realtime.enabled {
        Arc::new(PgChangeSource::new(pool, &config.realtime))
    } else {
        info!("Realtime updates disabled by config");
        Arc::new(InMemoryChangeSource::new())
    };
    let coordinator = RealtimeCoordinator::new(source);

    let dashboard = Arc::new(
        LiveDashboard::start(
            aggregator.clone(),
            monitor.clone(),
            &coordinator,
            config.dashboard.activity_limit,
            ctx.now(),
        )
        .await,
    );

    let state = AppState {
        dashboard: dashboard.clone(),
        aggregator,
        monitor,
        classifier,
    };
    let app = api::router(state);

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  GET  /api/dashboard/stats");
    info!("  GET  /api/dashboard/activity?limit=N");
    info!("  GET  /api/dashboard/sales/trailing?days=N");
    info!("  GET  /api/dashboard/classification-gaps");
    info!("  POST /api/orders/:id/prioritize");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    dashboard.shutdown();
    Ok(())
}
