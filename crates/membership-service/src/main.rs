//! 会员与促销服务入口
//!
//! 根据 `storage.backend` 选择 PostgreSQL 或内存存储，启动 HTTP 服务。

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use zentrix_membership::{
    AppState, LoggingNotifier, MembershipConfig, MemoryStore, PgTransactionManager,
    SERVICE_NAME, TransactionManager, routes,
};
use zentrix_shared::{
    config::{AppConfig, StorageBackend, load_section},
    database::Database,
    observability,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_default();

    let obs_config = config
        .observability
        .clone()
        .with_service_name(SERVICE_NAME);
    let _guard = observability::init(&obs_config).await?;

    let membership: MembershipConfig = load_section(SERVICE_NAME, "membership")?;
    info!(
        amount_per_point = membership.amount_per_point,
        max_claims_per_promotion = ?membership.max_claims_per_promotion,
        max_vouchers_per_tier = membership.max_vouchers_per_tier,
        backend = ?config.storage.backend,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            db.health_check().await?;
            if config.database.run_migrations {
                db.run_migrations().await?;
            }

            let tm = Arc::new(PgTransactionManager::new(db.pool().clone()));
            serve(&config, tm, membership).await?;
            db.close().await;
        }
        StorageBackend::Memory => {
            if config.is_production() {
                warn!("生产环境使用内存存储，数据不会持久化");
            }
            serve(&config, Arc::new(MemoryStore::new()), membership).await?;
        }
    }

    info!("Server shutdown complete");

    Ok(())
}

async fn serve<T: TransactionManager>(
    config: &AppConfig,
    tm: Arc<T>,
    membership: MembershipConfig,
) -> anyhow::Result<()> {
    let state = AppState::new(tm, membership, Arc::new(LoggingNotifier))?;
    let app = routes::app(state).layer(TimeoutLayer::new(Duration::from_secs(
        config.server.request_timeout_seconds,
    )));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
