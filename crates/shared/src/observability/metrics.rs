//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。
//! 未安装 recorder 时（如单元测试）所有记录函数都是空操作。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册业务指标描述（出现在 /metrics 的 HELP 注释中）
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "membership_rank_ups_total",
        "Total number of membership tier changes that granted rewards"
    );
    metrics::describe_counter!(
        "promotions_generated_total",
        "Total number of promotions created or reused for membership rewards"
    );
    metrics::describe_counter!("orders_placed_total", "Total number of orders placed");
    metrics::describe_counter!(
        "business_failures_total",
        "Total number of operations rejected by a business rule"
    );
    metrics::describe_histogram!(
        "operation_duration_seconds",
        "Core operation duration in seconds"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 业务指标记录函数
// ============================================================================

/// 记录会员等级变更
#[inline]
pub fn record_rank_up(tier_name: &str) {
    metrics::counter!("membership_rank_ups_total", "tier" => tier_name.to_string()).increment(1);
}

/// 记录生成（或复用）的促销数量
#[inline]
pub fn record_promotions_generated(created: u64, reused: u64) {
    metrics::counter!("promotions_generated_total", "result" => "created").increment(created);
    metrics::counter!("promotions_generated_total", "result" => "reused").increment(reused);
}

/// 记录下单
#[inline]
pub fn record_order_placed(with_promotion: bool) {
    metrics::counter!(
        "orders_placed_total",
        "with_promotion" => if with_promotion { "true" } else { "false" }
    )
    .increment(1);
}

/// 记录被业务规则拒绝的操作
#[inline]
pub fn record_business_failure(operation: &'static str, code: &'static str) {
    metrics::counter!("business_failures_total", "operation" => operation, "code" => code)
        .increment(1);
}

/// 记录核心操作耗时
#[inline]
pub fn record_operation_duration(operation: &'static str, duration_secs: f64) {
    metrics::histogram!("operation_duration_seconds", "operation" => operation)
        .record(duration_secs);
}
