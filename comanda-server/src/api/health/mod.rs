//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /health | GET | 健康检查 + 副作用积压 |
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "establishment_id": "default",
//!   "failed_tasks": 0
//! }
//! ```

use std::time::SystemTime;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// healthy | degraded (失败的副作用待重试)
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    establishment_id: String,
    printer_configured: bool,
    stock_service_configured: bool,
    failed_tasks: usize,
}

// 服务器启动时间 (懒加载静态变量)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let failed_tasks = state.orders.outbox().failed().len();

    Json(HealthResponse {
        status: if failed_tasks == 0 { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        establishment_id: state.orders.establishment_id().to_string(),
        printer_configured: state.config.printer_addr.is_some(),
        stock_service_configured: state.config.stock_service_url.is_some(),
        failed_tasks,
    })
}
