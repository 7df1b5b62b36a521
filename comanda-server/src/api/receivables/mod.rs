//! 赊账应收款路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/receivables | GET | 按到期分组的未收赊账 (含实时利息) |
//! | /api/receivables/{id}/receive | POST | 确认收款并冻结利息 |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/receivables",
        Router::new()
            .route("/", get(handler::list))
            .route("/{id}/receive", post(handler::receive)),
    )
}
