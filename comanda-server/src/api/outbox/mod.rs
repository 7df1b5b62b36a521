//! 副作用任务路由 (库存扣减 / 小票打印)
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/outbox/failed | GET | 失败任务列表 |
//! | /api/outbox/retry | POST | 重试全部失败任务 |
//! | /api/outbox/order/{id} | GET | 某订单的全部任务 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use shared::response::ApiResponse;

use crate::core::ServerState;
use crate::orders::outbox::OutboxTask;
use crate::utils::ok;

pub fn router() -> Router<ServerState> {
    Router::new().nest(
        "/api/outbox",
        Router::new()
            .route("/failed", get(failed))
            .route("/retry", post(retry))
            .route("/order/{id}", get(for_order)),
    )
}

pub async fn failed(State(state): State<ServerState>) -> Json<ApiResponse<Vec<OutboxTask>>> {
    ok(state.orders.outbox().failed())
}

pub async fn retry(State(state): State<ServerState>) -> Json<ApiResponse<Vec<OutboxTask>>> {
    ok(state.orders.retry_failed_tasks().await)
}

pub async fn for_order(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Json<ApiResponse<Vec<OutboxTask>>> {
    ok(state.orders.outbox().for_order(&id))
}
