//! Receivables API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use chrono::Utc;
use serde::Serialize;
use shared::order::{CommandResponse, OrderCommand, OrderCommandPayload};
use shared::response::ApiResponse;

use crate::core::ServerState;
use crate::credit::ReceivablesBoard;
use crate::utils::{AppResult, ok};

#[derive(Debug, Serialize)]
pub struct ReceivablesResponse {
    /// Business date the interest was computed for
    pub today: chrono::NaiveDate,
    #[serde(flatten)]
    pub board: ReceivablesBoard,
}

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<ReceivablesResponse>>> {
    let orders = state.orders.list_orders(Utc::now()).await?;
    let today = state.today();
    let board = ReceivablesBoard::build(&orders, today);
    Ok(ok(ReceivablesResponse { today, board }))
}

pub async fn receive(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    let mut cmd = OrderCommand::new(OrderCommandPayload::ReceiveCredit { order_id: id });
    if let Some(operator) = headers
        .get("x-operator-name")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        cmd = cmd.with_operator(operator.trim());
    }
    Ok(ok(state.orders.execute_command(cmd).await?))
}
