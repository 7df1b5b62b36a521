//! Order API Handlers

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
};
use chrono::{DateTime, NaiveDate, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use shared::error::ErrorCode;
use shared::order::{
    CommandResponse, CommandWarning, Order, OrderCommand, OrderCommandPayload, OrderEdit,
    OrderItem, OrderType, PaymentStatus,
};
use shared::response::ApiResponse;

use crate::core::ServerState;
use crate::messaging::WhatsAppHandoff;
use crate::orders::board::{BoardEntry, BoardView};
use crate::orders::refresh::coalesce;
use crate::orders::tabs::{AllTabFilter, OrderTab};
use crate::receipt::{NonFiscalReceipt, ReceiptDocument, ReceiptRenderer};
use crate::utils::time::parse_date;
use crate::utils::{AppError, AppResult, ok};

const COMMAND_ID_HEADER: &str = "x-command-id";
const OPERATOR_HEADER: &str = "x-operator-name";

// ========== Board ==========

/// Query params of the board listing
#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    #[serde(default)]
    pub tab: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub selected: Option<String>,
    /// YYYY-MM-DD, All tab only
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub delivery_only: Option<bool>,
    #[serde(default)]
    pub show_pdv: Option<bool>,
    #[serde(default)]
    pub show_site: Option<bool>,
}

impl BoardQuery {
    fn into_view(self) -> AppResult<BoardView> {
        let tab = match self.tab.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => raw.parse::<OrderTab>().map_err(AppError::validation)?,
            None => OrderTab::Pending,
        };
        let defaults = AllTabFilter::default();
        let all_filter = AllTabFilter {
            date: self.date.as_deref().map(parse_date).transpose()?,
            payment_method: self.payment_method.filter(|m| !m.trim().is_empty()),
            delivery_only: self.delivery_only.unwrap_or(defaults.delivery_only),
            show_pdv: self.show_pdv.unwrap_or(defaults.show_pdv),
            show_site: self.show_site.unwrap_or(defaults.show_site),
        };

        let mut view = BoardView::new(tab).with_search(self.search.unwrap_or_default());
        view.all_filter = all_filter;
        if let Some(id) = self.selected.filter(|s| !s.is_empty()) {
            view.select(id);
        }
        Ok(view)
    }
}

#[derive(Debug, Serialize)]
pub struct TabCount {
    pub tab: OrderTab,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub view: BoardView,
    pub orders: Vec<BoardEntry>,
    pub counts: Vec<TabCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<BoardEntry>,
}

/// Board listing of one tab
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<BoardQuery>,
) -> AppResult<Json<ApiResponse<BoardResponse>>> {
    let view = query.into_view()?;
    let orders = state.orders.list_orders(Utc::now()).await?;
    let today = state.today();

    let entries = state.board.visible_orders(&orders, &view, today);
    let counts = state
        .board
        .tab_counts(&orders, &view, today)
        .into_iter()
        .map(|(tab, count)| TabCount { tab, count })
        .collect();
    let selected = state
        .board
        .selected(&orders, &view)
        .map(|o| state.board.entry(o));

    Ok(ok(BoardResponse {
        view,
        orders: entries,
        counts,
        selected,
    }))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<BoardEntry>>> {
    let order = state.orders.get_order(&id).await?;
    Ok(ok(state.board.entry(&order)))
}

// ========== Intake ==========

/// New order as sent by an intake surface
#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub table_number: Option<String>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub order_type: Option<OrderType>,

    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub source_domain: Option<String>,

    #[serde(default)]
    pub queued_until_next_open: bool,
    #[serde(default)]
    pub release_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_credit_sale: bool,
    #[serde(default)]
    pub credit_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub credit_interest_rate_per_day: Option<f64>,

    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub delivery_fee: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub total_amount: f64,

    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl CreateOrderRequest {
    fn validate(&self) -> AppResult<()> {
        let amounts = [
            self.subtotal,
            self.discount_amount,
            self.delivery_fee,
            self.tax_amount,
            self.total_amount,
        ];
        if amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(AppError::validation("Amounts must be non-negative numbers"));
        }
        if self
            .credit_interest_rate_per_day
            .is_some_and(|r| !r.is_finite() || r < 0.0)
        {
            return Err(AppError::validation("Interest rate must be non-negative"));
        }
        if self.items.iter().any(|i| i.product_name.trim().is_empty()) {
            return Err(AppError::validation("Item name is required"));
        }
        Ok(())
    }

    fn into_order(self, now: DateTime<Utc>) -> Order {
        let mut order = Order::new(self.id.unwrap_or_default(), "", 0, now);
        order.customer_name = self.customer_name;
        order.customer_phone = self.customer_phone;
        order.delivery_address = self.delivery_address;
        order.table_number = self.table_number;
        if let Some(status) = self.payment_status {
            order.payment_status = status;
        }
        order.payment_method = self.payment_method;
        if let Some(order_type) = self.order_type {
            order.order_type = order_type;
        }
        order.channel = self.channel;
        order.origin = self.origin;
        order.source_domain = self.source_domain;
        order.queued_until_next_open = self.queued_until_next_open;
        order.release_at = self.release_at;
        order.is_credit_sale = self.is_credit_sale;
        order.credit_due_date = self.credit_due_date;
        order.credit_interest_rate_per_day = self.credit_interest_rate_per_day;
        order.subtotal = self.subtotal;
        order.discount_amount = self.discount_amount;
        order.delivery_fee = self.delivery_fee;
        order.tax_amount = self.tax_amount;
        order.total_amount = self.total_amount;
        order.notes = self.notes;
        order.items = self.items;
        order
    }
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<BoardEntry>>> {
    payload.validate()?;
    let now = Utc::now();
    let order = state.orders.create_order(payload.into_order(now), now).await?;
    Ok(ok(state.board.entry(&order)))
}

// ========== Commands ==========

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn build_command(headers: &HeaderMap, payload: OrderCommandPayload) -> OrderCommand {
    let mut cmd = OrderCommand::new(payload);
    if let Some(id) = header_value(headers, COMMAND_ID_HEADER) {
        cmd.command_id = id;
    }
    if let Some(operator) = header_value(headers, OPERATOR_HEADER) {
        cmd = cmd.with_operator(operator);
    }
    cmd
}

async fn execute(
    state: &ServerState,
    headers: &HeaderMap,
    payload: OrderCommandPayload,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    let response = state
        .orders
        .execute_command(build_command(headers, payload))
        .await?;
    Ok(ok(response))
}

#[derive(Debug, Default, Deserialize)]
pub struct AcceptQuery {
    #[serde(default)]
    pub courier_id: Option<String>,
}

pub async fn accept(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<AcceptQuery>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    let payload = OrderCommandPayload::AcceptAndPrint {
        order_id: id,
        courier_id: query.courier_id.filter(|c| !c.trim().is_empty()),
    };
    execute(&state, &headers, payload).await
}

pub async fn start_preparing(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    execute(&state, &headers, OrderCommandPayload::StartPreparing { order_id: id }).await
}

pub async fn mark_ready(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    execute(&state, &headers, OrderCommandPayload::MarkReady { order_id: id }).await
}

pub async fn mark_completed(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    execute(&state, &headers, OrderCommandPayload::MarkCompleted { order_id: id }).await
}

pub async fn confirm_payment(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    execute(&state, &headers, OrderCommandPayload::ConfirmPayment { order_id: id }).await
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: String,
}

pub async fn reject(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<RejectRequest>,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    let payload = OrderCommandPayload::Reject {
        order_id: id,
        reason: payload.reason,
    };
    execute(&state, &headers, payload).await
}

pub async fn edit(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(changes): Json<OrderEdit>,
) -> AppResult<Json<ApiResponse<CommandResponse>>> {
    if changes.is_empty() {
        return Err(AppError::validation("No changes"));
    }
    execute(&state, &headers, OrderCommandPayload::Edit { order_id: id, changes }).await
}

// ========== Receipts ==========

pub async fn receipt(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ReceiptDocument>>> {
    Ok(ok(state.orders.receipt(&id).await?))
}

/// Plain-text rendition of the printed receipt
pub async fn receipt_preview(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<String> {
    let document = state.orders.receipt(&id).await?;
    Ok(ReceiptRenderer::new(state.config.receipt_width).preview(&document))
}

#[derive(Debug, Deserialize)]
pub struct NonFiscalRequest {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub cpf: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NonFiscalResponse {
    pub receipt: NonFiscalReceipt,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CommandWarning>,
}

pub async fn non_fiscal_receipt(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<NonFiscalRequest>,
) -> AppResult<Json<ApiResponse<NonFiscalResponse>>> {
    let document = state.orders.receipt(&id).await?;
    let receipt = NonFiscalReceipt::new(document, &payload.phone, payload.cpf.as_deref())?;
    let warnings = state.orders.print_non_fiscal(&receipt).await;
    Ok(ok(NonFiscalResponse { receipt, warnings }))
}

// ========== Messaging ==========

pub async fn whatsapp(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<WhatsAppHandoff>>> {
    let order = state.orders.get_order(&id).await?;
    let handoff = WhatsAppHandoff::build(&order, state.pix_key()).ok_or_else(|| {
        AppError::BusinessRule(
            ErrorCode::InvalidRequest,
            format!("Order {} has no pending payment or valid phone", id),
        )
    })?;
    Ok(ok(handoff))
}

// ========== Change stream ==========

/// Coalesced refresh signals (SSE)
pub async fn events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let signals = coalesce(state.orders.subscribe(), state.refresh_throttle());
    let stream = signals.map(|signal| {
        Ok(match Event::default().event("refresh").json_data(&signal) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Refresh signal not serializable");
                Event::default().event("refresh").data("{\"lagged\":true}")
            }
        })
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_query_defaults_to_pending() {
        let view = BoardQuery::default().into_view().unwrap();
        assert_eq!(view.tab, OrderTab::Pending);
        assert!(view.all_filter.show_pdv && view.all_filter.show_site);
    }

    #[test]
    fn test_board_query_all_tab_filters() {
        let query = BoardQuery {
            tab: Some("all".into()),
            date: Some("2026-03-10".into()),
            payment_method: Some("PIX".into()),
            delivery_only: Some(true),
            show_pdv: Some(false),
            ..Default::default()
        };
        let view = query.into_view().unwrap();
        assert_eq!(view.tab, OrderTab::All);
        assert_eq!(view.all_filter.date, NaiveDate::from_ymd_opt(2026, 3, 10));
        assert_eq!(view.all_filter.payment_method.as_deref(), Some("PIX"));
        assert!(view.all_filter.delivery_only);
        assert!(!view.all_filter.show_pdv);
        assert!(view.all_filter.show_site);
    }

    #[test]
    fn test_board_query_rejects_bad_input() {
        let bad_tab = BoardQuery {
            tab: Some("kitchen".into()),
            ..Default::default()
        };
        assert!(bad_tab.into_view().is_err());

        let bad_date = BoardQuery {
            date: Some("10/03/2026".into()),
            ..Default::default()
        };
        assert!(bad_date.into_view().is_err());
    }

    #[test]
    fn test_command_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(COMMAND_ID_HEADER, "cmd-42".parse().unwrap());
        headers.insert(OPERATOR_HEADER, " Caixa 1 ".parse().unwrap());
        let cmd = build_command(
            &headers,
            OrderCommandPayload::MarkReady {
                order_id: "o1".into(),
            },
        );
        assert_eq!(cmd.command_id, "cmd-42");
        assert_eq!(cmd.operator_name.as_deref(), Some("Caixa 1"));
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateOrderRequest {
            delivery_fee: -1.0,
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "customer_name": "Ana",
            "source_domain": "loja.parceiro.com",
            "order_type": "delivery",
            "items": [{"product_name": "X-Burger", "quantity": 2, "unit_price": 15.0}]
        }))
        .unwrap();
        assert!(request.validate().is_ok());
        let order = request.into_order(Utc::now());
        assert_eq!(order.order_type, OrderType::Delivery);
        assert_eq!(order.items[0].quantity, 2);
        assert!(order.id.is_empty());
    }
}
