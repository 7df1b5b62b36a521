//! Order API Module
//!
//! Board listing, intake, lifecycle commands, receipts and the change stream.
//! Every mutation goes through `OrdersManager::execute_command`.
//!
//! Optional headers on command routes:
//!
//! - `x-command-id`: idempotency key, a repeated id returns the first response
//! - `x-operator-name`: recorded in logs

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/events", get(handler::events))
        .route("/{id}", get(handler::get_by_id).patch(handler::edit))
        .route("/{id}/receipt", get(handler::receipt))
        .route("/{id}/receipt/preview", get(handler::receipt_preview))
        .route("/{id}/non-fiscal-receipt", post(handler::non_fiscal_receipt))
        .route("/{id}/whatsapp", get(handler::whatsapp))
        // Lifecycle
        .route("/{id}/accept", post(handler::accept))
        .route("/{id}/preparing", post(handler::start_preparing))
        .route("/{id}/ready", post(handler::mark_ready))
        .route("/{id}/complete", post(handler::mark_completed))
        .route("/{id}/confirm-payment", post(handler::confirm_payment))
        .route("/{id}/reject", post(handler::reject))
}
