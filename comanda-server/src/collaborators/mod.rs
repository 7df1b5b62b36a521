//! External collaborators
//!
//! Persistence, stock, couriers, numbering and printing are reached through
//! these traits; the engine never talks to a concrete backend directly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use comanda_printer::PrintError;
use shared::models::Courier;
use shared::order::{Order, OrderPatch};

use crate::receipt::{NonFiscalReceipt, ReceiptDocument};

pub mod memory;
pub mod printer;
pub mod stock;

pub use memory::{
    MemoryCourierDirectory, MemoryOrderNumberGenerator, MemoryOrderStore, MemoryReceiptPrinter,
};
pub use printer::{DisabledReceiptPrinter, NetworkReceiptPrinter};
pub use stock::{DisabledStockDeduction, HttpStockDeduction};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Print failed: {0}")]
    Print(#[from] PrintError),

    #[error("{0} is not configured")]
    Disabled(&'static str),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            CollaboratorError::Unavailable(e.to_string())
        } else {
            CollaboratorError::Request(e.to_string())
        }
    }
}

pub type CollabResult<T> = Result<T, CollaboratorError>;

/// Order persistence
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Orders of an establishment created at or after `since`
    async fn list_since(&self, establishment_id: &str, since: DateTime<Utc>)
    -> CollabResult<Vec<Order>>;

    async fn get(&self, order_id: &str) -> CollabResult<Option<Order>>;

    async fn insert(&self, order: Order) -> CollabResult<Order>;

    /// Field-level partial update; returns the stored order
    async fn update(
        &self,
        order_id: &str,
        patch: &OrderPatch,
        now: DateTime<Utc>,
    ) -> CollabResult<Order>;
}

#[async_trait]
pub trait StockDeduction: Send + Sync {
    async fn deduct(&self, establishment_id: &str, order_id: &str) -> CollabResult<()>;
}

#[async_trait]
pub trait CourierDirectory: Send + Sync {
    async fn active_couriers(&self, establishment_id: &str) -> CollabResult<Vec<Courier>>;
}

/// Till-aligned sequential order numbers
#[async_trait]
pub trait OrderNumberGenerator: Send + Sync {
    async fn next_number(&self, establishment_id: &str) -> CollabResult<u64>;
}

#[async_trait]
pub trait ReceiptPrinter: Send + Sync {
    async fn print_receipt(&self, document: &ReceiptDocument) -> CollabResult<()>;

    async fn print_non_fiscal(&self, receipt: &NonFiscalReceipt) -> CollabResult<()>;
}

/// Every collaborator the engine needs
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn OrderStore>,
    pub stock: Arc<dyn StockDeduction>,
    pub couriers: Arc<dyn CourierDirectory>,
    pub numbers: Arc<dyn OrderNumberGenerator>,
    pub printer: Arc<dyn ReceiptPrinter>,
}

impl Collaborators {
    /// In-memory store / couriers / numbers, printing into memory, no stock service
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(MemoryOrderStore::new()),
            stock: Arc::new(DisabledStockDeduction),
            couriers: Arc::new(MemoryCourierDirectory::new()),
            numbers: Arc::new(MemoryOrderNumberGenerator::new()),
            printer: Arc::new(MemoryReceiptPrinter::new()),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("store", &"<dyn OrderStore>")
            .field("stock", &"<dyn StockDeduction>")
            .field("couriers", &"<dyn CourierDirectory>")
            .field("numbers", &"<dyn OrderNumberGenerator>")
            .field("printer", &"<dyn ReceiptPrinter>")
            .finish()
    }
}
