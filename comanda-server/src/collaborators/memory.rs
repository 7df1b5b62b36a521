//! In-memory collaborators (single node, tests)

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use shared::models::Courier;
use shared::order::{Order, OrderPatch};

use super::{
    CollabResult, CollaboratorError, CourierDirectory, OrderNumberGenerator, OrderStore,
    ReceiptPrinter,
};
use crate::receipt::{NonFiscalReceipt, ReceiptDocument};

#[derive(Debug, Default)]
pub struct MemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        for order in orders {
            store.orders.insert(order.id.clone(), order);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn list_since(
        &self,
        establishment_id: &str,
        since: DateTime<Utc>,
    ) -> CollabResult<Vec<Order>> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.establishment_id == establishment_id && o.created_at >= since)
            .map(|o| o.value().clone())
            .collect())
    }

    async fn get(&self, order_id: &str) -> CollabResult<Option<Order>> {
        Ok(self.orders.get(order_id).map(|o| o.value().clone()))
    }

    async fn insert(&self, order: Order) -> CollabResult<Order> {
        self.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn update(
        &self,
        order_id: &str,
        patch: &OrderPatch,
        now: DateTime<Utc>,
    ) -> CollabResult<Order> {
        let mut entry = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| CollaboratorError::NotFound(order_id.to_string()))?;
        entry.apply_patch(patch, now);
        Ok(entry.value().clone())
    }
}

/// Couriers per establishment
#[derive(Debug, Default)]
pub struct MemoryCourierDirectory {
    couriers: RwLock<HashMap<String, Vec<Courier>>>,
}

impl MemoryCourierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_couriers(establishment_id: &str, couriers: Vec<Courier>) -> Self {
        let directory = Self::new();
        directory.set(establishment_id, couriers);
        directory
    }

    pub fn set(&self, establishment_id: &str, couriers: Vec<Courier>) {
        self.couriers
            .write()
            .insert(establishment_id.to_string(), couriers);
    }
}

#[async_trait]
impl CourierDirectory for MemoryCourierDirectory {
    async fn active_couriers(&self, establishment_id: &str) -> CollabResult<Vec<Courier>> {
        Ok(self
            .couriers
            .read()
            .get(establishment_id)
            .map(|list| list.iter().filter(|c| c.is_active).cloned().collect())
            .unwrap_or_default())
    }
}

/// Counter per establishment, starting after `start`
#[derive(Debug, Default)]
pub struct MemoryOrderNumberGenerator {
    counters: DashMap<String, AtomicU64>,
    start: u64,
}

impl MemoryOrderNumberGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            counters: DashMap::new(),
            start,
        }
    }
}

#[async_trait]
impl OrderNumberGenerator for MemoryOrderNumberGenerator {
    async fn next_number(&self, establishment_id: &str) -> CollabResult<u64> {
        let counter = self
            .counters
            .entry(establishment_id.to_string())
            .or_insert_with(|| AtomicU64::new(self.start));
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Keeps printed documents instead of sending them anywhere
#[derive(Debug, Default)]
pub struct MemoryReceiptPrinter {
    receipts: Mutex<Vec<ReceiptDocument>>,
    non_fiscal: Mutex<Vec<NonFiscalReceipt>>,
}

impl MemoryReceiptPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn printed(&self) -> Vec<ReceiptDocument> {
        self.receipts.lock().clone()
    }

    pub fn printed_non_fiscal(&self) -> Vec<NonFiscalReceipt> {
        self.non_fiscal.lock().clone()
    }
}

#[async_trait]
impl ReceiptPrinter for MemoryReceiptPrinter {
    async fn print_receipt(&self, document: &ReceiptDocument) -> CollabResult<()> {
        self.receipts.lock().push(document.clone());
        Ok(())
    }

    async fn print_non_fiscal(&self, receipt: &NonFiscalReceipt) -> CollabResult<()> {
        self.non_fiscal.lock().push(receipt.clone());
        Ok(())
    }
}
