//! Order, order item and status types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Status Types
// ============================================================================

/// Kitchen/lifecycle status of an order
///
/// Pending → Preparing → Ready → Completed is forward-only.
/// Cancelled is terminal and only reachable from Pending (rejection)
/// or through an explicit operator edit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Position on the forward path, `None` for Cancelled
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Preparing => Some(1),
            Self::Ready => Some(2),
            Self::Completed => Some(3),
            Self::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Payment status, orthogonal to [`OrderStatus`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

/// Service type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// 堂食 / mesa
    DineIn,
    /// 自取
    Takeout,
    /// 外送
    Delivery,
    #[default]
    Counter,
}

impl OrderType {
    /// Label printed on receipts
    pub fn receipt_label(self) -> &'static str {
        match self {
            Self::DineIn => "Consumo no local",
            Self::Takeout => "Retirada",
            Self::Delivery => "Entrega",
            Self::Counter => "Balcão",
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// Addon / modifier attached to an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemCustomization {
    pub id: String,
    pub name: String,
    /// Price per unit in currency unit
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Stored order item record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<String>,
    pub product_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Price per unit in currency unit
    #[serde(default)]
    pub unit_price: f64,
    /// Line total in currency unit
    #[serde(default)]
    pub total_price: f64,
    /// Free annotation text
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub customizations: Vec<ItemCustomization>,
}

fn default_quantity() -> i32 {
    1
}

// ============================================================================
// Order
// ============================================================================

/// Order record as seen by the core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub establishment_id: String,
    /// Human-facing sequence number
    pub order_number: u64,

    // === Customer ===
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub table_number: Option<String>,

    // === State ===
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub order_type: OrderType,

    // === Provenance tags ===
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub source_domain: Option<String>,

    /// Set iff the order was cancelled through rejection
    #[serde(default)]
    pub rejection_reason: Option<String>,
    /// Gates rejection and re-acceptance
    #[serde(default)]
    pub accepted_and_printed_at: Option<DateTime<Utc>>,

    // === Delivery assignment ===
    #[serde(default)]
    pub courier_id: Option<String>,
    #[serde(default)]
    pub courier_name: Option<String>,

    // === Deferred release ===
    #[serde(default)]
    pub queued_until_next_open: bool,
    #[serde(default)]
    pub release_at: Option<DateTime<Utc>>,

    // === Credit sale (fiado) ===
    #[serde(default)]
    pub is_credit_sale: bool,
    #[serde(default)]
    pub credit_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub credit_received_at: Option<DateTime<Utc>>,
    /// Fraction per day (0.01 = 1%/day)
    #[serde(default)]
    pub credit_interest_rate_per_day: Option<f64>,
    /// Frozen when the receivable is marked received
    #[serde(default)]
    pub credit_interest_amount: Option<f64>,

    // === Money (currency unit) ===
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

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// New pending order with everything else empty
    pub fn new(
        id: impl Into<String>,
        establishment_id: impl Into<String>,
        order_number: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            establishment_id: establishment_id.into(),
            order_number,
            customer_name: None,
            customer_phone: None,
            delivery_address: None,
            table_number: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            order_type: OrderType::Counter,
            channel: None,
            origin: None,
            source_domain: None,
            rejection_reason: None,
            accepted_and_printed_at: None,
            courier_id: None,
            courier_name: None,
            queued_until_next_open: false,
            release_at: None,
            is_credit_sale: false,
            credit_due_date: None,
            credit_received_at: None,
            credit_interest_rate_per_day: None,
            credit_interest_amount: None,
            subtotal: 0.0,
            discount_amount: 0.0,
            delivery_fee: 0.0,
            tax_amount: 0.0,
            total_amount: 0.0,
            notes: None,
            items: Vec::new(),
            created_at,
            updated_at: created_at,
        }
    }

    /// status ∈ {completed, ready} AND payment = paid
    pub fn is_fully_confirmed(&self) -> bool {
        matches!(self.status, OrderStatus::Completed | OrderStatus::Ready)
            && self.payment_status == PaymentStatus::Paid
    }

    /// Cancelled with a non-empty rejection reason
    pub fn is_rejected(&self) -> bool {
        self.status == OrderStatus::Cancelled
            && self
                .rejection_reason
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty())
    }

    /// Credit sale not yet received and not cancelled
    pub fn is_open_receivable(&self) -> bool {
        self.is_credit_sale
            && self.credit_received_at.is_none()
            && self.payment_status != PaymentStatus::Cancelled
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted_and_printed_at.is_some()
    }

    /// Queued until the next opening and not yet released at `now`
    pub fn is_deferred(&self, now: DateTime<Utc>) -> bool {
        self.queued_until_next_open && self.release_at.is_none_or(|at| at > now)
    }

    /// subtotal − discount + delivery fee + tax, in cents precision
    pub fn computed_total(&self) -> f64 {
        let raw = self.subtotal - self.discount_amount + self.delivery_fee + self.tax_amount;
        (raw * 100.0).round() / 100.0
    }

    /// Apply a partial update, field by field
    pub fn apply_patch(&mut self, patch: &OrderPatch, now: DateTime<Utc>) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(payment_status) = patch.payment_status {
            self.payment_status = payment_status;
        }
        if let Some(number) = patch.order_number {
            self.order_number = number;
        }
        if let Some(v) = &patch.payment_method {
            self.payment_method = v.clone();
        }
        if let Some(v) = &patch.customer_name {
            self.customer_name = v.clone();
        }
        if let Some(v) = &patch.customer_phone {
            self.customer_phone = v.clone();
        }
        if let Some(v) = &patch.table_number {
            self.table_number = v.clone();
        }
        if let Some(v) = &patch.notes {
            self.notes = v.clone();
        }
        if let Some(v) = &patch.rejection_reason {
            self.rejection_reason = v.clone();
        }
        if let Some(v) = patch.accepted_and_printed_at {
            self.accepted_and_printed_at = v;
        }
        if let Some(v) = &patch.courier_id {
            self.courier_id = v.clone();
        }
        if let Some(v) = &patch.courier_name {
            self.courier_name = v.clone();
        }
        if let Some(v) = patch.credit_received_at {
            self.credit_received_at = v;
        }
        if let Some(v) = patch.credit_interest_amount {
            self.credit_interest_amount = v;
        }
        self.updated_at = now;
    }
}

/// Partial field-level update
///
/// `None` leaves a field untouched; for nullable fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub order_number: Option<u64>,
    pub payment_method: Option<Option<String>>,
    pub customer_name: Option<Option<String>>,
    pub customer_phone: Option<Option<String>>,
    pub table_number: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub rejection_reason: Option<Option<String>>,
    pub accepted_and_printed_at: Option<Option<DateTime<Utc>>>,
    pub courier_id: Option<Option<String>>,
    pub courier_name: Option<Option<String>>,
    pub credit_received_at: Option<Option<DateTime<Utc>>>,
    pub credit_interest_amount: Option<Option<f64>>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, h, 0, 0).unwrap()
    }

    #[test]
    fn test_fully_confirmed_requires_paid_and_ready_or_completed() {
        let mut order = Order::new("o1", "e1", 1, ts(10));
        assert!(!order.is_fully_confirmed());

        order.status = OrderStatus::Ready;
        assert!(!order.is_fully_confirmed());

        order.payment_status = PaymentStatus::Paid;
        assert!(order.is_fully_confirmed());

        order.status = OrderStatus::Preparing;
        assert!(!order.is_fully_confirmed());
    }

    #[test]
    fn test_rejected_needs_non_blank_reason() {
        let mut order = Order::new("o1", "e1", 1, ts(10));
        order.status = OrderStatus::Cancelled;
        assert!(!order.is_rejected());

        order.rejection_reason = Some("   ".to_string());
        assert!(!order.is_rejected());

        order.rejection_reason = Some("Sem estoque".to_string());
        assert!(order.is_rejected());
    }

    #[test]
    fn test_deferred_until_release() {
        let mut order = Order::new("o1", "e1", 1, ts(10));
        assert!(!order.is_deferred(ts(11)));

        order.queued_until_next_open = true;
        assert!(order.is_deferred(ts(11)));

        order.release_at = Some(ts(12));
        assert!(order.is_deferred(ts(11)));
        assert!(!order.is_deferred(ts(12)));
    }

    #[test]
    fn test_computed_total() {
        let mut order = Order::new("o1", "e1", 1, ts(10));
        order.subtotal = 50.10;
        order.discount_amount = 5.05;
        order.delivery_fee = 7.0;
        order.tax_amount = 0.2;
        assert_eq!(order.computed_total(), 52.25);
    }

    #[test]
    fn test_apply_patch_touches_only_set_fields() {
        let mut order = Order::new("o1", "e1", 1, ts(10));
        order.customer_name = Some("Ana".to_string());
        order.notes = Some("[1x X-Tudo - R$ 25,00]".to_string());

        let patch = OrderPatch {
            status: Some(OrderStatus::Preparing),
            customer_name: Some(None),
            ..Default::default()
        };
        order.apply_patch(&patch, ts(11));

        assert_eq!(order.status, OrderStatus::Preparing);
        assert_eq!(order.customer_name, None);
        assert_eq!(order.notes.as_deref(), Some("[1x X-Tudo - R$ 25,00]"));
        assert_eq!(order.updated_at, ts(11));
    }

    #[test]
    fn test_empty_patch() {
        assert!(OrderPatch::default().is_empty());
        let patch = OrderPatch {
            order_number: Some(7),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_order_deserializes_with_defaults() {
        let json = r#"{
            "id": "o1",
            "establishment_id": "e1",
            "order_number": 12,
            "channel": "kiosk",
            "created_at": "2024-05-10T10:00:00Z",
            "updated_at": "2024-05-10T10:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.order_type, OrderType::Counter);
        assert!(order.items.is_empty());
    }
}
