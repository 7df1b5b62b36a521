//! Lifecycle commands and their responses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Order, OrderStatus, PaymentStatus};
use crate::models::Courier;

/// Command envelope sent by an operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCommand {
    /// Idempotency / correlation id
    pub command_id: String,
    #[serde(default)]
    pub operator_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub payload: OrderCommandPayload,
}

impl OrderCommand {
    pub fn new(payload: OrderCommandPayload) -> Self {
        Self {
            command_id: Uuid::new_v4().to_string(),
            operator_name: None,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn with_operator(mut self, name: impl Into<String>) -> Self {
        self.operator_name = Some(name.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Target order id
    pub fn order_id(&self) -> &str {
        self.payload.order_id()
    }
}

/// Lifecycle commands
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommandPayload {
    /// Accept an online/kiosk order and print it
    AcceptAndPrint {
        order_id: String,
        #[serde(default)]
        courier_id: Option<String>,
    },
    StartPreparing {
        order_id: String,
    },
    MarkReady {
        order_id: String,
    },
    MarkCompleted {
        order_id: String,
    },
    ConfirmPayment {
        order_id: String,
    },
    /// Cancel with a mandatory reason
    Reject {
        order_id: String,
        reason: String,
    },
    /// Free-form operator edit
    Edit {
        order_id: String,
        changes: OrderEdit,
    },
    /// Settle a credit sale, freezing accrued interest
    ReceiveCredit {
        order_id: String,
    },
}

impl OrderCommandPayload {
    pub fn order_id(&self) -> &str {
        match self {
            Self::AcceptAndPrint { order_id, .. }
            | Self::StartPreparing { order_id }
            | Self::MarkReady { order_id }
            | Self::MarkCompleted { order_id }
            | Self::ConfirmPayment { order_id }
            | Self::Reject { order_id, .. }
            | Self::Edit { order_id, .. }
            | Self::ReceiveCredit { order_id } => order_id,
        }
    }

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::AcceptAndPrint { .. } => "accept_and_print",
            Self::StartPreparing { .. } => "start_preparing",
            Self::MarkReady { .. } => "mark_ready",
            Self::MarkCompleted { .. } => "mark_completed",
            Self::ConfirmPayment { .. } => "confirm_payment",
            Self::Reject { .. } => "reject",
            Self::Edit { .. } => "edit",
            Self::ReceiveCredit { .. } => "receive_credit",
        }
    }
}

/// Operator edit
///
/// Absent fields are untouched. For text fields an empty string clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrderEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderEdit {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Category of a non-blocking problem
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    NumberRegeneration,
    CourierLookup,
    StockDeduction,
    ReceiptPrint,
}

/// Secondary step that failed without blocking the command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl CommandWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of a committed command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub command_id: String,
    /// Order as persisted after the transition
    pub order: Order,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_courier: Option<Courier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<CommandWarning>,
    /// Outbox tasks enqueued by this command
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_ids: Vec<String>,
}

impl CommandResponse {
    /// Committed but with failed side effects
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_wire_format() {
        let payload = OrderCommandPayload::Reject {
            order_id: "o1".to_string(),
            reason: "Fora da área".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "REJECT");
        assert_eq!(json["reason"], "Fora da área");

        let parsed: OrderCommandPayload =
            serde_json::from_str(r#"{"type":"ACCEPT_AND_PRINT","order_id":"o2"}"#).unwrap();
        assert_eq!(
            parsed,
            OrderCommandPayload::AcceptAndPrint {
                order_id: "o2".to_string(),
                courier_id: None
            }
        );
    }

    #[test]
    fn test_command_order_id() {
        let cmd = OrderCommand::new(OrderCommandPayload::Edit {
            order_id: "o9".to_string(),
            changes: OrderEdit::default(),
        })
        .with_operator("Caixa 1");
        assert_eq!(cmd.order_id(), "o9");
        assert_eq!(cmd.payload.name(), "edit");
        assert_eq!(cmd.operator_name.as_deref(), Some("Caixa 1"));
    }

    #[test]
    fn test_edit_partial_json() {
        let edit: OrderEdit = serde_json::from_str(r#"{"payment_method":"pix"}"#).unwrap();
        assert_eq!(edit.payment_method.as_deref(), Some("pix"));
        assert!(edit.status.is_none());
        assert!(!edit.is_empty());
        assert!(OrderEdit::default().is_empty());
    }
}
