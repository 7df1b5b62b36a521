//! Edit command handler
//!
//! Operator edits are allowed at any time. A changed payment method
//! reprints the receipt; leaving `Cancelled` drops the rejection reason.

use async_trait::async_trait;

use shared::order::{OrderEdit, OrderPatch, OrderStatus};

use crate::orders::outbox::{ReceiptReason, TaskKind};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

#[derive(Debug, Clone)]
pub struct EditOrderAction {
    pub order_id: String,
    pub changes: OrderEdit,
}

/// Empty string clears the field; `None` when unchanged
fn text_change(new: &Option<String>, current: &Option<String>) -> Option<Option<String>> {
    let new = new.as_deref()?.trim();
    let new = (!new.is_empty()).then(|| new.to_string());
    (new != *current).then_some(new)
}

#[async_trait]
impl CommandHandler for EditOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();
        let changes = &self.changes;

        let mut patch = OrderPatch {
            status: changes.status.filter(|s| *s != order.status),
            payment_status: changes.payment_status.filter(|s| *s != order.payment_status),
            payment_method: text_change(&changes.payment_method, &order.payment_method),
            customer_name: text_change(&changes.customer_name, &order.customer_name),
            customer_phone: text_change(&changes.customer_phone, &order.customer_phone),
            table_number: text_change(&changes.table_number, &order.table_number),
            notes: text_change(&changes.notes, &order.notes),
            ..Default::default()
        };

        // rejection_reason only on rejected orders
        if order.status == OrderStatus::Cancelled
            && patch.status.is_some_and(|s| s != OrderStatus::Cancelled)
            && order.rejection_reason.is_some()
        {
            patch.rejection_reason = Some(None);
        }

        let mut effects = Vec::new();
        if patch.payment_method.is_some() {
            effects.push(TaskKind::ReceiptPrint {
                reason: ReceiptReason::PaymentMethodChanged,
            });
        }

        Ok(Transition {
            patch,
            effects,
            assigned_courier: None,
        })
    }
}
