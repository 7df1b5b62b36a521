//! Reject command handler
//!
//! Pending → Cancelled with a mandatory reason. Refused once the order
//! was accepted and printed.

use async_trait::async_trait;

use shared::order::{OrderPatch, OrderStatus, PaymentStatus};

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

#[derive(Debug, Clone)]
pub struct RejectOrderAction {
    pub order_id: String,
    pub reason: String,
}

#[async_trait]
impl CommandHandler for RejectOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(OrderError::RejectionReasonRequired);
        }

        let order = ctx.order();
        if order.is_accepted() {
            return Err(OrderError::RejectAfterAcceptance(self.order_id.clone()));
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition(format!(
                "Cannot reject order {} in {} status",
                self.order_id,
                order.status.as_str()
            )));
        }

        let mut patch = OrderPatch {
            status: Some(OrderStatus::Cancelled),
            rejection_reason: Some(Some(reason.to_string())),
            ..Default::default()
        };
        if order.payment_status == PaymentStatus::Pending {
            patch.payment_status = Some(PaymentStatus::Cancelled);
        }
        Ok(Transition::patch(patch))
    }
}
