//! ConfirmPayment command handler
//!
//! Payment is orthogonal to status: pending → paid in any non-cancelled
//! state. Confirming an already-paid order is a no-op.

use async_trait::async_trait;

use shared::order::{OrderPatch, OrderStatus, PaymentStatus};

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

#[derive(Debug, Clone)]
pub struct ConfirmPaymentAction {
    pub order_id: String,
}

#[async_trait]
impl CommandHandler for ConfirmPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();
        if order.status == OrderStatus::Cancelled {
            return Err(OrderError::PaymentNotConfirmable(self.order_id.clone()));
        }
        match order.payment_status {
            PaymentStatus::Paid => Ok(Transition::unchanged()),
            PaymentStatus::Cancelled => Err(OrderError::PaymentNotConfirmable(self.order_id.clone())),
            PaymentStatus::Pending => Ok(Transition::patch(OrderPatch {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::{Harness, pending_order};
    use crate::orders::channel::OrderChannel;

    fn action() -> ConfirmPaymentAction {
        ConfirmPaymentAction {
            order_id: "o-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_confirm_in_any_open_status() {
        let harness = Harness::default();
        for status in [
            OrderStatus::Pending,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
        ] {
            let mut order = pending_order();
            order.status = status;
            let (result, _) = harness.run(&action(), &order, OrderChannel::PartnerSite).await;
            assert_eq!(result.unwrap().patch.payment_status, Some(PaymentStatus::Paid));
        }
    }

    #[tokio::test]
    async fn test_already_paid_is_noop() {
        let harness = Harness::default();
        let mut order = pending_order();
        order.payment_status = PaymentStatus::Paid;
        let (result, _) = harness.run(&action(), &order, OrderChannel::PointOfSale).await;
        assert!(result.unwrap().patch.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_refused() {
        let harness = Harness::default();
        let mut order = pending_order();
        order.status = OrderStatus::Cancelled;
        let (result, _) = harness.run(&action(), &order, OrderChannel::PointOfSale).await;
        assert!(matches!(result, Err(OrderError::PaymentNotConfirmable(_))));

        let mut order = pending_order();
        order.payment_status = PaymentStatus::Cancelled;
        let (result, _) = harness.run(&action(), &order, OrderChannel::PointOfSale).await;
        assert!(matches!(result, Err(OrderError::PaymentNotConfirmable(_))));
    }
}
