//! MarkReady command handler

use async_trait::async_trait;

use shared::order::{OrderPatch, OrderStatus};

use super::ensure_released;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

/// Preparing → Ready, or Pending → Ready once accepted
#[derive(Debug, Clone)]
pub struct MarkReadyAction {
    pub order_id: String,
}

#[async_trait]
impl CommandHandler for MarkReadyAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();
        match order.status {
            OrderStatus::Preparing => {}
            // 待处理订单必须先接单 (堂食/收银单需先开始制作)
            OrderStatus::Pending if ctx.channel().requires_acceptance() => {
                ensure_released(order, ctx.channel())?
            }
            other => {
                return Err(OrderError::InvalidTransition(format!(
                    "Cannot mark order {} ready in {} status",
                    self.order_id,
                    other.as_str()
                )));
            }
        }

        Ok(Transition::patch(OrderPatch {
            status: Some(OrderStatus::Ready),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::{Harness, pending_order};
    use crate::orders::channel::OrderChannel;

    fn action() -> MarkReadyAction {
        MarkReadyAction {
            order_id: "o-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_from_preparing() {
        let harness = Harness::default();
        let mut order = pending_order();
        order.status = OrderStatus::Preparing;
        let (result, _) = harness.run(&action(), &order, OrderChannel::PointOfSale).await;
        assert_eq!(result.unwrap().patch.status, Some(OrderStatus::Ready));
    }

    #[tokio::test]
    async fn test_pending_online_needs_acceptance() {
        let harness = Harness::default();
        let mut order = pending_order();
        let (result, _) = harness.run(&action(), &order, OrderChannel::OnlineMenu).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));

        order.accepted_and_printed_at = Some(harness.now);
        let (result, _) = harness.run(&action(), &order, OrderChannel::OnlineMenu).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_pending_till_order_must_start_first() {
        let harness = Harness::default();
        let (result, _) = harness.run(&action(), &pending_order(), OrderChannel::PointOfSale).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_terminal_states_refused() {
        let harness = Harness::default();
        for status in [OrderStatus::Ready, OrderStatus::Completed, OrderStatus::Cancelled] {
            let mut order = pending_order();
            order.status = status;
            order.accepted_and_printed_at = Some(harness.now);
            let (result, _) = harness.run(&action(), &order, OrderChannel::Kiosk).await;
            assert!(matches!(result, Err(OrderError::InvalidTransition(_))), "{:?}", status);
        }
    }
}
