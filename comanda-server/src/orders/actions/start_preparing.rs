//! StartPreparing command handler (Pending → Preparing)

use async_trait::async_trait;

use shared::order::{OrderPatch, OrderStatus};

use super::ensure_released;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

#[derive(Debug, Clone)]
pub struct StartPreparingAction {
    pub order_id: String,
}

#[async_trait]
impl CommandHandler for StartPreparingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition(format!(
                "Cannot start preparing order {} in {} status",
                self.order_id,
                order.status.as_str()
            )));
        }
        ensure_released(order, ctx.channel())?;

        Ok(Transition::patch(OrderPatch {
            status: Some(OrderStatus::Preparing),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::{Harness, pending_order};
    use crate::orders::channel::OrderChannel;

    fn action() -> StartPreparingAction {
        StartPreparingAction {
            order_id: "o-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_point_of_sale_starts_directly() {
        let harness = Harness::default();
        let (result, _) = harness.run(&action(), &pending_order(), OrderChannel::PointOfSale).await;
        assert_eq!(result.unwrap().patch.status, Some(OrderStatus::Preparing));
    }

    #[tokio::test]
    async fn test_online_requires_acceptance() {
        let harness = Harness::default();
        let (result, _) = harness.run(&action(), &pending_order(), OrderChannel::PartnerSite).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));

        let mut accepted = pending_order();
        accepted.accepted_and_printed_at = Some(harness.now);
        let (result, _) = harness.run(&action(), &accepted, OrderChannel::PartnerSite).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_never_backwards() {
        let harness = Harness::default();
        let mut ready = pending_order();
        ready.status = OrderStatus::Ready;
        let (result, _) = harness.run(&action(), &ready, OrderChannel::PointOfSale).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));
    }
}
