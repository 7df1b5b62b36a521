//! MarkCompleted command handler

use async_trait::async_trait;

use shared::order::{OrderPatch, OrderStatus};

use super::ensure_released;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

/// Ready / Preparing → Completed, or Pending → Completed once accepted
#[derive(Debug, Clone)]
pub struct MarkCompletedAction {
    pub order_id: String,
}

#[async_trait]
impl CommandHandler for MarkCompletedAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        _metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();
        match order.status {
            OrderStatus::Ready | OrderStatus::Preparing => {}
            OrderStatus::Pending if ctx.channel().requires_acceptance() => {
                ensure_released(order, ctx.channel())?
            }
            other => {
                return Err(OrderError::InvalidTransition(format!(
                    "Cannot complete order {} in {} status",
                    self.order_id,
                    other.as_str()
                )));
            }
        }

        Ok(Transition::patch(OrderPatch {
            status: Some(OrderStatus::Completed),
            ..Default::default()
        }))
    }
}
