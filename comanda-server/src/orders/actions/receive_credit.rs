//! ReceiveCredit command handler
//!
//! Settles a credit sale: interest accrued up to the receipt date is frozen
//! on the order and payment becomes `Paid`.

use async_trait::async_trait;

use shared::order::{OrderPatch, PaymentStatus};

use crate::credit::accrue;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};
use crate::utils::time::local_date;

#[derive(Debug, Clone)]
pub struct ReceiveCreditAction {
    pub order_id: String,
}

#[async_trait]
impl CommandHandler for ReceiveCreditAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();
        if !order.is_open_receivable() {
            return Err(OrderError::NotAReceivable(self.order_id.clone()));
        }

        let received_on = local_date(metadata.timestamp, ctx.tz());
        let interest = accrue(order, received_on).map_or(0.0, |a| a.interest);

        Ok(Transition::patch(OrderPatch {
            payment_status: Some(PaymentStatus::Paid),
            credit_received_at: Some(Some(metadata.timestamp)),
            credit_interest_amount: Some(Some(interest)),
            ..Default::default()
        }))
    }
}
