//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles
//! one specific command type.

use async_trait::async_trait;

use shared::order::{Order, OrderCommand, OrderCommandPayload};

use crate::orders::channel::OrderChannel;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

mod accept_and_print;
mod confirm_payment;
mod edit_order;
mod mark_completed;
mod mark_ready;
mod receive_credit;
mod reject_order;
mod start_preparing;

pub use accept_and_print::AcceptAndPrintAction;
pub use confirm_payment::ConfirmPaymentAction;
pub use edit_order::EditOrderAction;
pub use mark_completed::MarkCompletedAction;
pub use mark_ready::MarkReadyAction;
pub use receive_credit::ReceiveCreditAction;
pub use reject_order::RejectOrderAction;
pub use start_preparing::StartPreparingAction;

/// Online / kiosk orders move past Pending only after accept-and-print
pub(crate) fn ensure_released(order: &Order, channel: OrderChannel) -> Result<(), OrderError> {
    if channel.requires_acceptance() && !order.is_accepted() {
        return Err(OrderError::InvalidTransition(format!(
            "Order {} must be accepted first",
            order.id
        )));
    }
    Ok(())
}

/// CommandAction enum - dispatches to concrete action implementations
#[derive(Debug, Clone)]
pub enum CommandAction {
    AcceptAndPrint(AcceptAndPrintAction),
    StartPreparing(StartPreparingAction),
    MarkReady(MarkReadyAction),
    MarkCompleted(MarkCompletedAction),
    ConfirmPayment(ConfirmPaymentAction),
    Reject(RejectOrderAction),
    Edit(EditOrderAction),
    ReceiveCredit(ReceiveCreditAction),
}

/// Manual implementation of CommandHandler for CommandAction
#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        match self {
            CommandAction::AcceptAndPrint(action) => action.execute(ctx, metadata).await,
            CommandAction::StartPreparing(action) => action.execute(ctx, metadata).await,
            CommandAction::MarkReady(action) => action.execute(ctx, metadata).await,
            CommandAction::MarkCompleted(action) => action.execute(ctx, metadata).await,
            CommandAction::ConfirmPayment(action) => action.execute(ctx, metadata).await,
            CommandAction::Reject(action) => action.execute(ctx, metadata).await,
            CommandAction::Edit(action) => action.execute(ctx, metadata).await,
            CommandAction::ReceiveCredit(action) => action.execute(ctx, metadata).await,
        }
    }
}

/// Convert OrderCommand reference to CommandAction
///
/// This is the ONLY place with a match on OrderCommandPayload.
impl From<&OrderCommand> for CommandAction {
    fn from(cmd: &OrderCommand) -> Self {
        match &cmd.payload {
            OrderCommandPayload::AcceptAndPrint {
                order_id,
                courier_id,
            } => CommandAction::AcceptAndPrint(AcceptAndPrintAction {
                order_id: order_id.clone(),
                courier_id: courier_id.clone(),
            }),
            OrderCommandPayload::StartPreparing { order_id } => {
                CommandAction::StartPreparing(StartPreparingAction {
                    order_id: order_id.clone(),
                })
            }
            OrderCommandPayload::MarkReady { order_id } => CommandAction::MarkReady(MarkReadyAction {
                order_id: order_id.clone(),
            }),
            OrderCommandPayload::MarkCompleted { order_id } => {
                CommandAction::MarkCompleted(MarkCompletedAction {
                    order_id: order_id.clone(),
                })
            }
            OrderCommandPayload::ConfirmPayment { order_id } => {
                CommandAction::ConfirmPayment(ConfirmPaymentAction {
                    order_id: order_id.clone(),
                })
            }
            OrderCommandPayload::Reject { order_id, reason } => {
                CommandAction::Reject(RejectOrderAction {
                    order_id: order_id.clone(),
                    reason: reason.clone(),
                })
            }
            OrderCommandPayload::Edit { order_id, changes } => CommandAction::Edit(EditOrderAction {
                order_id: order_id.clone(),
                changes: changes.clone(),
            }),
            OrderCommandPayload::ReceiveCredit { order_id } => {
                CommandAction::ReceiveCredit(ReceiveCreditAction {
                    order_id: order_id.clone(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use chrono_tz::Tz;

    use shared::models::Courier;
    use shared::order::{CommandWarning, Order};

    use crate::collaborators::{
        CollabResult, CollaboratorError, CourierDirectory, MemoryCourierDirectory,
        MemoryOrderNumberGenerator,
    };
    use crate::orders::channel::OrderChannel;
    use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

    pub fn pending_order() -> Order {
        let created = Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap();
        Order::new("o-1", "est-1", 5, created)
    }

    pub struct FailingDirectory;

    #[async_trait]
    impl CourierDirectory for FailingDirectory {
        async fn active_couriers(&self, _establishment_id: &str) -> CollabResult<Vec<Courier>> {
            Err(CollaboratorError::Unavailable("courier service down".to_string()))
        }
    }

    pub struct Harness {
        pub couriers: Box<dyn CourierDirectory>,
        pub numbers: MemoryOrderNumberGenerator,
        pub now: DateTime<Utc>,
        pub tz: Tz,
    }

    impl Default for Harness {
        fn default() -> Self {
            Self::new(Box::new(MemoryCourierDirectory::new()))
        }
    }

    impl Harness {
        pub fn new(couriers: Box<dyn CourierDirectory>) -> Self {
            Self {
                couriers,
                numbers: MemoryOrderNumberGenerator::new(),
                now: Utc.with_ymd_and_hms(2026, 3, 10, 15, 0, 0).unwrap(),
                tz: chrono_tz::America::Sao_Paulo,
            }
        }

        pub fn with_couriers(couriers: Vec<Courier>) -> Self {
            Self::new(Box::new(MemoryCourierDirectory::with_couriers("est-1", couriers)))
        }

        pub async fn run<H: CommandHandler>(
            &self,
            handler: &H,
            order: &Order,
            channel: OrderChannel,
        ) -> (Result<Transition, OrderError>, Vec<CommandWarning>) {
            let mut ctx = CommandContext::new(order, channel, self.tz, self.couriers.as_ref(), &self.numbers);
            let metadata = CommandMetadata {
                command_id: "cmd-1".to_string(),
                operator_name: Some("Caixa".to_string()),
                timestamp: self.now,
            };
            let result = handler.execute(&mut ctx, &metadata).await;
            (result, ctx.take_warnings())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::OrderEdit;

    #[test]
    fn test_every_payload_maps_to_its_action() {
        let cases = [
            (
                OrderCommandPayload::AcceptAndPrint {
                    order_id: "o".into(),
                    courier_id: Some("c1".into()),
                },
                "accept",
            ),
            (OrderCommandPayload::StartPreparing { order_id: "o".into() }, "preparing"),
            (OrderCommandPayload::MarkReady { order_id: "o".into() }, "ready"),
            (OrderCommandPayload::MarkCompleted { order_id: "o".into() }, "completed"),
            (OrderCommandPayload::ConfirmPayment { order_id: "o".into() }, "payment"),
            (
                OrderCommandPayload::Reject {
                    order_id: "o".into(),
                    reason: "x".into(),
                },
                "reject",
            ),
            (
                OrderCommandPayload::Edit {
                    order_id: "o".into(),
                    changes: OrderEdit::default(),
                },
                "edit",
            ),
            (OrderCommandPayload::ReceiveCredit { order_id: "o".into() }, "credit"),
        ];

        for (payload, expected) in cases {
            let action = CommandAction::from(&OrderCommand::new(payload));
            let actual = match action {
                CommandAction::AcceptAndPrint(a) => {
                    assert_eq!(a.courier_id.as_deref(), Some("c1"));
                    "accept"
                }
                CommandAction::StartPreparing(_) => "preparing",
                CommandAction::MarkReady(_) => "ready",
                CommandAction::MarkCompleted(_) => "completed",
                CommandAction::ConfirmPayment(_) => "payment",
                CommandAction::Reject(_) => "reject",
                CommandAction::Edit(_) => "edit",
                CommandAction::ReceiveCredit(_) => "credit",
            };
            assert_eq!(actual, expected);
        }
    }
}
