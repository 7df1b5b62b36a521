//! AcceptAndPrint command handler
//!
//! Accepts a pending online / kiosk order. Status stays `Pending`; the
//! acceptance timestamp is set and stock deduction + receipt printing are
//! enqueued. Number regeneration and courier lookup are best-effort.

use async_trait::async_trait;

use shared::models::Courier;
use shared::order::{OrderPatch, OrderStatus, OrderType, WarningKind};

use crate::orders::channel::OrderChannel;
use crate::orders::outbox::{ReceiptReason, TaskKind};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError, Transition};

#[derive(Debug, Clone)]
pub struct AcceptAndPrintAction {
    pub order_id: String,
    /// Operator's courier choice, required when several are active
    pub courier_id: Option<String>,
}

impl AcceptAndPrintAction {
    /// Courier for a delivery order
    ///
    /// - explicit choice must be an active courier
    /// - exactly one active courier is assigned automatically
    /// - several active couriers require a choice
    /// - none (or a failed lookup) leaves the order unassigned
    async fn resolve_courier(
        &self,
        ctx: &mut CommandContext<'_>,
    ) -> Result<Option<Courier>, OrderError> {
        let active = match ctx.active_couriers().await {
            Ok(list) => list,
            Err(e) => {
                ctx.warn(WarningKind::CourierLookup, format!("Courier lookup failed: {}", e));
                return Ok(None);
            }
        };

        if let Some(chosen) = self.courier_id.as_deref().filter(|c| !c.trim().is_empty()) {
            return active
                .into_iter()
                .find(|c| c.id == chosen)
                .map(Some)
                .ok_or_else(|| OrderError::CourierNotActive(chosen.to_string()));
        }

        match active.len() {
            0 => Ok(None),
            1 => Ok(active.into_iter().next()),
            n => Err(OrderError::CourierSelectionRequired {
                order_id: self.order_id.clone(),
                active: n,
            }),
        }
    }
}

#[async_trait]
impl CommandHandler for AcceptAndPrintAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError> {
        let order = ctx.order();

        // 1. Validate
        if !ctx.channel().requires_acceptance() {
            return Err(OrderError::ChannelNotAcceptable(self.order_id.clone()));
        }
        if order.is_accepted() {
            return Err(OrderError::AlreadyAccepted(self.order_id.clone()));
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition(format!(
                "Cannot accept order {} in {} status",
                self.order_id,
                order.status.as_str()
            )));
        }
        if order.is_deferred(metadata.timestamp) {
            return Err(OrderError::Deferred(self.order_id.clone()));
        }
        let is_delivery = order.order_type == OrderType::Delivery;
        let has_courier = order.courier_id.is_some();

        // 2. Courier (blocking only when a choice is required)
        let assigned_courier = if is_delivery && (!has_courier || self.courier_id.is_some()) {
            self.resolve_courier(ctx).await?
        } else {
            None
        };

        let mut patch = OrderPatch {
            accepted_and_printed_at: Some(Some(metadata.timestamp)),
            ..Default::default()
        };
        if let Some(courier) = &assigned_courier {
            patch.courier_id = Some(Some(courier.id.clone()));
            patch.courier_name = Some(Some(courier.name.clone()));
        }

        // 3. Till-aligned number for partner site orders
        if ctx.channel() == OrderChannel::PartnerSite {
            match ctx.next_order_number().await {
                Ok(number) => patch.order_number = Some(number),
                Err(e) => ctx.warn(
                    WarningKind::NumberRegeneration,
                    format!("Order number not regenerated: {}", e),
                ),
            }
        }

        Ok(Transition {
            patch,
            effects: vec![
                TaskKind::StockDeduction,
                TaskKind::ReceiptPrint {
                    reason: ReceiptReason::Accepted,
                },
            ],
            assigned_courier,
        })
    }
}
