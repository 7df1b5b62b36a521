//! Command handler trait and execution context

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use shared::error::ErrorCode;
use shared::models::Courier;
use shared::order::{CommandWarning, Order, OrderPatch, WarningKind};

use super::channel::OrderChannel;
use super::outbox::TaskKind;
use crate::collaborators::{CollabResult, CollaboratorError, CourierDirectory, OrderNumberGenerator};

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Order already accepted: {0}")]
    AlreadyAccepted(String),

    #[error("Order {0} was already accepted and can no longer be rejected")]
    RejectAfterAcceptance(String),

    #[error("Order {0} is queued until the next opening")]
    Deferred(String),

    #[error("Order {0} does not go through acceptance")]
    ChannelNotAcceptable(String),

    #[error("Order {order_id}: {active} active couriers, choose one")]
    CourierSelectionRequired { order_id: String, active: usize },

    #[error("Courier is not active: {0}")]
    CourierNotActive(String),

    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    #[error("Payment cannot be confirmed for order {0}")]
    PaymentNotConfirmable(String),

    #[error("Order {0} is not an open receivable")]
    NotAReceivable(String),

    #[error("Order store error: {0}")]
    Store(#[from] CollaboratorError),
}

impl OrderError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            OrderError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            OrderError::AlreadyAccepted(_) | OrderError::RejectAfterAcceptance(_) => {
                ErrorCode::OrderAlreadyAccepted
            }
            OrderError::Deferred(_) => ErrorCode::OrderDeferred,
            OrderError::ChannelNotAcceptable(_) => ErrorCode::ChannelNotAcceptable,
            OrderError::CourierSelectionRequired { .. } => ErrorCode::CourierSelectionRequired,
            OrderError::CourierNotActive(_) => ErrorCode::CourierNotActive,
            OrderError::RejectionReasonRequired => ErrorCode::RejectionReasonRequired,
            OrderError::PaymentNotConfirmable(_) => ErrorCode::PaymentNotConfirmable,
            OrderError::NotAReceivable(_) => ErrorCode::NotAReceivable,
            OrderError::Store(_) => ErrorCode::StorageError,
        }
    }
}

/// Command metadata (who / when)
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Planned outcome of a command
///
/// The manager persists `patch`, then runs `effects` best-effort.
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub patch: OrderPatch,
    pub effects: Vec<TaskKind>,
    pub assigned_courier: Option<Courier>,
}

impl Transition {
    pub fn patch(patch: OrderPatch) -> Self {
        Self {
            patch,
            ..Default::default()
        }
    }

    /// Nothing to persist, nothing to run
    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// State visible to a command handler
pub struct CommandContext<'a> {
    order: &'a Order,
    channel: OrderChannel,
    tz: Tz,
    couriers: &'a dyn CourierDirectory,
    numbers: &'a dyn OrderNumberGenerator,
    warnings: Vec<CommandWarning>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        order: &'a Order,
        channel: OrderChannel,
        tz: Tz,
        couriers: &'a dyn CourierDirectory,
        numbers: &'a dyn OrderNumberGenerator,
    ) -> Self {
        Self {
            order,
            channel,
            tz,
            couriers,
            numbers,
            warnings: Vec::new(),
        }
    }

    /// Order as loaded before the command
    pub fn order(&self) -> &'a Order {
        self.order
    }

    pub fn channel(&self) -> OrderChannel {
        self.channel
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub async fn active_couriers(&self) -> CollabResult<Vec<Courier>> {
        self.couriers
            .active_couriers(&self.order.establishment_id)
            .await
    }

    pub async fn next_order_number(&self) -> CollabResult<u64> {
        self.numbers.next_number(&self.order.establishment_id).await
    }

    /// Record a non-blocking failure
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let warning = CommandWarning::new(kind, message);
        tracing::warn!(order_id = %self.order.id, kind = ?warning.kind, message = %warning.message, "Command degraded");
        self.warnings.push(warning);
    }

    pub fn take_warnings(&mut self) -> Vec<CommandWarning> {
        std::mem::take(&mut self.warnings)
    }
}

/// Command handler
///
/// Handlers validate and plan; they never write to the store themselves.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Transition, OrderError>;
}
