//! OrdersManager - command processing and side-effect orchestration
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Claim command_id (duplicates wait for the first response)
//!     ├─ 2. Load order, classify channel
//!     ├─ 3. Convert command to action and execute (validate + plan)
//!     ├─ 4. Persist the patch (failure → OrderError::Store)
//!     ├─ 5. Publish OrderChange
//!     ├─ 6. Record effects in the outbox and run them best-effort
//!     └─ 7. Return response (warnings for failed effects)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::{OnceCell, broadcast};

use shared::order::{
    CommandResponse, CommandWarning, Order, OrderCommand, OrderStatus, WarningKind,
};

use super::actions::CommandAction;
use super::channel::{ChannelClassifier, OrderChannel};
use super::outbox::{Outbox, OutboxTask, TaskKind, TaskStatus};
use super::refresh::{ChangeFeed, ChangeKind, OrderChange};
use super::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use crate::collaborators::{CollabResult, Collaborators};
use crate::money::{round_money, to_decimal, to_f64};
use crate::receipt::{NonFiscalReceipt, ReceiptComposer, ReceiptDocument};
use crate::utils::time::retention_start;

/// Default read window of the order store
const DEFAULT_RETENTION_MONTHS: u32 = 3;

/// How long a command_id is remembered, and succeeded outbox tasks kept
const DEFAULT_DEDUP_WINDOW_HOURS: i64 = 24;

/// Minimum spacing between two prune passes
const PRUNE_INTERVAL_MINUTES: i64 = 60;

/// Claimed command: the cell is filled once by the first delivery
#[derive(Debug, Clone)]
struct ProcessedCommand {
    response: Arc<OnceCell<CommandResponse>>,
    claimed_at: DateTime<Utc>,
}

/// OrdersManager for command processing
pub struct OrdersManager {
    collaborators: Collaborators,
    classifier: ChannelClassifier,
    composer: ReceiptComposer,
    outbox: Outbox,
    feed: ChangeFeed,
    /// Responses by command_id (at-least-once delivery)
    processed: DashMap<String, ProcessedCommand>,
    dedup_window: Duration,
    last_pruned: Mutex<Option<DateTime<Utc>>>,
    establishment_id: String,
    retention_months: u32,
    /// 业务时区
    tz: Tz,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("establishment_id", &self.establishment_id)
            .field("retention_months", &self.retention_months)
            .field("tz", &self.tz)
            .finish()
    }
}

impl OrdersManager {
    pub fn new(
        collaborators: Collaborators,
        classifier: ChannelClassifier,
        composer: ReceiptComposer,
        tz: Tz,
    ) -> Self {
        Self {
            collaborators,
            classifier,
            composer,
            outbox: Outbox::new(),
            feed: ChangeFeed::new(),
            processed: DashMap::new(),
            dedup_window: Duration::hours(DEFAULT_DEDUP_WINDOW_HOURS),
            last_pruned: Mutex::new(None),
            establishment_id: "default".to_string(),
            retention_months: DEFAULT_RETENTION_MONTHS,
            tz,
        }
    }

    pub fn with_establishment(mut self, establishment_id: impl Into<String>) -> Self {
        self.establishment_id = establishment_id.into();
        self
    }

    pub fn with_retention_months(mut self, months: u32) -> Self {
        self.retention_months = months;
        self
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn establishment_id(&self) -> &str {
        &self.establishment_id
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn classifier(&self) -> &ChannelClassifier {
        &self.classifier
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Subscribe to committed order changes
    pub fn subscribe(&self) -> broadcast::Receiver<OrderChange> {
        self.feed.subscribe()
    }

    // ========== Queries ==========

    /// Orders inside the retention window
    pub async fn list_orders(&self, now: DateTime<Utc>) -> Result<Vec<Order>, OrderError> {
        let since = retention_start(now, self.retention_months);
        Ok(self
            .collaborators
            .store
            .list_since(&self.establishment_id, since)
            .await?)
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.collaborators
            .store
            .get(order_id)
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    pub fn channel_of(&self, order: &Order) -> OrderChannel {
        self.classifier.classify(order)
    }

    /// Canonical receipt of an order
    pub async fn receipt(&self, order_id: &str) -> Result<ReceiptDocument, OrderError> {
        let order = self.get_order(order_id).await?;
        Ok(self.composer.compose(&order))
    }

    // ========== Intake ==========

    /// Store a new order: sequence number assigned, status pending
    pub async fn create_order(
        &self,
        mut order: Order,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        if order.id.trim().is_empty() {
            order.id = uuid::Uuid::new_v4().to_string();
        }
        if order.establishment_id.trim().is_empty() {
            order.establishment_id = self.establishment_id.clone();
        }
        order.order_number = self
            .collaborators
            .numbers
            .next_number(&order.establishment_id)
            .await?;
        order.status = OrderStatus::Pending;
        order.rejection_reason = None;
        order.accepted_and_printed_at = None;
        order.credit_received_at = None;
        order.credit_interest_amount = None;
        order.created_at = now;
        order.updated_at = now;
        normalize_amounts(&mut order);

        let order = self.collaborators.store.insert(order).await?;
        tracing::info!(
            order_id = %order.id,
            order_number = order.order_number,
            channel = ?self.classifier.classify(&order),
            "Order created"
        );
        self.publish(&order, ChangeKind::Created, now);
        Ok(order)
    }

    // ========== Commands ==========

    /// Execute a command and return the response
    ///
    /// Validation and persistence failures are returned as errors; failed
    /// side effects only add warnings. A repeated command_id returns the
    /// first response; a concurrent repeat waits for it.
    pub async fn execute_command(&self, cmd: OrderCommand) -> Result<CommandResponse, OrderError> {
        tracing::debug!(command_id = %cmd.command_id, command = cmd.payload.name(), order_id = %cmd.order_id(), "Processing command");
        self.prune_expired(cmd.timestamp);

        // 1. Claim (entry lock held only for the insert)
        let cell = self
            .processed
            .entry(cmd.command_id.clone())
            .or_insert_with(|| ProcessedCommand {
                response: Arc::new(OnceCell::new()),
                claimed_at: cmd.timestamp,
            })
            .response
            .clone();

        let mut executed = false;
        let result = cell
            .get_or_try_init(|| {
                executed = true;
                self.run_command(&cmd)
            })
            .await
            .cloned();

        match &result {
            Ok(_) if !executed => {
                tracing::warn!(command_id = %cmd.command_id, "Duplicate command");
            }
            // 失败不缓存，同一 command_id 可重试
            Err(_) => {
                self.processed
                    .remove_if(&cmd.command_id, |_, p| !p.response.initialized());
            }
            Ok(_) => {}
        }
        result
    }

    async fn run_command(&self, cmd: &OrderCommand) -> Result<CommandResponse, OrderError> {
        // 2. Load
        let order = self.get_order(cmd.order_id()).await?;
        let channel = self.classifier.classify(&order);

        // 3. Validate + plan
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: cmd.timestamp,
        };
        let action = CommandAction::from(cmd);
        let mut ctx = CommandContext::new(
            &order,
            channel,
            self.tz,
            self.collaborators.couriers.as_ref(),
            self.collaborators.numbers.as_ref(),
        );
        let transition = action.execute(&mut ctx, &metadata).await?;
        let mut warnings = ctx.take_warnings();

        // 4. Persist
        let order = if transition.patch.is_empty() {
            order
        } else {
            let updated = self
                .collaborators
                .store
                .update(&order.id, &transition.patch, cmd.timestamp)
                .await?;
            tracing::info!(
                order_id = %updated.id,
                command = cmd.payload.name(),
                operator = cmd.operator_name.as_deref().unwrap_or("-"),
                status = updated.status.as_str(),
                "Command committed"
            );
            // 5. Publish
            self.publish(&updated, ChangeKind::Updated, cmd.timestamp);
            updated
        };

        // 6. Side effects
        let mut task_ids = Vec::with_capacity(transition.effects.len());
        for kind in transition.effects {
            let task = self.outbox.record(&order.id, kind, cmd.timestamp);
            task_ids.push(task.id.clone());
            if let Some(warning) = self.run_task(&task.id, &order).await {
                warnings.push(warning);
            }
        }

        Ok(CommandResponse {
            command_id: cmd.command_id.clone(),
            order,
            assigned_courier: transition.assigned_courier,
            warnings,
            task_ids,
        })
    }

    /// Forget command ids and succeeded tasks older than the dedup window
    ///
    /// Runs at most once per `PRUNE_INTERVAL_MINUTES`; failed tasks are kept.
    fn prune_expired(&self, now: DateTime<Utc>) {
        {
            let mut last = self.last_pruned.lock();
            if last.is_some_and(|at| now - at < Duration::minutes(PRUNE_INTERVAL_MINUTES)) {
                return;
            }
            *last = Some(now);
        }

        let cutoff = now - self.dedup_window;
        let before = self.processed.len();
        self.processed.retain(|_, p| p.claimed_at >= cutoff);
        let commands = before - self.processed.len();
        let tasks = self.outbox.prune_succeeded(cutoff);
        if commands > 0 || tasks > 0 {
            tracing::debug!(commands, tasks, "Pruned expired command ids and outbox tasks");
        }
    }

    /// Print a non-fiscal receipt; failure is reported as a warning
    pub async fn print_non_fiscal(&self, receipt: &NonFiscalReceipt) -> Vec<CommandWarning> {
        match self.collaborators.printer.print_non_fiscal(receipt).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::warn!(order_id = %receipt.document.order_id, error = %e, "Non-fiscal receipt not printed");
                vec![CommandWarning::new(
                    WarningKind::ReceiptPrint,
                    format!("Non-fiscal receipt not printed: {}", e),
                )]
            }
        }
    }

    // ========== Outbox ==========

    /// Retry every failed task against the current order state
    pub async fn retry_failed_tasks(&self) -> Vec<OutboxTask> {
        let mut retried = Vec::new();
        for task in self.outbox.failed() {
            match self.get_order(&task.order_id).await {
                Ok(order) => {
                    self.run_task(&task.id, &order).await;
                }
                Err(e) => {
                    tracing::warn!(task_id = %task.id, order_id = %task.order_id, error = %e, "Retry skipped, order unavailable");
                    self.outbox.mark_failed(&task.id, e.to_string(), Utc::now());
                }
            }
            if let Some(task) = self.outbox.get(&task.id) {
                retried.push(task);
            }
        }
        let still_failed = retried.iter().filter(|t| t.status == TaskStatus::Failed).count();
        tracing::info!(retried = retried.len(), still_failed, "Outbox retry finished");
        retried
    }

    /// Run one task; a warning describes a failure
    async fn run_task(&self, task_id: &str, order: &Order) -> Option<CommandWarning> {
        let task = self.outbox.begin_attempt(task_id, Utc::now())?;
        let (kind, result) = match &task.kind {
            TaskKind::StockDeduction => (
                WarningKind::StockDeduction,
                self.collaborators
                    .stock
                    .deduct(&order.establishment_id, &order.id)
                    .await,
            ),
            TaskKind::ReceiptPrint { .. } => (WarningKind::ReceiptPrint, self.print_receipt(order).await),
        };

        match result {
            Ok(()) => {
                self.outbox.mark_succeeded(&task.id, Utc::now());
                None
            }
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    task_id = %task.id,
                    task = task.kind.name(),
                    attempts = task.attempts,
                    error = %e,
                    "Side effect failed"
                );
                self.outbox.mark_failed(&task.id, e.to_string(), Utc::now());
                Some(CommandWarning::new(kind, format!("{} failed: {}", task.kind.name(), e)))
            }
        }
    }

    async fn print_receipt(&self, order: &Order) -> CollabResult<()> {
        let document = self.composer.compose(order);
        tracing::debug!(order_id = %order.id, strategy = ?document.strategy, items = document.items.len(), "Receipt composed");
        self.collaborators.printer.print_receipt(&document).await
    }

    fn publish(&self, order: &Order, kind: ChangeKind, at: DateTime<Utc>) {
        self.feed.publish(OrderChange {
            order_id: order.id.clone(),
            kind,
            status: order.status,
            at,
        });
    }
}

/// Fill subtotal / total left at zero by the source
fn normalize_amounts(order: &mut Order) {
    if order.subtotal <= 0.0 && !order.items.is_empty() {
        let sum: Decimal = order
            .items
            .iter()
            .map(|i| {
                let total = to_decimal(i.total_price);
                if total > Decimal::ZERO {
                    total
                } else {
                    to_decimal(i.unit_price) * Decimal::from(i.quantity.max(0))
                }
            })
            .sum();
        order.subtotal = to_f64(round_money(sum));
    }
    if order.total_amount <= 0.0 {
        order.total_amount = order.computed_total().max(0.0);
    }
}

#[cfg(test)]
mod tests;
