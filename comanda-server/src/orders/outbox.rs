//! Side-effect outbox
//!
//! Stock deduction and receipt printing are recorded as tasks before they
//! run and marked succeeded / failed afterwards. Failed tasks stay listed
//! until a retry succeeds; succeeded ones are pruned after a while.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Why a receipt is (re)printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptReason {
    Accepted,
    PaymentMethodChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskKind {
    StockDeduction,
    ReceiptPrint { reason: ReceiptReason },
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::StockDeduction => "stock_deduction",
            TaskKind::ReceiptPrint { .. } => "receipt_print",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Observable record of one side effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxTask {
    pub id: String,
    pub order_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory task table
#[derive(Debug, Default)]
pub struct Outbox {
    tasks: DashMap<String, OutboxTask>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending task
    pub fn record(&self, order_id: &str, kind: TaskKind, now: DateTime<Utc>) -> OutboxTask {
        let task = OutboxTask {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            kind,
            status: TaskStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.tasks.insert(task.id.clone(), task.clone());
        task
    }

    /// Count an attempt; `None` if the task is unknown or already succeeded
    pub fn begin_attempt(&self, id: &str, now: DateTime<Utc>) -> Option<OutboxTask> {
        let mut task = self.tasks.get_mut(id)?;
        if task.status == TaskStatus::Succeeded {
            return None;
        }
        task.attempts += 1;
        task.status = TaskStatus::Pending;
        task.updated_at = now;
        Some(task.clone())
    }

    pub fn mark_succeeded(&self, id: &str, now: DateTime<Utc>) {
        if let Some(mut task) = self.tasks.get_mut(id) {
            task.status = TaskStatus::Succeeded;
            task.last_error = None;
            task.updated_at = now;
        }
    }

    pub fn mark_failed(&self, id: &str, error: impl Into<String>, now: DateTime<Utc>) {
        if let Some(mut task) = self.tasks.get_mut(id) {
            task.status = TaskStatus::Failed;
            task.last_error = Some(error.into());
            task.updated_at = now;
        }
    }

    /// Drop succeeded tasks recorded before `cutoff`; returns how many
    pub fn prune_succeeded(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.tasks.len();
        self.tasks
            .retain(|_, t| !(t.status == TaskStatus::Succeeded && t.created_at < cutoff));
        before - self.tasks.len()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<OutboxTask> {
        self.tasks.get(id).map(|t| t.clone())
    }

    /// Failed tasks, oldest first
    pub fn failed(&self) -> Vec<OutboxTask> {
        self.collect(|t| t.status == TaskStatus::Failed)
    }

    pub fn for_order(&self, order_id: &str) -> Vec<OutboxTask> {
        self.collect(|t| t.order_id == order_id)
    }

    fn collect(&self, filter: impl Fn(&OutboxTask) -> bool) -> Vec<OutboxTask> {
        let mut tasks: Vec<OutboxTask> = self
            .tasks
            .iter()
            .filter(|t| filter(t.value()))
            .map(|t| t.value().clone())
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }
}
