//! 赊账 (fiado) 应收与利息
//!
//! Simple daily interest on overdue credit sales:
//! `interest = principal × rate × days_overdue`, days counted between
//! local midnights. Received sales keep the interest frozen at receipt.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use shared::order::Order;

use crate::money::{round_money, to_decimal, to_f64};

/// Whole days past the due date, never negative
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days().max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueBucket {
    DueToday,
    Overdue,
    NotYetDue,
}

/// Bucket for display; no due date counts as not yet due
pub fn bucket_for(due: Option<NaiveDate>, today: NaiveDate) -> DueBucket {
    match due {
        Some(d) if d == today => DueBucket::DueToday,
        Some(d) if d < today => DueBucket::Overdue,
        _ => DueBucket::NotYetDue,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditAccrual {
    pub order_id: String,
    pub principal: f64,
    pub days_overdue: i64,
    pub interest: f64,
    pub total_due: f64,
    /// Interest taken from the stored amount (already received)
    pub frozen: bool,
    pub bucket: DueBucket,
}

/// Interest owed for `principal` at `rate` per day
pub fn interest_for(principal: Decimal, rate: Decimal, days: i64) -> Decimal {
    if rate <= Decimal::ZERO || days <= 0 || principal <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_money(principal * rate * Decimal::from(days))
}

/// Accrual for a credit sale; `None` for anything else
pub fn accrue(order: &Order, today: NaiveDate) -> Option<CreditAccrual> {
    if !order.is_credit_sale {
        return None;
    }

    let principal = round_money(to_decimal(order.total_amount).max(Decimal::ZERO));
    let days = order
        .credit_due_date
        .map_or(0, |due| days_overdue(due, today));

    let (interest, frozen) = if order.credit_received_at.is_some() {
        let stored = order.credit_interest_amount.map(to_decimal).unwrap_or_default();
        (round_money(stored.max(Decimal::ZERO)), true)
    } else {
        let rate = order
            .credit_interest_rate_per_day
            .map(to_decimal)
            .unwrap_or_default();
        (interest_for(principal, rate, days), false)
    };

    Some(CreditAccrual {
        order_id: order.id.clone(),
        principal: to_f64(principal),
        days_overdue: days,
        interest: to_f64(interest),
        total_due: to_f64(principal + interest),
        frozen,
        bucket: bucket_for(order.credit_due_date, today),
    })
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketSummary {
    pub count: usize,
    pub total_due: f64,
    pub entries: Vec<CreditAccrual>,
}

impl BucketSummary {
    fn push(&mut self, accrual: CreditAccrual) {
        self.count += 1;
        self.total_due = to_f64(to_decimal(self.total_due) + to_decimal(accrual.total_due));
        self.entries.push(accrual);
    }
}

/// Open receivables grouped by due bucket
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReceivablesBoard {
    pub due_today: BucketSummary,
    pub overdue: BucketSummary,
    pub not_yet_due: BucketSummary,
    pub total_due: f64,
}

impl ReceivablesBoard {
    pub fn build<'a, I>(orders: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a Order>,
    {
        let mut board = Self::default();
        let mut total = Decimal::ZERO;

        for order in orders.into_iter().filter(|o| o.is_open_receivable()) {
            let Some(accrual) = accrue(order, today) else {
                continue;
            };
            total += to_decimal(accrual.total_due);
            match accrual.bucket {
                DueBucket::DueToday => board.due_today.push(accrual),
                DueBucket::Overdue => board.overdue.push(accrual),
                DueBucket::NotYetDue => board.not_yet_due.push(accrual),
            }
        }

        // Most overdue first
        board
            .overdue
            .entries
            .sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        board.total_due = to_f64(total);
        board
    }
}
