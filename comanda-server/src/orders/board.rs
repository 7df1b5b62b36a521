//! Order board read model
//!
//! [`BoardView`] is the operator's view state (tab, search text, selected
//! order, history filters). It is an explicit record owned by the caller
//! and passed by reference; the board itself holds no UI state.

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::order::Order;

use super::channel::{ChannelClassifier, OrderChannel};
use super::tabs::{AllTabFilter, OrderTab, TabTable};

/// Operator view state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    pub tab: OrderTab,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub selected_order_id: Option<String>,
    #[serde(default)]
    pub all_filter: AllTabFilter,
}

impl BoardView {
    pub fn new(tab: OrderTab) -> Self {
        Self {
            tab,
            search: String::new(),
            selected_order_id: None,
            all_filter: AllTabFilter::default(),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn select(&mut self, order_id: impl Into<String>) {
        self.selected_order_id = Some(order_id.into());
    }

    pub fn clear_selection(&mut self) {
        self.selected_order_id = None;
    }
}

impl Default for BoardView {
    fn default() -> Self {
        Self::new(OrderTab::Pending)
    }
}

/// One row of the board
#[derive(Debug, Clone, Serialize)]
pub struct BoardEntry {
    pub channel: OrderChannel,
    /// Partitioned tab the order lives in, if any
    pub tab: Option<OrderTab>,
    pub order: Order,
}

/// Classifier + tab table + business timezone
#[derive(Debug, Clone)]
pub struct OrderBoard {
    classifier: ChannelClassifier,
    table: TabTable,
    tz: Tz,
}

impl OrderBoard {
    pub fn new(classifier: ChannelClassifier, table: TabTable, tz: Tz) -> Self {
        Self {
            classifier,
            table,
            tz,
        }
    }

    pub fn classifier(&self) -> &ChannelClassifier {
        &self.classifier
    }

    pub fn table(&self) -> &TabTable {
        &self.table
    }

    pub fn entry(&self, order: &Order) -> BoardEntry {
        let channel = self.classifier.classify(order);
        BoardEntry {
            channel,
            tab: self.table.primary_tab(order, channel),
            order: order.clone(),
        }
    }

    fn in_tab(&self, view: &BoardView, order: &Order, today: NaiveDate) -> bool {
        let channel = self.classifier.classify(order);
        match view.tab {
            OrderTab::All => view.all_filter.matches(order, channel, today, self.tz),
            tab => self.table.matches(tab, order, channel),
        }
    }

    /// Orders of the view's tab matching its search text, newest first
    pub fn visible_orders(
        &self,
        orders: &[Order],
        view: &BoardView,
        today: NaiveDate,
    ) -> Vec<BoardEntry> {
        let query = SearchQuery::new(&view.search);
        let mut rows: Vec<BoardEntry> = orders
            .iter()
            .filter(|o| self.in_tab(view, o, today) && query.matches(o))
            .map(|o| self.entry(o))
            .collect();
        rows.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then(b.order.order_number.cmp(&a.order.order_number))
        });
        rows
    }

    /// Badge counts per tab (search text ignored)
    pub fn tab_counts(&self, orders: &[Order], view: &BoardView, today: NaiveDate) -> Vec<(OrderTab, usize)> {
        let mut counts: Vec<(OrderTab, usize)> =
            OrderTab::PARTITIONED.iter().map(|t| (*t, 0)).collect();
        for order in orders {
            let channel = self.classifier.classify(order);
            if let Some(tab) = self.table.primary_tab(order, channel)
                && let Some(slot) = counts.iter_mut().find(|(t, _)| *t == tab)
            {
                slot.1 += 1;
            }
        }
        let all = orders
            .iter()
            .filter(|o| {
                view.all_filter
                    .matches(o, self.classifier.classify(o), today, self.tz)
            })
            .count();
        counts.push((OrderTab::All, all));
        counts
    }

    /// Currently selected order, if it is still loaded
    pub fn selected<'a>(&self, orders: &'a [Order], view: &BoardView) -> Option<&'a Order> {
        let id = view.selected_order_id.as_deref()?;
        orders.iter().find(|o| o.id == id)
    }
}

/// Free-text search over name, phone digits and order number
struct SearchQuery {
    text: String,
    digits: String,
}

impl SearchQuery {
    fn new(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        let digits = text.chars().filter(char::is_ascii_digit).collect();
        Self { text, digits }
    }

    fn matches(&self, order: &Order) -> bool {
        if self.text.is_empty() {
            return true;
        }
        if order
            .customer_name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().contains(&self.text))
        {
            return true;
        }
        if self.text.trim_start_matches('#') == order.order_number.to_string() {
            return true;
        }
        !self.digits.is_empty()
            && order.customer_phone.as_deref().is_some_and(|p| {
                p.chars()
                    .filter(char::is_ascii_digit)
                    .collect::<String>()
                    .contains(&self.digits)
            })
    }
}
