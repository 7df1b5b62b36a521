//! Tab partitioner
//!
//! One predicate table per deployment mode. The five operational tabs are
//! pairwise disjoint; precedence is Rejected → Receivables → channel tabs,
//! so a rejected order only shows in Rejected and an open receivable only
//! in Receivables. The `All` tab is a filtered history view over fully
//! confirmed orders and is evaluated separately by [`AllTabFilter`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::order::{Order, OrderStatus, OrderType, PaymentStatus};

use super::channel::OrderChannel;
use crate::utils::time::local_date;

/// Which online channel is authoritative for the Pending tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentMode {
    #[default]
    PartnerSite,
    OnlineMenu,
}

impl DeploymentMode {
    pub fn primary_channel(self) -> OrderChannel {
        match self {
            DeploymentMode::PartnerSite => OrderChannel::PartnerSite,
            DeploymentMode::OnlineMenu => OrderChannel::OnlineMenu,
        }
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "partner_site" | "partner" => Ok(DeploymentMode::PartnerSite),
            "online_menu" | "menu" => Ok(DeploymentMode::OnlineMenu),
            other => Err(format!("unknown deployment mode: {}", other)),
        }
    }
}

/// Board tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTab {
    Pending,
    Kiosk,
    /// Open till orders (PDV / "Concluídos" column)
    PointOfSale,
    Rejected,
    Receivables,
    All,
}

impl OrderTab {
    /// Tabs that partition the working set
    pub const PARTITIONED: [OrderTab; 5] = [
        OrderTab::Pending,
        OrderTab::Kiosk,
        OrderTab::PointOfSale,
        OrderTab::Rejected,
        OrderTab::Receivables,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderTab::Pending => "pending",
            OrderTab::Kiosk => "kiosk",
            OrderTab::PointOfSale => "point_of_sale",
            OrderTab::Rejected => "rejected",
            OrderTab::Receivables => "receivables",
            OrderTab::All => "all",
        }
    }
}

impl fmt::Display for OrderTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderTab::Pending),
            "kiosk" => Ok(OrderTab::Kiosk),
            "point_of_sale" | "pdv" | "completed" => Ok(OrderTab::PointOfSale),
            "rejected" => Ok(OrderTab::Rejected),
            "receivables" => Ok(OrderTab::Receivables),
            "all" => Ok(OrderTab::All),
            other => Err(format!("unknown tab: {}", other)),
        }
    }
}

/// Everything a tab predicate may look at
#[derive(Debug, Clone, Copy)]
pub struct TabInput<'a> {
    pub order: &'a Order,
    pub channel: OrderChannel,
    /// Primary online channel of the deployment
    pub primary: OrderChannel,
}

type TabPredicate = fn(&TabInput<'_>) -> bool;

fn is_rejected(input: &TabInput<'_>) -> bool {
    input.order.is_rejected()
}

fn is_receivable(input: &TabInput<'_>) -> bool {
    !is_rejected(input) && input.order.is_open_receivable()
}

/// Neither rejected nor an open receivable
fn is_channel_candidate(input: &TabInput<'_>) -> bool {
    !input.order.is_rejected() && !input.order.is_open_receivable()
}

fn is_pending(input: &TabInput<'_>) -> bool {
    is_channel_candidate(input)
        && input.channel == input.primary
        && !input.order.is_fully_confirmed()
}

fn is_kiosk(input: &TabInput<'_>) -> bool {
    is_channel_candidate(input) && input.channel == OrderChannel::Kiosk
}

fn is_open_till(input: &TabInput<'_>) -> bool {
    is_channel_candidate(input)
        && input.channel == OrderChannel::PointOfSale
        && (input.order.status == OrderStatus::Pending
            || input.order.payment_status == PaymentStatus::Pending)
}

/// Predicate table for one deployment mode
#[derive(Debug, Clone)]
pub struct TabTable {
    mode: DeploymentMode,
    rows: [(OrderTab, TabPredicate); 5],
}

impl TabTable {
    pub fn for_mode(mode: DeploymentMode) -> Self {
        Self {
            mode,
            rows: [
                (OrderTab::Rejected, is_rejected),
                (OrderTab::Receivables, is_receivable),
                (OrderTab::Pending, is_pending),
                (OrderTab::Kiosk, is_kiosk),
                (OrderTab::PointOfSale, is_open_till),
            ],
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    fn input<'a>(&self, order: &'a Order, channel: OrderChannel) -> TabInput<'a> {
        TabInput {
            order,
            channel,
            primary: self.mode.primary_channel(),
        }
    }

    /// Whether `order` belongs to a partitioned `tab`. Always false for `All`.
    pub fn matches(&self, tab: OrderTab, order: &Order, channel: OrderChannel) -> bool {
        let input = self.input(order, channel);
        self.rows
            .iter()
            .find(|(t, _)| *t == tab)
            .is_some_and(|(_, predicate)| predicate(&input))
    }

    /// The single partitioned tab an order shows in, if any
    pub fn primary_tab(&self, order: &Order, channel: OrderChannel) -> Option<OrderTab> {
        let input = self.input(order, channel);
        self.rows
            .iter()
            .find(|(_, predicate)| predicate(&input))
            .map(|(tab, _)| *tab)
    }
}

/// Filters of the `All` (history) tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllTabFilter {
    /// Exact business day; `None` = today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub delivery_only: bool,
    /// Till + kiosk orders
    #[serde(default = "default_true")]
    pub show_pdv: bool,
    /// Partner site + online menu orders
    #[serde(default = "default_true")]
    pub show_site: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AllTabFilter {
    fn default() -> Self {
        Self {
            date: None,
            payment_method: None,
            delivery_only: false,
            show_pdv: true,
            show_site: true,
        }
    }
}

impl AllTabFilter {
    pub fn matches(&self, order: &Order, channel: OrderChannel, today: NaiveDate, tz: Tz) -> bool {
        if !order.is_fully_confirmed() || order.is_open_receivable() {
            return false;
        }

        let day = self.date.unwrap_or(today);
        if local_date(order.created_at, tz) != day {
            return false;
        }

        if let Some(method) = self.payment_method.as_deref().map(str::trim)
            && !method.is_empty()
            && order.payment_method.as_deref().map(str::trim) != Some(method)
        {
            return false;
        }

        if self.delivery_only && order.order_type != OrderType::Delivery {
            return false;
        }

        match (self.show_pdv, self.show_site) {
            (false, false) => false,
            (true, true) => true,
            (true, false) => channel.is_pdv(),
            (false, true) => channel.is_site(),
        }
    }
}
