//! Line-item reconstruction strategies
//!
//! Each strategy implements `ItemExtractor`. They are tried in a fixed
//! order and the first one producing at least one item wins; its output
//! is never merged with another strategy's.

use enum_dispatch::enum_dispatch;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shared::order::{Order, OrderItem};

use super::cleanup::join_and_cleanup;
use super::keywords::is_accompaniment;
use super::money::format_brl;
use super::tokenizer::{ItemBody, bracket_tokens, parse_item_body};
use crate::money::{round_money, to_decimal};
use crate::orders::channel::OrderChannel;

/// Which strategy produced the items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    BracketTokens,
    LegacyLines,
    StoredItems,
    Fallback,
}

/// Everything a strategy may look at
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    /// Raw order text
    pub notes: &'a str,
    pub items: &'a [OrderItem],
    pub channel: OrderChannel,
    pub order_total: Decimal,
}

impl<'a> ParseInput<'a> {
    pub fn from_order(order: &'a Order, channel: OrderChannel) -> Self {
        let stored = to_decimal(order.total_amount);
        let order_total = if stored > Decimal::ZERO {
            stored
        } else {
            to_decimal(order.computed_total())
        };
        Self {
            notes: order.notes.as_deref().unwrap_or(""),
            items: &order.items,
            channel,
            order_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedItem {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub notes: Option<String>,
}

impl From<ItemBody> for ParsedItem {
    fn from(body: ItemBody) -> Self {
        Self {
            unit_price: body.unit_price(),
            notes: join_and_cleanup(body.note_segments(), is_accompaniment(&body.name)),
            total_price: body.total,
            quantity: body.quantity,
            name: body.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReceipt {
    pub items: Vec<ParsedItem>,
    pub strategy: ParseStrategy,
}

/// Item extraction strategy
#[enum_dispatch]
pub trait ItemExtractor {
    fn strategy(&self) -> ParseStrategy;

    /// Items found; empty when the strategy does not apply
    fn extract(&self, input: &ParseInput<'_>) -> Vec<ParsedItem>;
}

/// Strategy A: `[2x Name - R$ 20,00 Obs: ...]` groups
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketTokens;

impl ItemExtractor for BracketTokens {
    fn strategy(&self) -> ParseStrategy {
        ParseStrategy::BracketTokens
    }

    fn extract(&self, input: &ParseInput<'_>) -> Vec<ParsedItem> {
        bracket_tokens(input.notes)
            .into_iter()
            .filter_map(parse_item_body)
            .map(ParsedItem::from)
            .collect()
    }
}

/// Strategy B: one `2x Name - R$ 20,00 ...` item per line
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyLines;

impl ItemExtractor for LegacyLines {
    fn strategy(&self) -> ParseStrategy {
        ParseStrategy::LegacyLines
    }

    fn extract(&self, input: &ParseInput<'_>) -> Vec<ParsedItem> {
        input
            .notes
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '•', '*']))
            .filter_map(parse_item_body)
            .map(ParsedItem::from)
            .collect()
    }
}

/// Strategy C: persisted item records
#[derive(Debug, Clone, Copy, Default)]
pub struct StoredItems;

impl StoredItems {
    fn parse_item(item: &OrderItem) -> Option<ParsedItem> {
        let name = item.product_name.trim();
        if name.is_empty() || item.quantity <= 0 {
            return None;
        }
        let quantity = item.quantity as u32;
        let unit_price = round_money(to_decimal(item.unit_price));
        let stored_total = to_decimal(item.total_price);
        let total_price = if stored_total > Decimal::ZERO {
            round_money(stored_total)
        } else {
            round_money(unit_price * Decimal::from(quantity))
        };

        let addons = item.customizations.iter().filter(|c| !c.name.trim().is_empty()).map(|c| {
            let qty = c.quantity.max(1);
            let amount = to_decimal(c.unit_price) * Decimal::from(qty);
            format!("{}x {} - {}", qty, c.name.trim(), format_brl(amount))
        });
        let segments: Vec<String> = item.notes.iter().cloned().chain(addons).collect();

        Some(ParsedItem {
            name: name.to_string(),
            quantity,
            unit_price,
            total_price,
            notes: join_and_cleanup(segments, is_accompaniment(name)),
        })
    }
}

impl ItemExtractor for StoredItems {
    fn strategy(&self) -> ParseStrategy {
        ParseStrategy::StoredItems
    }

    fn extract(&self, input: &ParseInput<'_>) -> Vec<ParsedItem> {
        input.items.iter().filter_map(Self::parse_item).collect()
    }
}

/// Strategy D: one pseudo-item at the order total
#[derive(Debug, Clone, Copy, Default)]
pub struct Fallback;

impl ItemExtractor for Fallback {
    fn strategy(&self) -> ParseStrategy {
        ParseStrategy::Fallback
    }

    fn extract(&self, input: &ParseInput<'_>) -> Vec<ParsedItem> {
        let total = round_money(input.order_total.max(Decimal::ZERO));
        vec![ParsedItem {
            name: input.channel.fallback_item_name().to_string(),
            quantity: 1,
            unit_price: total,
            total_price: total,
            notes: None,
        }]
    }
}

#[enum_dispatch(ItemExtractor)]
#[derive(Debug, Clone, Copy)]
pub enum Extractor {
    BracketTokens(BracketTokens),
    LegacyLines(LegacyLines),
    StoredItems(StoredItems),
    Fallback(Fallback),
}

/// Extraction order
pub const PIPELINE: [Extractor; 4] = [
    Extractor::BracketTokens(BracketTokens),
    Extractor::LegacyLines(LegacyLines),
    Extractor::StoredItems(StoredItems),
    Extractor::Fallback(Fallback),
];

/// Run the pipeline; first non-empty result wins
pub fn parse_items(input: &ParseInput<'_>) -> ParsedReceipt {
    for extractor in PIPELINE {
        let items = extractor.extract(input);
        if !items.is_empty() {
            tracing::trace!(strategy = ?extractor.strategy(), count = items.len(), "Items reconstructed");
            return ParsedReceipt {
                items,
                strategy: extractor.strategy(),
            };
        }
    }
    // Fallback always yields one item
    ParsedReceipt {
        items: Fallback.extract(input),
        strategy: ParseStrategy::Fallback,
    }
}

/// Reconstruct an order's line items
pub fn parse_order_items(order: &Order, channel: OrderChannel) -> ParsedReceipt {
    parse_items(&ParseInput::from_order(order, channel))
}
