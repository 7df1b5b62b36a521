//! Canonical receipt composition
//!
//! Builds the printer-facing `ReceiptDocument` from an order, independent
//! of how the order text was originally structured.

use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared::models::StoreInfo;
use shared::order::Order;

use super::instructions::general_instructions;
use super::strategies::{ParseStrategy, ParsedItem, parse_order_items};
use crate::money::{to_decimal, to_f64};
use crate::orders::channel::{ChannelClassifier, OrderChannel};
use crate::utils::time::format_local;

/// Shortest accepted customer phone (digits)
const MIN_PHONE_DIGITS: usize = 8;

#[derive(Debug, Error, PartialEq)]
pub enum ReceiptError {
    #[error("Customer phone is required for a non-fiscal receipt")]
    PhoneRequired,

    #[error("Invalid CPF: {0}")]
    InvalidCpf(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptHeader {
    pub store_name: String,
    pub store_address: Option<String>,
    pub store_phone: Option<String>,
    pub order_number: u64,
    /// Order creation time, business timezone
    pub created_at: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub table_number: Option<String>,
    pub delivery_address: Option<String>,
    pub courier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub notes: Option<String>,
}

impl From<&ParsedItem> for ReceiptLine {
    fn from(item: &ParsedItem) -> Self {
        Self {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: to_f64(item.unit_price),
            total_price: to_f64(item.total_price),
            notes: item.notes.clone(),
        }
    }
}

/// Document handed to the printer collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    pub order_id: String,
    pub header: ReceiptHeader,
    pub items: Vec<ReceiptLine>,
    pub subtotal: f64,
    pub discount: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub total: f64,
    pub payment_method: Option<String>,
    pub order_type: String,
    pub general_instructions: Option<String>,
    pub channel: OrderChannel,
    pub strategy: ParseStrategy,
}

/// Receipt variant with the customer's phone and optional CPF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonFiscalReceipt {
    pub document: ReceiptDocument,
    pub customer_phone: String,
    /// 11 digits, no punctuation
    pub cpf: Option<String>,
}

impl NonFiscalReceipt {
    pub fn new(
        document: ReceiptDocument,
        phone: &str,
        cpf: Option<&str>,
    ) -> Result<Self, ReceiptError> {
        let phone = phone.trim();
        if digits(phone).len() < MIN_PHONE_DIGITS {
            return Err(ReceiptError::PhoneRequired);
        }

        let cpf = match cpf.map(str::trim).filter(|c| !c.is_empty()) {
            Some(raw) => {
                let normalized = digits(raw);
                if !raw.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | ' '))
                    || !is_valid_cpf(&normalized)
                {
                    return Err(ReceiptError::InvalidCpf(raw.to_string()));
                }
                Some(normalized)
            }
            None => None,
        };

        Ok(Self {
            document,
            customer_phone: phone.to_string(),
            cpf,
        })
    }
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// 11 digits, both check digits valid, not a repeated digit
pub fn is_valid_cpf(cpf: &str) -> bool {
    let d: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 11 || cpf.len() != 11 || d.iter().all(|&x| x == d[0]) {
        return false;
    }
    let check = |len: usize| {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, &x)| x * (len as u32 + 1 - i as u32))
            .sum();
        let rest = (sum * 10) % 11;
        if rest == 10 { 0 } else { rest }
    };
    check(9) == d[9] && check(10) == d[10]
}

/// Order → `ReceiptDocument`
#[derive(Debug, Clone)]
pub struct ReceiptComposer {
    store: StoreInfo,
    tz: Tz,
    classifier: ChannelClassifier,
}

impl ReceiptComposer {
    pub fn new(store: StoreInfo, tz: Tz, classifier: ChannelClassifier) -> Self {
        Self {
            store,
            tz,
            classifier,
        }
    }

    pub fn compose(&self, order: &Order) -> ReceiptDocument {
        let channel = self.classifier.classify(order);
        let parsed = parse_order_items(order, channel);

        let lines_total: Decimal = parsed.items.iter().map(|i| i.total_price).sum();
        let stored_subtotal = to_decimal(order.subtotal);
        let subtotal = if stored_subtotal > Decimal::ZERO {
            stored_subtotal
        } else {
            lines_total
        };

        let discount = to_decimal(order.discount_amount);
        let delivery_fee = to_decimal(order.delivery_fee);
        let tax = to_decimal(order.tax_amount);
        let stored_total = to_decimal(order.total_amount);
        let total = if stored_total > Decimal::ZERO {
            stored_total
        } else {
            subtotal - discount + delivery_fee + tax
        };

        ReceiptDocument {
            order_id: order.id.clone(),
            header: ReceiptHeader {
                store_name: self.store.name.clone(),
                store_address: self.store.address.clone(),
                store_phone: self.store.phone.clone(),
                order_number: order.order_number,
                created_at: format_local(order.created_at, self.tz),
                customer_name: non_blank(&order.customer_name),
                customer_phone: non_blank(&order.customer_phone),
                table_number: non_blank(&order.table_number),
                delivery_address: non_blank(&order.delivery_address),
                courier_name: non_blank(&order.courier_name),
            },
            items: parsed.items.iter().map(ReceiptLine::from).collect(),
            subtotal: to_f64(subtotal),
            discount: to_f64(discount),
            delivery_fee: to_f64(delivery_fee),
            tax: to_f64(tax),
            total: to_f64(total),
            payment_method: non_blank(&order.payment_method),
            order_type: order.order_type.receipt_label().to_string(),
            general_instructions: order.notes.as_deref().and_then(general_instructions),
            channel,
            strategy: parsed.strategy,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::channel::ChannelRules;
    use chrono::{TimeZone, Utc};
    use shared::order::OrderType;

    fn composer() -> ReceiptComposer {
        ReceiptComposer::new(
            StoreInfo {
                name: "Lanchonete da Praça".to_string(),
                address: Some("Rua A, 1".to_string()),
                phone: None,
                timezone: "America/Sao_Paulo".to_string(),
            },
            chrono_tz::America::Sao_Paulo,
            ChannelClassifier::new(ChannelRules::with_partner_patterns(["parceiro.com"])),
        )
    }

    fn site_order() -> Order {
        let created = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        let mut order = Order::new("o-1", "est-1", 42, created);
        order.source_domain = Some("loja.parceiro.com".to_string());
        order.order_type = OrderType::Delivery;
        order.customer_name = Some("Ana".to_string());
        order.customer_phone = Some("  ".to_string());
        order.payment_method = Some("Pix".to_string());
        order.delivery_fee = 5.0;
        order.notes = Some(
            "[2x Cheeseburger - R$20,00 Obs: sem cebola]\n[1x Coca - R$ 6,00]\nTotal: R$ 31,00\nTocar a campainha"
                .to_string(),
        );
        order
    }

    #[test]
    fn test_compose_site_order() {
        let doc = composer().compose(&site_order());

        assert_eq!(doc.channel, OrderChannel::PartnerSite);
        assert_eq!(doc.strategy, ParseStrategy::BracketTokens);
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].unit_price, 10.0);
        // subtotal from lines, total from components
        assert_eq!(doc.subtotal, 26.0);
        assert_eq!(doc.total, 31.0);
        assert_eq!(doc.header.created_at, "10/03/2026 12:30");
        assert_eq!(doc.header.customer_phone, None);
        assert_eq!(doc.order_type, "Entrega");
        assert_eq!(doc.general_instructions.as_deref(), Some("Tocar a campainha"));
    }

    #[test]
    fn test_stored_amounts_win() {
        let mut order = site_order();
        order.subtotal = 24.0;
        order.total_amount = 27.5;
        let doc = composer().compose(&order);
        assert_eq!(doc.subtotal, 24.0);
        assert_eq!(doc.total, 27.5);
    }

    #[test]
    fn test_cpf_validation() {
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("52998224724"));
        assert!(!is_valid_cpf("11111111111"));
        assert!(!is_valid_cpf("5299822472"));
    }

    #[test]
    fn test_non_fiscal_receipt() {
        let doc = composer().compose(&site_order());

        assert_eq!(
            NonFiscalReceipt::new(doc.clone(), "1234", None),
            Err(ReceiptError::PhoneRequired)
        );
        assert!(matches!(
            NonFiscalReceipt::new(doc.clone(), "(11) 98888-7777", Some("111.111.111-11")),
            Err(ReceiptError::InvalidCpf(_))
        ));

        let receipt =
            NonFiscalReceipt::new(doc.clone(), "(11) 98888-7777", Some("529.982.247-25")).unwrap();
        assert_eq!(receipt.cpf.as_deref(), Some("52998224725"));

        let receipt = NonFiscalReceipt::new(doc, "(11) 98888-7777", Some("  ")).unwrap();
        assert_eq!(receipt.cpf, None);
    }
}
