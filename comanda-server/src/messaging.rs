//! WhatsApp hand-off
//!
//! Builds a `wa.me` deep link asking the customer to pay via PIX. Nothing
//! is sent from here.

use reqwest::Url;
use serde::Serialize;

use shared::order::{Order, OrderStatus, PaymentStatus};

use crate::money::to_decimal;
use crate::receipt::money::format_brl;

const WA_BASE: &str = "https://wa.me/";
const COUNTRY_CODE: &str = "55";
const MIN_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhatsAppHandoff {
    pub phone: String,
    pub message: String,
    pub url: String,
}

impl WhatsAppHandoff {
    /// `None` unless the order has a usable phone, is not cancelled and is unpaid
    pub fn build(order: &Order, pix_key: Option<&str>) -> Option<Self> {
        if order.status == OrderStatus::Cancelled || order.payment_status != PaymentStatus::Pending {
            return None;
        }
        let phone = normalize_phone(order.customer_phone.as_deref()?)?;

        let total = if order.total_amount > 0.0 {
            order.total_amount
        } else {
            order.computed_total()
        };
        let mut message = format!(
            "Olá{}! Seu pedido #{:03} ficou em {}.",
            order
                .customer_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|n| format!(", {}", n))
                .unwrap_or_default(),
            order.order_number,
            format_brl(to_decimal(total)),
        );
        if let Some(key) = pix_key.map(str::trim).filter(|k| !k.is_empty()) {
            message.push_str(&format!(" Chave PIX: {}", key));
        }

        let url = Url::parse_with_params(&format!("{}{}", WA_BASE, phone), &[("text", &message)])
            .ok()?
            .to_string();

        Some(Self {
            phone,
            message,
            url,
        })
    }
}

/// Digits with the country code; `None` when too short
fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let local = digits
        .strip_prefix(COUNTRY_CODE)
        .filter(|rest| rest.len() >= MIN_PHONE_DIGITS && digits.len() > 11)
        .unwrap_or(&digits);
    (local.len() >= MIN_PHONE_DIGITS).then(|| format!("{}{}", COUNTRY_CODE, local))
}
