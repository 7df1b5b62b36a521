//! Brazilian real amounts
//!
//! `R$ 1.234,56`: comma is the decimal separator, dots group thousands.
//! Amounts without a comma are read as plain decimals (`23.50`).

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::money::round_money;

/// Parse an amount with or without the `R$` prefix
///
/// Negative or malformed amounts yield `None`.
pub fn parse_brl_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("R$")
        .or_else(|| trimmed.strip_prefix("r$"))
        .unwrap_or(trimmed)
        .trim();
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }

    let normalized = if body.contains(',') {
        body.replace('.', "").replace(',', ".")
    } else {
        body.to_string()
    };
    let value = Decimal::from_str(&normalized).ok()?;
    (value >= Decimal::ZERO).then_some(value)
}

/// Leading amount of `s` and the remainder after it
///
/// `"20,00 Obs: sem cebola"` → `(20.00, " Obs: sem cebola")`
pub fn split_leading_amount(s: &str) -> Option<(Decimal, &str)> {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.' || *c == ','))
        .map_or(s.len(), |(i, _)| i);
    let literal = s[..end].trim_end_matches(['.', ',']);
    let amount = parse_brl_amount(literal)?;
    Some((amount, &s[literal.len()..]))
}

/// `R$ 1.234,56`
pub fn format_brl(value: Decimal) -> String {
    let rounded = round_money(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let abs = rounded.abs();
    let plain = format!("{:.2}", abs);
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("{}R$ {},{}", if negative { "-" } else { "" }, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_comma_decimal() {
        assert_eq!(parse_brl_amount("R$ 1.234,56"), Some(dec("1234.56")));
        assert_eq!(parse_brl_amount("R$20,00"), Some(dec("20.00")));
        assert_eq!(parse_brl_amount("0,5"), Some(dec("0.5")));
    }

    #[test]
    fn test_parse_plain_decimal() {
        assert_eq!(parse_brl_amount("23.50"), Some(dec("23.50")));
        assert_eq!(parse_brl_amount("R$ 7"), Some(dec("7")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_brl_amount(""), None);
        assert_eq!(parse_brl_amount("R$"), None);
        assert_eq!(parse_brl_amount("-5,00"), None);
        assert_eq!(parse_brl_amount("dez reais"), None);
        assert_eq!(parse_brl_amount("1,2,3"), None);
    }

    #[test]
    fn test_split_leading_amount() {
        let (amount, rest) = split_leading_amount(" 20,00 Obs: sem cebola").unwrap();
        assert_eq!(amount, dec("20.00"));
        assert_eq!(rest, " Obs: sem cebola");

        let (amount, rest) = split_leading_amount("15,90.").unwrap();
        assert_eq!(amount, dec("15.90"));
        assert_eq!(rest, ".");

        assert!(split_leading_amount("abc").is_none());
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(dec("1234.56")), "R$ 1.234,56");
        assert_eq!(format_brl(dec("10")), "R$ 10,00");
        assert_eq!(format_brl(dec("1234567.891")), "R$ 1.234.567,89");
        assert_eq!(format_brl(dec("0")), "R$ 0,00");
        assert_eq!(format_brl(dec("-5.5")), "-R$ 5,50");
    }
}
