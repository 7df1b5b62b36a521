//! Tokenizer for semi-structured item text
//!
//! Item bodies look like `2x Cheeseburger + Trio (Batata) - R$ 20,00 Obs: sem cebola`:
//! a quantity marker, a name (optionally followed by combo annotations and
//! marker notes), an `R$` line total and optional trailing notes.

use rust_decimal::Decimal;

use super::keywords::find_first_marker;
use super::money::split_leading_amount;
use crate::money::round_money;

/// Largest accepted quantity marker
pub const MAX_QUANTITY: u32 = 1000;

/// Contents of `[...]` groups in order of appearance
///
/// Unclosed groups are dropped; a `[` inside an open group restarts it.
pub fn bracket_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut open: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match c {
            '[' => open = Some(i + 1),
            ']' => {
                if let Some(start) = open.take() {
                    tokens.push(&text[start..i]);
                }
            }
            _ => {}
        }
    }
    tokens
}

/// Leading `{n}x ` marker: quantity and the text after it
pub fn split_quantity(s: &str) -> Option<(u32, &str)> {
    let s = s.trim_start();
    let digits_end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)?;
    if digits_end == 0 || digits_end > 4 {
        return None;
    }
    let quantity: u32 = s[..digits_end].parse().ok()?;
    let rest = s[digits_end..]
        .strip_prefix('x')
        .or_else(|| s[digits_end..].strip_prefix('X'))?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    (1..=MAX_QUANTITY)
        .contains(&quantity)
        .then_some((quantity, rest.trim_start()))
}

/// Tokenized item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBody {
    pub quantity: u32,
    pub name: String,
    /// Line total
    pub total: Decimal,
    /// Marker / trailing notes, in source order
    pub notes: Vec<String>,
    /// Extracted combo annotations (`Trio: Batata`)
    pub combos: Vec<String>,
}

impl ItemBody {
    pub fn unit_price(&self) -> Decimal {
        round_money(self.total / Decimal::from(self.quantity))
    }

    /// Notes segments, marker notes before combo notes
    pub fn note_segments(&self) -> Vec<String> {
        self.notes.iter().chain(self.combos.iter()).cloned().collect()
    }
}

/// Trailing `R$` amount: byte offset of its marker, the total and the text after it
///
/// Earlier `R$` amounts (add-on prices) stay with the name or notes.
fn find_line_total(s: &str) -> Option<(usize, Decimal, &str)> {
    s.char_indices()
        .rev()
        .map(|(i, _)| i)
        .filter(|&i| s[i..].starts_with("R$") || s[i..].starts_with("r$"))
        .find_map(|i| {
            split_leading_amount(&s[i + 2..]).map(|(total, trailing)| (i, total, trailing))
        })
}

fn trim_separators(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | ':' | ';' | ',' | '.'))
}

/// Split `+ Label (Content)` annotations off a name
fn extract_combos(name: &str) -> (String, Vec<String>) {
    let mut parts = name.split('+');
    let mut kept: Vec<&str> = parts.next().map(str::trim).into_iter().collect();
    let mut combos = Vec::new();

    for part in parts {
        let part = part.trim();
        if let Some(open) = part.find('(')
            && part.ends_with(')')
        {
            let label = part[..open].trim();
            let content = part[open + 1..part.len() - 1].trim();
            if !label.is_empty() && !content.is_empty() {
                combos.push(format!("{}: {}", label, content));
                continue;
            }
        }
        kept.push(part);
    }

    let base = kept
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" + ");
    (base, combos)
}

/// Parse one item body; `None` when quantity, price or name is missing
pub fn parse_item_body(body: &str) -> Option<ItemBody> {
    let (quantity, rest) = split_quantity(body)?;
    let (currency, total, trailing) = find_line_total(rest)?;

    let before = trim_separators(&rest[..currency]);
    let (name_part, marker_note) = match find_first_marker(before) {
        Some(at) => (&before[..at], Some(before[at..].trim())),
        None => (before, None),
    };

    let (name, combos) = extract_combos(trim_separators(name_part));
    if name.is_empty() {
        return None;
    }

    let mut notes = Vec::new();
    if let Some(note) = marker_note.filter(|n| !n.is_empty()) {
        notes.push(note.to_string());
    }
    let trailing = trim_separators(trailing);
    if !trailing.is_empty() {
        notes.push(trailing.to_string());
    }

    Some(ItemBody {
        quantity,
        name,
        total,
        notes,
        combos,
    })
}
