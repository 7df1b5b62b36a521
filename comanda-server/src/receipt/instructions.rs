//! Order-level general instructions
//!
//! Derived from the raw order text independently of item notes: an
//! explicit instructions marker wins; otherwise every recognized
//! structured section is stripped and whatever is left is used.

use super::keywords::{find_label, is_financial_word, is_service_type_label, normalize_word};
use super::tokenizer::split_quantity;

const INSTRUCTION_MARKERS: &[&str] = &[
    "Instruções do pedido:",
    "Instrucoes do pedido:",
    "Observações do pedido:",
    "Observacoes do pedido:",
    "Obs do pedido:",
    "Order instructions:",
    "Instruções:",
    "Instrucoes:",
];

/// Labels of customer / logistics lines besides the financial words
const LABEL_WORDS: &[&str] = &[
    "nome",
    "celular",
    "whatsapp",
    "fone",
    "complemento",
    "referência",
    "referencia",
    "cidade",
    "forma",
    "tipo",
    "pedido",
    "mesa",
    "entregador",
    "data",
    "hora",
];

/// Results shorter than this (non-whitespace) are noise
const MIN_INSTRUCTION_CHARS: usize = 4;

/// General instructions for the whole order, if any
pub fn general_instructions(raw: &str) -> Option<String> {
    let text = match find_label(raw, INSTRUCTION_MARKERS) {
        Some((at, len)) => marked_text(&raw[at + len..]),
        None => residual_text(raw),
    };

    let significant = text.chars().filter(|c| !c.is_whitespace()).count();
    if significant < MIN_INSTRUCTION_CHARS || is_service_type_label(&text) {
        return None;
    }
    Some(text)
}

/// Lines after an explicit marker, up to a blank or structured line
fn marked_text(rest: &str) -> String {
    let mut lines = rest.lines().map(str::trim);
    let first = lines.next().unwrap_or("");
    let mut parts: Vec<&str> = Vec::new();
    if !first.is_empty() {
        parts.push(first);
    }
    parts.extend(lines.take_while(|l| !l.is_empty() && !is_structured_line(l)));
    parts.join(" ")
}

/// Text outside brackets with structured lines removed
fn residual_text(raw: &str) -> String {
    strip_brackets(raw)
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '•', '*']).trim())
        .filter(|l| !l.is_empty() && !is_structured_line(l))
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_brackets(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn is_structured_line(line: &str) -> bool {
    if line.contains("R$") || line.contains("r$") {
        return true;
    }
    if split_quantity(line).is_some() || is_phone_line(line) || is_service_type_label(line) {
        return true;
    }
    // "Label: value" where the label is a known field
    if let Some((label, _)) = line.split_once(':') {
        return label.split_whitespace().any(|w| {
            let w = normalize_word(w);
            is_financial_word(&w) || LABEL_WORDS.contains(&w.as_str())
        });
    }
    false
}

fn is_phone_line(line: &str) -> bool {
    let digits = line.chars().filter(char::is_ascii_digit).count();
    digits >= 8
        && line
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_whitespace() || matches!(c, '(' | ')' | '+' | '-' | '.'))
}
