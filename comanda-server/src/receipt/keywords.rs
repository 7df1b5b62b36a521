//! Keyword tables shared by the parser, the cleanup pass and the
//! instructions extractor. All comparisons are case-insensitive.

/// Observation labels, longest first
const OBS_LABELS: &[&str] = &["Observações:", "Observacoes:", "Observação:", "Observacao:", "Obs.:", "Obs:"];

/// Sauce labels, longest first
const SAUCE_LABELS: &[&str] = &["Molhos:", "Molho:"];

/// Item names containing one of these words are accompaniments
pub const ACCOMPANIMENT_KEYWORDS: &[&str] = &[
    "molho",
    "molhos",
    "acompanhamento",
    "acompanhamentos",
    "adicional",
    "adicionais",
    "extra",
    "extras",
    "complemento",
    "complementos",
];

/// Words of already-rendered receipt text (totals, payment, customer data)
pub const FINANCIAL_KEYWORDS: &[&str] = &[
    "subtotal",
    "total",
    "entrega",
    "delivery",
    "taxa",
    "frete",
    "desconto",
    "pagamento",
    "pix",
    "dinheiro",
    "cartão",
    "cartao",
    "crédito",
    "credito",
    "débito",
    "debito",
    "troco",
    "cliente",
    "endereço",
    "endereco",
    "telefone",
    "bairro",
    "rua",
    "cep",
    "retirada",
];

/// Bare service-type labels
pub const SERVICE_TYPE_LABELS: &[&str] = &[
    "entrega",
    "delivery",
    "retirada",
    "retirar no local",
    "retirada no local",
    "balcão",
    "balcao",
    "consumo no local",
    "comer no local",
    "mesa",
    "para viagem",
    "viagem",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Obs,
    Sauce,
}

/// Byte length of `needle` matched case-insensitively at the start of `hay`
fn match_ci(hay: &str, needle: &str) -> Option<usize> {
    let mut hay_chars = hay.char_indices();
    for n in needle.chars() {
        let (_, h) = hay_chars.next()?;
        if !h.to_lowercase().eq(n.to_lowercase()) {
            return None;
        }
    }
    Some(hay_chars.next().map_or(hay.len(), |(i, _)| i))
}

/// Marker label at the very start of `s`: kind, label as written, rest
pub fn leading_marker(s: &str) -> Option<(MarkerKind, &str, &str)> {
    let candidates = OBS_LABELS
        .iter()
        .map(|l| (MarkerKind::Obs, *l))
        .chain(SAUCE_LABELS.iter().map(|l| (MarkerKind::Sauce, *l)));
    for (kind, label) in candidates {
        if let Some(len) = match_ci(s, label) {
            return Some((kind, &s[..len], &s[len..]));
        }
    }
    None
}

/// Byte offset of the first marker label that starts a word
pub fn find_first_marker(s: &str) -> Option<usize> {
    find_at_word_start(s, |rest| leading_marker(rest).map(|_| ())).map(|(i, _)| i)
}

/// First of `labels` starting a word: byte offset and matched length
pub fn find_label(s: &str, labels: &[&str]) -> Option<(usize, usize)> {
    find_at_word_start(s, |rest| labels.iter().find_map(|l| match_ci(rest, l)))
}

fn find_at_word_start<T>(s: &str, probe: impl Fn(&str) -> Option<T>) -> Option<(usize, T)> {
    let mut prev: Option<char> = None;
    for (i, c) in s.char_indices() {
        if prev.is_none_or(|p| !p.is_alphanumeric())
            && let Some(hit) = probe(&s[i..])
        {
            return Some((i, hit));
        }
        prev = Some(c);
    }
    None
}

/// Lowercase, surrounding punctuation removed
pub fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

pub fn is_marker_word(word: &str) -> bool {
    matches!(
        normalize_word(word).as_str(),
        "obs" | "observação" | "observacao" | "observações" | "observacoes" | "molho" | "molhos"
    )
}

pub fn is_financial_word(word: &str) -> bool {
    let w = normalize_word(word);
    FINANCIAL_KEYWORDS.contains(&w.as_str())
}

/// Product name identifies an accompaniment (sauce, side, extra)
pub fn is_accompaniment(name: &str) -> bool {
    name.split_whitespace()
        .any(|w| ACCOMPANIMENT_KEYWORDS.contains(&normalize_word(w).as_str()))
}

/// Whole text is nothing but a service-type label
pub fn is_service_type_label(text: &str) -> bool {
    let normalized = text
        .split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    SERVICE_TYPE_LABELS.contains(&normalized.as_str())
}
