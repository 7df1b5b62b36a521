//! Item notes cleanup
//!
//! Runs on every item's notes regardless of the strategy that produced
//! them. The pass is idempotent: `cleanup(cleanup(x)) == cleanup(x)`.
//!
//! - notes are `" | "`-separated segments; blank and duplicate segments go
//! - repeated leading labels collapse to one (`Obs: Obs: x` → `Obs: x`)
//! - accompaniments drop the sauce label under an `Obs:` prefix
//! - segments that are only a label are dropped
//! - notes made mostly of financial / logistics words are discarded

use super::keywords::{MarkerKind, is_financial_word, is_marker_word, leading_marker, normalize_word};

/// Separator between notes segments
pub const SEGMENT_SEPARATOR: &str = " | ";

/// Clean item notes; `None` when nothing worth printing is left
pub fn cleanup_notes(notes: &str, accompaniment: bool) -> Option<String> {
    let mut segments: Vec<String> = Vec::new();
    for raw in notes.split('|') {
        let Some(segment) = normalize_segment(raw, accompaniment) else {
            continue;
        };
        if !segments.iter().any(|s| s.to_lowercase() == segment.to_lowercase()) {
            segments.push(segment);
        }
    }

    if segments.is_empty() {
        return None;
    }
    let joined = segments.join(SEGMENT_SEPARATOR);
    (!is_mostly_financial(&joined)).then_some(joined)
}

/// Join segments and clean the result
pub fn join_and_cleanup<I, S>(segments: I, accompaniment: bool) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = segments
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR);
    cleanup_notes(&joined, accompaniment)
}

fn normalize_segment(segment: &str, accompaniment: bool) -> Option<String> {
    let mut rest = segment.trim();
    let mut obs_label: Option<&str> = None;
    let mut sauce_label: Option<&str> = None;

    while let Some((kind, label, after)) = leading_marker(rest) {
        match kind {
            MarkerKind::Obs => {
                obs_label.get_or_insert(label);
            }
            MarkerKind::Sauce => {
                sauce_label.get_or_insert(label);
            }
        }
        rest = after.trim_start();
    }

    let body = rest.trim();
    if body.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(segment.len());
    if let Some(label) = obs_label {
        out.push_str(label);
        out.push(' ');
    }
    if let Some(label) = sauce_label
        && !(accompaniment && obs_label.is_some())
    {
        out.push_str(label);
        out.push(' ');
    }
    out.push_str(body);
    Some(out)
}

/// More than half of the significant words are financial / logistics words
fn is_mostly_financial(text: &str) -> bool {
    let mut significant = 0usize;
    let mut financial = 0usize;
    for word in text.split_whitespace() {
        let normalized = normalize_word(word);
        if normalized.chars().filter(|c| c.is_alphabetic()).count() < 3 || is_marker_word(&normalized) {
            continue;
        }
        significant += 1;
        if is_financial_word(&normalized) {
            financial += 1;
        }
    }
    significant > 0 && financial * 2 > significant
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_notes_survive() {
        assert_eq!(
            cleanup_notes("Obs: sem cebola", false).as_deref(),
            Some("Obs: sem cebola")
        );
    }

    #[test]
    fn test_collapses_repeated_obs() {
        assert_eq!(
            cleanup_notes("Obs: Obs: OBS: bem passado", false).as_deref(),
            Some("Obs: bem passado")
        );
    }

    #[test]
    fn test_marker_only_notes_are_dropped() {
        assert_eq!(cleanup_notes("Obs:", false), None);
        assert_eq!(cleanup_notes("Obs: Molhos:  ", false), None);
        assert_eq!(cleanup_notes(" | Obs: | ", false), None);
    }

    #[test]
    fn test_accompaniment_drops_sauce_label_under_obs() {
        assert_eq!(
            cleanup_notes("Obs: Molhos: barbecue", true).as_deref(),
            Some("Obs: barbecue")
        );
        assert_eq!(
            cleanup_notes("Obs: Molhos: barbecue", false).as_deref(),
            Some("Obs: Molhos: barbecue")
        );
        assert_eq!(
            cleanup_notes("Molhos: barbecue", true).as_deref(),
            Some("Molhos: barbecue")
        );
    }

    #[test]
    fn test_financial_text_is_discarded() {
        assert_eq!(
            cleanup_notes("Subtotal: R$ 40,00 | Taxa de entrega: R$ 5,00 | Total: R$ 45,00", false),
            None
        );
        assert_eq!(cleanup_notes("Pagamento: Pix | Cliente: Ana", false), None);
        assert_eq!(
            cleanup_notes("Obs: entregar sem taxa", false).as_deref(),
            Some("Obs: entregar sem taxa")
        );
    }

    #[test]
    fn test_duplicate_segments_removed() {
        assert_eq!(
            cleanup_notes("Obs: sem gelo | obs: SEM GELO | Trio: Batata", false).as_deref(),
            Some("Obs: sem gelo | Trio: Batata")
        );
    }

    #[test]
    fn test_join_and_cleanup() {
        assert_eq!(
            join_and_cleanup(["Obs: sem sal", "", "Trio: Batata"], false).as_deref(),
            Some("Obs: sem sal | Trio: Batata")
        );
        assert_eq!(join_and_cleanup(Vec::<String>::new(), false), None);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let inputs = [
            "Obs: sem cebola",
            "Obs:Obs:   sem cebola  |  | Obs: sem cebola",
            "Molhos: Obs: Molho: alho | Trio: Fritas",
            "Observação: Obs: ponto da carne",
            "Obs: Molhos:",
            "Total: R$ 10,00 | Obs: sem sal",
            "Total R$ 10,00 | Entrega | Pix",
            "1x Bacon - R$ 3,00 | Obs: Molhos: cheddar",
            "   ",
            "|||",
            "sem cebola | SEM CEBOLA | Obs: sem cebola",
        ];
        for accompaniment in [false, true] {
            for input in inputs {
                let once = cleanup_notes(input, accompaniment);
                let twice = once.as_deref().and_then(|s| cleanup_notes(s, accompaniment));
                assert_eq!(once, twice, "input={input:?} accompaniment={accompaniment}");
            }
        }
    }
}
