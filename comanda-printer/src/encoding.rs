//! Windows-1252 encoding utilities for Portuguese thermal printers
//!
//! Receipt printers sold in Brazil ship with the WPC1252 code page, which
//! covers every accented letter used in Portuguese (ç, ã, õ, é, ...).
//! This module provides utilities for:
//! - Calculating printed string widths
//! - Truncating/padding strings to a column width
//! - Converting UTF-8 to Windows-1252 while preserving ESC/POS commands

use tracing::instrument;

/// ESC t 16 - select character code table WPC1252
const SELECT_CP1252: [u8; 3] = [0x1B, 0x74, 16];

/// Get the printed width of a string
///
/// Every character representable in Windows-1252 occupies one column,
/// unmappable characters are printed as a single `?`.
pub fn text_width(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string to fit within a column width
pub fn truncate_text(s: &str, max_width: usize) -> String {
    s.chars().take(max_width).collect()
}

/// Pad a string to a specific column width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}

/// Convert mixed UTF-8 content (with ESC/POS commands) to Windows-1252
///
/// ASCII bytes (0x00-0x7F) are kept exactly as is, which protects ESC/POS
/// commands from being corrupted. Only bytes >= 0x80 are treated as UTF-8
/// sequences and transcoded.
///
/// The code page is selected at the start and re-selected after every
/// INIT command (ESC @), which resets the printer to its factory table.
#[instrument(skip(bytes))]
pub fn convert_to_cp1252(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() + SELECT_CP1252.len());
    result.extend_from_slice(&SELECT_CP1252);

    let mut buffer = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == 0x40 {
            flush_buffer(&mut buffer, &mut result);
            result.extend_from_slice(&[0x1B, 0x40]);
            result.extend_from_slice(&SELECT_CP1252);
            i += 2;
            continue;
        }

        if b < 128 {
            flush_buffer(&mut buffer, &mut result);
            result.push(b);
        } else {
            buffer.push(b);
        }
        i += 1;
    }

    flush_buffer(&mut buffer, &mut result);
    result
}

/// Flush the non-ASCII buffer, converting UTF-8 to Windows-1252
fn flush_buffer(buffer: &mut Vec<u8>, result: &mut Vec<u8>) {
    if buffer.is_empty() {
        return;
    }

    let s = String::from_utf8_lossy(buffer);
    let mut char_buf = [0u8; 4];
    for c in s.chars() {
        let (encoded, _, had_errors) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut char_buf));
        if had_errors {
            result.push(b'?');
        } else {
            result.extend_from_slice(&encoded);
        }
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("hello"), 5);
        assert_eq!(text_width("ação"), 4);
        assert_eq!(text_width("R$ 10,00"), 8);
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello world", 5), "hello");
        assert_eq!(truncate_text("Feijão tropeiro", 6), "Feijão");
    }

    #[test]
    fn test_pad_text() {
        assert_eq!(pad_text("hi", 5, false), "hi   ");
        assert_eq!(pad_text("hi", 5, true), "   hi");
        assert_eq!(pad_text("hello world", 5, false), "hello");
        assert_eq!(pad_text("pão", 5, false), "pão  ");
    }

    #[test]
    fn test_convert_selects_code_page_and_keeps_ascii() {
        let out = convert_to_cp1252(b"abc\n");
        assert_eq!(&out[..3], &SELECT_CP1252);
        assert_eq!(&out[3..], b"abc\n");
    }

    #[test]
    fn test_convert_accented_letters() {
        let out = convert_to_cp1252("ção".as_bytes());
        // ç = 0xE7, ã = 0xE3 in Windows-1252
        assert_eq!(&out[3..], &[0xE7, 0xE3, b'o']);
    }

    #[test]
    fn test_convert_unmappable_becomes_question_mark() {
        let out = convert_to_cp1252("a中b".as_bytes());
        assert_eq!(&out[3..], b"a?b");
    }

    #[test]
    fn test_convert_reselects_code_page_after_init() {
        let out = convert_to_cp1252(&[b'a', 0x1B, 0x40, b'b']);
        assert_eq!(
            out,
            vec![0x1B, 0x74, 16, b'a', 0x1B, 0x40, 0x1B, 0x74, 16, b'b']
        );
    }
}
