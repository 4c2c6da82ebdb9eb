/// Number of characters kept for a PDF preview.
pub const PREVIEW_CHARS: usize = 300;

/// Raw-bytes preview of a PDF: the bytes read as lossy UTF-8, cut to the
/// first [`PREVIEW_CHARS`] characters. The result may be garbled; no PDF
/// structure is parsed.
pub fn pdf_preview(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .take(PREVIEW_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_to_limit() {
        let bytes = "a".repeat(1000);
        assert_eq!(pdf_preview(bytes.as_bytes()).chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn test_short_input_is_kept_whole() {
        assert_eq!(pdf_preview(b"%PDF-1.4\n"), "%PDF-1.4\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let preview = pdf_preview(&[b'%', b'P', 0xff, 0xfe, b'D']);
        assert!(preview.starts_with("%P"));
        assert!(preview.contains('\u{FFFD}'));
    }
}
