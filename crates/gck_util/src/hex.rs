//! Scanning of bare hexadecimal literals, the only kind of number the gecko language knows.

/// The length of the run of hex digits at the start of `bytes`, capped at `max`.
pub fn run_len(bytes: &[u8], max: usize) -> usize {
    bytes.iter().take(max).take_while(|b| b.is_ascii_hexdigit()).count()
}

/// Parse a literal of 1 to 8 hex digits, without a prefix.
pub fn parse(text: &str) -> Option<u32> {
    if text.is_empty() || text.len() > 8 || run_len(text.as_bytes(), 8) != text.len() {
        return None;
    }
    u32::from_str_radix(text, 16).ok()
}

#[test]
fn parse_literals() {
    assert_eq!(parse("deadBEEF"), Some(0xdead_beef));
    assert_eq!(parse("0"), Some(0));
    assert_eq!(parse(""), None);
    assert_eq!(parse("123456789"), None);
    assert_eq!(parse("0x12"), None);
    assert_eq!(parse("+1"), None);
}

#[test]
fn runs() {
    assert_eq!(run_len(b"80001500 0", 8), 8);
    assert_eq!(run_len(b"800015001", 8), 8);
    assert_eq!(run_len(b"ba|", 8), 2);
    assert_eq!(run_len(b"gr", 8), 0);
}
