//! Whitespace escaping for format properties.
//!
//! Separators such as `\t` or `\n` do not survive the UI transport, so they
//! travel as two-character sequences: `\n`, `\t`, `\r`, `\s` (space). The
//! backslash itself is doubled, which makes `unescape(escape(x)) == x` hold
//! for every string.

use ingestor_protocol::FormatGuess;

pub fn escape_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            ' ' => out.push_str("\\s"),
            other => out.push(other),
        }
    }
    out
}

/// Inverse of [`escape_whitespace`]. Unknown escapes are kept verbatim.
pub fn unescape_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('s') => out.push(' '),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Escape the separator properties of a guess before it leaves the core.
pub fn escape_format(guess: &FormatGuess) -> FormatGuess {
    FormatGuess {
        field_separator: escape_whitespace(&guess.field_separator),
        record_separator: escape_whitespace(&guess.record_separator),
        quote_char: escape_whitespace(&guess.quote_char),
        ..guess.clone()
    }
}

/// Undo [`escape_format`] on a guess coming back from the UI.
pub fn unescape_format(guess: &FormatGuess) -> FormatGuess {
    FormatGuess {
        field_separator: unescape_whitespace(&guess.field_separator),
        record_separator: unescape_whitespace(&guess.record_separator),
        quote_char: unescape_whitespace(&guess.quote_char),
        ..guess.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_escape_known_characters() {
        assert_eq!(escape_whitespace("\t"), "\\t");
        assert_eq!(escape_whitespace("\r\n"), "\\r\\n");
        assert_eq!(escape_whitespace("a b"), "a\\sb");
        assert_eq!(escape_whitespace("\\n"), "\\\\n");
    }

    #[test]
    fn test_unescape_keeps_unknown_sequences() {
        assert_eq!(unescape_whitespace("\\x"), "\\x");
        assert_eq!(unescape_whitespace("tail\\"), "tail\\");
        assert_eq!(unescape_whitespace("\\u0001"), "\\u0001");
    }

    #[test]
    fn test_format_round_trip() {
        let guess = FormatGuess::csv("\t", "\"", true).with_record_separator("\r\n");
        let escaped = escape_format(&guess);
        assert_eq!(escaped.field_separator, "\\t");
        assert_eq!(escaped.record_separator, "\\r\\n");
        assert_eq!(unescape_format(&escaped), guess);
    }

    proptest! {
        #[test]
        fn whitespace_round_trips(s in "[ \t\r\na-z\\\\,|;]{0,32}") {
            prop_assert_eq!(unescape_whitespace(&escape_whitespace(&s)), s);
        }

        #[test]
        fn any_string_round_trips(s in any::<String>()) {
            prop_assert_eq!(unescape_whitespace(&escape_whitespace(&s)), s);
        }

        #[test]
        fn escaped_text_has_no_raw_whitespace(s in "[ \t\r\n]{1,16}") {
            let escaped = escape_whitespace(&s);
            prop_assert!(!escaped.contains([' ', '\t', '\r', '\n']));
        }
    }
}
