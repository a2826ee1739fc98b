//! Escaper - HTML/script-safe string and key literal encoding.
//!
//! Every emitted string literal must be safe to embed inside an HTML
//! `<script>` element and inside a quoted JS string.

/// Which literal grammar an escaped string is destined for: the two modes
/// diverge on which single-character escapes are legal (JSON has no `\'`
/// or `\0` escape; any character not in its fixed escape set must fall back
/// to `\uXXXX`).
#[derive(Clone, Copy, PartialEq, Eq)]
enum EscapeMode {
    Js,
    Json,
}

/// Escapes a string so it is safe inside a JS string literal embedded in an
/// HTML `<script>` element: it can never contain `</script`, `<!--`, or a
/// bare U+2028/U+2029 line terminator.
pub fn escape_string(s: &str) -> String {
    escape_with(s, EscapeMode::Js)
}

/// Like [`escape_string`] but for a double-quoted JSON string value: JSON's
/// escape grammar has no `\'` or `\0`, so those fall back to `\uXXXX` instead
/// of `escape_string`'s JS-only short forms. The same script-breaking
/// characters still need escaping since the JSON document may itself be
/// embedded in a `<script type="application/json">` block.
pub fn escape_json_string(s: &str) -> String {
    escape_with(s, EscapeMode::Json)
}

fn escape_with(s: &str, mode: EscapeMode) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        push_escaped_char(&mut out, ch, mode);
    }
    out
}

fn push_escaped_char(out: &mut String, ch: char, mode: EscapeMode) {
    match ch {
        '\\' => out.push_str("\\\\"),
        '\'' if mode == EscapeMode::Js => out.push_str("\\'"),
        '"' => out.push_str("\\\""),
        '<' => out.push_str("\\u003C"),
        '>' => out.push_str("\\u003E"),
        '/' => out.push_str("\\/"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\u{0008}' => out.push_str("\\b"),
        '\u{000C}' => out.push_str("\\f"),
        '\0' if mode == EscapeMode::Js => out.push_str("\\0"),
        '\u{2028}' => out.push_str("\\u2028"),
        '\u{2029}' => out.push_str("\\u2029"),
        c if (c as u32) < 0x20 || c as u32 == 0x7F => {
            out.push_str(&format!("\\u{:04X}", c as u32));
        }
        c => out.push(c),
    }
}

/// Quoted JS string literal (surrounding quotes included).
pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

/// Quoted JSON string literal (surrounding quotes included). Unlike
/// [`quote`], never emits `\'` or `\0` — both illegal in JSON's escape
/// grammar.
pub fn quote_json(s: &str) -> String {
    format!("\"{}\"", escape_json_string(s))
}

/// Renders a regex pattern's source text as the body of a `/pattern/flags`
/// JS literal: escapes a `/` that would otherwise terminate the literal
/// early, and script-breaking characters via `\uXXXX` (legal inside a
/// regex literal body, same as in a string). Characters already escaped in
/// the source (preceded by an unescaped `\`) pass through untouched, so an
/// already-`\/`-escaped slash never becomes doubly escaped.
pub fn escape_regex_source(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_escape = false;
    for ch in source.chars() {
        if in_escape {
            out.push(ch);
            in_escape = false;
            continue;
        }
        match ch {
            '\\' => {
                out.push(ch);
                in_escape = true;
            }
            '/' => out.push_str("\\/"),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "with", "yield", "let", "static", "await", "enum",
];

/// True if `s` matches the identifier grammar (leading letter/underscore/
/// dollar, usual continuation set) and is not a reserved keyword — the
/// condition under which an object key is emitted unquoted in code mode.
pub fn is_identifier(s: &str) -> bool {
    if s.is_empty() || RESERVED_WORDS.contains(&s) {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Renders an object key for code mode: unquoted if it's identifier-safe,
/// otherwise a quoted escaped string literal.
pub fn key_literal(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        quote(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_script_closing_sequence() {
        let escaped = escape_string("</script>");
        assert!(!escaped.contains("</script"));
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
    }

    #[test]
    fn escapes_html_comment_opener() {
        let escaped = escape_string("<!-- evil -->");
        assert!(!escaped.contains("<!--"));
    }

    #[test]
    fn escapes_line_and_paragraph_separators() {
        let escaped = escape_string("a\u{2028}b\u{2029}c");
        assert!(!escaped.contains('\u{2028}'));
        assert!(!escaped.contains('\u{2029}'));
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_string("\u{0001}"), "\\u0001");
        assert_eq!(escape_string("\u{007F}"), "\\u007F");
    }

    #[test]
    fn uses_short_escapes_where_available() {
        assert_eq!(escape_string("a\nb\tc"), "a\\nb\\tc");
    }

    #[test]
    fn identifier_predicate() {
        assert!(is_identifier("message"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("$scope"));
        assert!(!is_identifier("not-an-ident"));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn key_literal_quotes_non_identifiers_only() {
        assert_eq!(key_literal("a"), "a");
        assert_eq!(key_literal("a-b"), "\"a-b\"");
    }

    #[test]
    fn json_mode_never_emits_the_js_only_null_short_escape() {
        // `\0` is not a legal escape in JSON's grammar; a NUL byte must
        // fall back to a `\u00XX` escape there, unlike in JS text.
        assert_eq!(escape_json_string("\0"), "\\u0000");
        assert_eq!(escape_string("\0"), "\\0");
    }

    #[test]
    fn json_mode_never_emits_the_js_only_quote_escape() {
        // `\'` is not a legal escape in JSON either; a literal apostrophe
        // needs no escaping at all inside a double-quoted string.
        assert_eq!(escape_json_string("it's"), "it's");
        assert_eq!(escape_string("it's"), "it\\'s");
    }
}
