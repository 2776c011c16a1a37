//! Escaping helpers for emitting selector text

/// Escape a string for use as a CSS identifier (class or id).
pub fn css_escape_identifier(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let chars: Vec<char> = value.chars().collect();
    for (index, ch) in chars.iter().copied().enumerate() {
        let leading_digit = ch.is_ascii_digit()
            && (index == 0 || (index == 1 && chars[0] == '-'));
        if ch == '\0' {
            out.push('\u{FFFD}');
        } else if leading_digit || ch.is_control() {
            out.push_str(&format!("\\{:x} ", ch as u32));
        } else if index == 0 && ch == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii() {
            out.push(ch);
        } else {
            out.push('\\');
            out.push(ch);
        }
    }
    out
}

/// Escape backslashes and double quotes for a `"..."` literal.
pub fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Reverse of [`escape_double_quoted`]: drop the backslash before any character.
pub fn unescape_backslashes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_escape_identifier() {
        assert_eq!(css_escape_identifier("btn-primary"), "btn-primary");
        assert_eq!(css_escape_identifier("w-1/2"), "w-1\\/2");
        assert_eq!(css_escape_identifier("1col"), "\\31 col");
        assert_eq!(css_escape_identifier("a:b"), "a\\:b");
    }

    #[test]
    fn test_quote_escaping_round_trip() {
        let raw = r#"say "hi" \ bye"#;
        let escaped = escape_double_quoted(raw);
        assert_eq!(escaped, r#"say \"hi\" \\ bye"#);
        assert_eq!(unescape_backslashes(&escaped), raw);
    }
}
