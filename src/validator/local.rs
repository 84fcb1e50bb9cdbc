fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

fn has_bad_dots(s: &str) -> bool {
    s.starts_with('.') || s.ends_with('.') || s.contains("..")
}

pub(crate) fn is_quoted(s: &str) -> bool {
    s.len() >= 2 && s.starts_with('"') && s.ends_with('"')
}

/// Règles strictes: atext ASCII + '.' non initial/terminal, pas de ".."
pub(crate) fn is_local_strict(s: &str) -> bool {
    if has_bad_dots(s) {
        return false;
    }
    s.chars().all(|c| is_atext(c) || c == '.')
}

/// Règles relaxed: quoted-string sans caractère de contrôle, ou atext étendu
/// aux lettres/chiffres non ASCII (RFC 6531).
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    if is_quoted(s) {
        return !s.chars().any(char::is_control);
    }
    if has_bad_dots(s) {
        return false;
    }
    s.chars()
        .all(|c| is_atext(c) || c == '.' || (!c.is_ascii() && c.is_alphanumeric()))
}
