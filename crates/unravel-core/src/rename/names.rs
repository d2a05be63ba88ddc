//! Name shape predicates shared by the collector and the detector.

/// ECMAScript reserved words, plus the literals that cannot be rebound.
const RESERVED_WORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// `[A-Za-z_$][A-Za-z0-9_$-]{2,50}`: a string literal that reads like a name.
#[must_use]
pub fn is_candidate_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    (3..=51).contains(&bytes.len())
        && is_ident_start(bytes[0])
        && bytes[1..].iter().all(|&b| is_ident_part(b) || b == b'-')
}

/// Minified or generated identifier name.
///
/// Either 1-4 ASCII alphanumerics, or `[yn][0-9][a-z]e?`. Deliberately loose:
/// a legitimately short variable is flagged too, and obfuscators that emit
/// long random names are missed.
#[must_use]
pub fn is_obfuscated_name(name: &str) -> bool {
    is_short_name(name) || is_generated_name(name)
}

fn is_short_name(name: &str) -> bool {
    (1..=4).contains(&name.len()) && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

fn is_generated_name(name: &str) -> bool {
    match name.as_bytes() {
        [first, digit, lower, rest @ ..] => {
            matches!(first, b'y' | b'n')
                && digit.is_ascii_digit()
                && lower.is_ascii_lowercase()
                && matches!(rest, [] | [b'e'])
        }
        _ => false,
    }
}

/// ASCII identifier that is not a reserved word.
#[must_use]
pub fn is_valid_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && is_ident_start(bytes[0])
        && bytes[1..].iter().all(|&b| is_ident_part(b))
        && !RESERVED_WORDS.contains(&name)
}
