//! Raw-text fallback detection for sources the parser rejects.
//!
//! Matches the common obfuscator output shape directly on the text: the
//! first string-array declaration, a `function NAME(p){...}` or
//! `NAME = function(p){...}` decoder returning `TABLE[p - OFFSET]`, and
//! `NAME(N)` calls. Only the first table/decoder pair is reported.

use regex_lite::Regex;

use super::model::{Binding, CallSite, Decoder, Detection, Reference, StringTable};

const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";
const NUMBER: &str = r"0[xX][0-9a-fA-F]+|[0-9]+";

/// Detect the first table/decoder pair in `source`.
pub(crate) fn detect(source: &str) -> Detection {
    let Some(table) = find_table(source) else {
        return Detection::default();
    };
    let Some(decoder) = find_decoder(source, &table) else {
        return Detection {
            tables: vec![table],
            ..Detection::default()
        };
    };

    let calls = find_calls(source, &decoder.binding.name);
    let mut references = find_references(source, &table.binding.name);
    references.extend(find_references(source, &decoder.binding.name));
    references.sort_by_key(|r| r.range.start);

    Detection {
        tables: vec![table],
        decoders: vec![decoder],
        calls,
        references,
    }
}

fn find_table(source: &str) -> Option<StringTable> {
    let string = r#"'(?:[^'\\\n]|\\.)*'|"(?:[^"\\\n]|\\.)*""#;
    let decl = Regex::new(&format!(
        r"\b(?:var|let|const)\s+({IDENT})\s*=\s*\[((?:\s*(?:{string})\s*,?)+)\]\s*;?"
    ))
    .ok()?;
    let item = Regex::new(string).ok()?;

    let caps = decl.captures(source)?;
    let whole = caps.get(0)?;
    let values = item
        .find_iter(caps.get(2)?.as_str())
        .map(|m| {
            let quoted = m.as_str();
            unescape(&quoted[1..quoted.len() - 1])
        })
        .collect();

    Some(StringTable {
        binding: Binding::unscoped(caps.get(1)?.as_str()),
        values,
        decl: whole.range(),
    })
}

fn find_decoder(source: &str, table: &StringTable) -> Option<Decoder> {
    let fn_decl = Regex::new(&format!(r"\bfunction\s+({IDENT})\s*\(([^)]*)\)\s*\{{")).ok()?;
    let fn_assign = Regex::new(&format!(
        r"(?:\b(?:var|let|const)\s+)?({IDENT})\s*=\s*function(?:\s+{IDENT})?\s*\(([^)]*)\)\s*\{{"
    ))
    .ok()?;
    let ret = Regex::new(&format!(
        r"\breturn\s+{}\s*\[\s*({IDENT})\s*-\s*({NUMBER})\s*\]",
        regex_lite::escape(&table.binding.name)
    ))
    .ok()?;

    // (start, open brace, name, params), earliest start per open brace
    let mut heads: Vec<(usize, usize, &str, &str)> = Vec::new();
    for (form, re) in [&fn_decl, &fn_assign].into_iter().enumerate() {
        for caps in re.captures_iter(source) {
            let (Some(whole), Some(name), Some(params)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if form == 1 && preceded_by_dot(source, whole.start()) {
                continue;
            }
            let open = whole.end() - 1;
            match heads.iter_mut().find(|h| h.1 == open) {
                Some(head) if head.0 <= whole.start() => {}
                Some(head) => *head = (whole.start(), open, name.as_str(), params.as_str()),
                None => heads.push((whole.start(), open, name.as_str(), params.as_str())),
            }
        }
    }
    heads.sort_by_key(|h| h.0);

    heads.into_iter().find_map(|(start, open, name, params)| {
        let end = find_block_end(source, open)?;
        let caps = ret.captures(&source[open..end])?;
        let param = caps.get(1)?.as_str();
        if !param_list(params).any(|p| p == param) {
            return None;
        }
        Some(Decoder {
            binding: Binding::unscoped(name),
            table: table.binding.clone(),
            offset: parse_int(caps.get(2)?.as_str())?,
            decl: start..end,
        })
    })
}

fn find_calls(source: &str, decoder: &str) -> Vec<CallSite> {
    let Ok(call) = Regex::new(&format!(
        r"{}\s*\(\s*({NUMBER})\s*\)",
        regex_lite::escape(decoder)
    )) else {
        return Vec::new();
    };
    call.captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if !at_name_start(source, whole.start()) {
                return None;
            }
            Some(CallSite {
                callee: Binding::unscoped(decoder),
                arg: parse_int(caps.get(1)?.as_str())?,
                range: whole.range(),
            })
        })
        .collect()
}

fn find_references(source: &str, name: &str) -> Vec<Reference> {
    source
        .match_indices(name)
        .filter(|(at, _)| {
            let end = at + name.len();
            at_name_start(source, *at) && !source[end..].starts_with(is_ident_char)
        })
        .map(|(at, _)| Reference {
            binding: Binding::unscoped(name),
            range: at..at + name.len(),
        })
        .collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn at_name_start(source: &str, at: usize) -> bool {
    !source[..at].ends_with(is_ident_char) && !preceded_by_dot(source, at)
}

fn preceded_by_dot(source: &str, at: usize) -> bool {
    source[..at].trim_end().ends_with('.')
}

/// Parameter names, ignoring defaults and rest markers.
fn param_list(params: &str) -> impl Iterator<Item = &str> {
    params.split(',').filter_map(|p| {
        let p = p.split('=').next()?.trim().trim_start_matches("...");
        (!p.is_empty()).then_some(p)
    })
}

/// Decimal or `0x` hexadecimal literal.
fn parse_int(text: &str) -> Option<i64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Index just past the `}` matching the `{` at `open`.
///
/// Skips braces inside string literals, template literals and comments.
fn find_block_end(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, quote)?,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |n| i + n);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = find_from(bytes, i + 2, b"*/")? + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the closing quote of the literal opened at `start`.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b if b == quote => return Some(i),
            b'\n' if quote != b'`' => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

fn find_from(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|n| from + n)
}

/// Decode the escapes of a JavaScript string literal body.
///
/// Unknown escapes keep the escaped character; malformed ones are kept
/// verbatim.
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(e) = chars.next() else {
            out.push('\\');
            break;
        };
        match e {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_unit(&mut out, &mut chars, &hex, "\\x");
            }
            'u' if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u{");
                        out.push_str(&hex);
                        out.push('}');
                    }
                }
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                push_code_unit(&mut out, &mut chars, &hex, "\\u");
            }
            other => out.push(other),
        }
    }
    out
}

fn push_code_unit(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    hex: &str,
    prefix: &str,
) {
    let Ok(unit) = u32::from_str_radix(hex, 16) else {
        out.push_str(prefix);
        out.push_str(hex);
        return;
    };
    if (0xD800..0xDC00).contains(&unit) {
        // high surrogate: pair with a following \uDC00-\uDFFF
        let mut ahead = chars.clone();
        if ahead.next() == Some('\\') && ahead.next() == Some('u') {
            let low: String = ahead.by_ref().take(4).collect();
            if let Ok(low) = u32::from_str_radix(&low, 16) {
                if (0xDC00..0xE000).contains(&low) {
                    let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                    if let Some(ch) = char::from_u32(combined) {
                        out.push(ch);
                        *chars = ahead;
                        return;
                    }
                }
            }
        }
    }
    out.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
}
