//! Conversion of a quoted JSON string literal into Rust text.
//!
//! Malformed UTF-8 and unpaired surrogate escapes are replaced with U+FFFD
//! rather than rejected, one replacement per offending byte or escape.

use bstr::decode_utf8;

const REPLACEMENT: char = '\u{fffd}';

/// Unquotes `item`, which includes its surrounding quotes.
///
/// Returns `None` when the literal is not a well-formed JSON string.
pub(crate) fn unquote(item: &[u8]) -> Option<String> {
    let body = item.strip_prefix(b"\"")?.strip_suffix(b"\"")?;

    let plain = body
        .iter()
        .all(|&c| c != b'\\' && c != b'"' && c >= b' ');
    if plain {
        if let Ok(text) = std::str::from_utf8(body) {
            return Some(text.to_owned());
        }
    }

    let mut out = String::with_capacity(body.len() + 8);
    let mut rest = body;
    while let Some(&c) = rest.first() {
        match c {
            b'\\' => {
                let esc = *rest.get(1)?;
                rest = &rest[2..];
                match esc {
                    b'"' | b'\\' | b'/' | b'\'' => out.push(char::from(esc)),
                    b'b' => out.push('\u{8}'),
                    b'f' => out.push('\u{c}'),
                    b'n' => out.push('\n'),
                    b'r' => out.push('\r'),
                    b't' => out.push('\t'),
                    b'u' => {
                        let unit = hex4(rest)?;
                        rest = &rest[4..];
                        out.push(surrogate_pair(unit, &mut rest));
                    }
                    _ => return None,
                }
            }
            b'"' => return None,
            c if c < b' ' => return None,
            c if c.is_ascii() => {
                out.push(char::from(c));
                rest = &rest[1..];
            }
            _ => {
                let (ch, size) = decode_utf8(rest);
                match ch {
                    Some(ch) => {
                        out.push(ch);
                        rest = &rest[size..];
                    }
                    None => {
                        out.push(REPLACEMENT);
                        rest = &rest[1..];
                    }
                }
            }
        }
    }
    Some(out)
}

/// Completes a `\u` escape, consuming a following low surrogate escape when
/// `unit` is a high surrogate.
fn surrogate_pair(unit: u16, rest: &mut &[u8]) -> char {
    if let Some(ch) = char::from_u32(u32::from(unit)) {
        return ch;
    }
    if !(0xd800..0xdc00).contains(&unit) {
        return REPLACEMENT;
    }
    let low = rest
        .strip_prefix(b"\\u")
        .and_then(hex4)
        .filter(|low| (0xdc00..0xe000).contains(low));
    let Some(low) = low else {
        return REPLACEMENT;
    };
    *rest = &rest[6..];
    let code = 0x10000 + ((u32::from(unit) - 0xd800) << 10) + (u32::from(low) - 0xdc00);
    char::from_u32(code).unwrap_or(REPLACEMENT)
}

fn hex4(digits: &[u8]) -> Option<u16> {
    let digits = digits.get(..4)?;
    digits.iter().try_fold(0u16, |acc, &d| {
        let v = match d {
            b'0'..=b'9' => d - b'0',
            b'a'..=b'f' => d - b'a' + 10,
            b'A'..=b'F' => d - b'A' + 10,
            _ => return None,
        };
        Some(acc << 4 | u16::from(v))
    })
}
