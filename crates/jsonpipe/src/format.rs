//! Whole-buffer helpers: validation, compaction and indentation.
//!
//! These run the same [`Scanner`] the streaming decoder uses, so they accept
//! and reject exactly the same inputs and report the same offsets.

use crate::{
    error::SyntaxError,
    scanner::{self, Op, Scanner},
};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Reports whether `src` holds exactly one valid JSON value, optionally
/// surrounded by whitespace.
///
/// ```
/// assert!(jsonpipe::valid(br#" {"a": [1, 2]} "#));
/// assert!(!jsonpipe::valid(b"{} {}"));
/// ```
#[must_use]
pub fn valid(src: &[u8]) -> bool {
    scanner::check_valid(src, &mut Scanner::default()).is_ok()
}

/// Appends `src` to `dst` with insignificant whitespace removed.
///
/// # Errors
///
/// A [`SyntaxError`] if `src` is not valid JSON; `dst` is left as it was.
pub fn compact(dst: &mut Vec<u8>, src: &[u8]) -> Result<(), SyntaxError> {
    compact_into(dst, src, false)
}

/// Compacts `src` into `dst`, escaping `<`, `>`, `&`, U+2028 and U+2029
/// inside strings when `escape_html` is set.
pub(crate) fn compact_into(
    dst: &mut Vec<u8>,
    src: &[u8],
    escape_html: bool,
) -> Result<(), SyntaxError> {
    let original = dst.len();
    let mut scan = Scanner::default();
    let mut start = 0;
    for (i, &c) in src.iter().enumerate() {
        if escape_html && matches!(c, b'<' | b'>' | b'&') {
            dst.extend_from_slice(&src[start..i]);
            dst.extend_from_slice(&[b'\\', b'u', b'0', b'0', HEX[usize::from(c >> 4)], HEX[usize::from(c & 0xf)]]);
            start = i + 1;
        }
        if escape_html
            && c == 0xe2
            && src.get(i + 1) == Some(&0x80)
            && src.get(i + 2).is_some_and(|&b| b & !1 == 0xa8)
        {
            dst.extend_from_slice(&src[start..i]);
            dst.extend_from_slice(b"\\u202");
            dst.push(HEX[usize::from(src[i + 2] & 0xf)]);
            start = i + 3;
        }
        let op = scan.step(c);
        if op >= Op::SkipSpace {
            if op == Op::Error {
                break;
            }
            if start < i {
                dst.extend_from_slice(&src[start..i]);
            }
            start = i + 1;
        }
    }
    if scan.eof() == Op::Error {
        dst.truncate(original);
        return Err(scan_error(&scan));
    }
    if start < src.len() {
        dst.extend_from_slice(&src[start..]);
    }
    Ok(())
}

/// Appends an indented form of `src` to `dst`.
///
/// Each element of an object or array starts on a new line beginning with
/// `prefix` followed by one copy of `indent` per nesting level. Leading
/// whitespace is dropped, trailing whitespace is kept, and empty containers
/// stay on one line.
///
/// ```
/// let mut out = Vec::new();
/// jsonpipe::indent(&mut out, br#"{"a":[1,2],"b":{}}"#, "", "  ").unwrap();
/// assert_eq!(
///     String::from_utf8(out).unwrap(),
///     "{\n  \"a\": [\n    1,\n    2\n  ],\n  \"b\": {}\n}"
/// );
/// ```
///
/// # Errors
///
/// A [`SyntaxError`] if `src` is not valid JSON; `dst` is left as it was.
pub fn indent(
    dst: &mut Vec<u8>,
    src: &[u8],
    prefix: &str,
    indent: &str,
) -> Result<(), SyntaxError> {
    let original = dst.len();
    let mut scan = Scanner::default();
    let mut need_indent = false;
    let mut depth = 0usize;
    let newline = |dst: &mut Vec<u8>, depth: usize| {
        dst.push(b'\n');
        dst.extend_from_slice(prefix.as_bytes());
        for _ in 0..depth {
            dst.extend_from_slice(indent.as_bytes());
        }
    };

    for &c in src {
        let op = scan.step(c);
        if op == Op::SkipSpace {
            continue;
        }
        if op == Op::Error {
            break;
        }
        if need_indent && op != Op::EndObject && op != Op::EndArray {
            need_indent = false;
            depth += 1;
            newline(dst, depth);
        }
        if op == Op::Continue {
            dst.push(c);
            continue;
        }
        match c {
            b'{' | b'[' => {
                // Delayed so that empty containers stay `{}` and `[]`.
                need_indent = true;
                dst.push(c);
            }
            b',' => {
                dst.push(c);
                newline(dst, depth);
            }
            b':' => dst.extend_from_slice(b": "),
            b'}' | b']' => {
                if need_indent {
                    need_indent = false;
                } else {
                    depth = depth.saturating_sub(1);
                    newline(dst, depth);
                }
                dst.push(c);
            }
            _ => dst.push(c),
        }
    }
    if scan.eof() == Op::Error {
        dst.truncate(original);
        return Err(scan_error(&scan));
    }
    Ok(())
}

fn scan_error(scan: &Scanner) -> SyntaxError {
    scan.error()
        .cloned()
        .unwrap_or_else(|| SyntaxError::unexpected_end(scan.bytes()))
}
