//! Byte-level JSON syntax checking.
//!
//! The [`Scanner`] is a push-driven state machine: every input byte is handed
//! to [`Scanner::step`], which classifies it (see [`Op`]) and updates the
//! parse state. It never looks ahead and never buffers bytes, so it can sit
//! underneath a stream that is still being filled.
//!
//! # State
//!
//! - `state` is the current lexical state (inside a string, after a decimal
//!   point, expecting an object key, ...).
//! - `stack` records, for every open container, what the container expects
//!   next: an object key, an object value, or an array element. Its length
//!   is the nesting depth, which is capped at `max_depth`.
//! - Once an error has been recorded the scanner is stuck: every further
//!   byte is answered with [`Op::Error`] and the original error is kept.
//!
//! # Offsets
//!
//! The scanner counts the bytes it has been given. A syntax error reports
//! the count including the offending byte; an error found at end of input
//! reports the total number of bytes seen.
//!
//! # Multiple values
//!
//! A scanner built with [`Scanner::multi`] accepts a sequence of
//! whitespace-separated top-level values, which is what the streaming
//! [`Decoder`](crate::Decoder) needs. A single-value scanner rejects anything
//! but whitespace after the first value.

mod literal;

use self::literal::{Literal, Matched};
use crate::{error::SyntaxError, options::DEFAULT_MAX_DEPTH};

/// Classification of one scanned byte.
///
/// The variants are ordered: everything from [`Op::SkipSpace`] on carries no
/// value content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Op {
    /// Inside a literal or string, or another byte of an ongoing token.
    Continue,
    /// First byte of a string, number, `true`, `false` or `null`.
    BeginLiteral,
    /// `{`
    BeginObject,
    /// `:` after an object key.
    ObjectKey,
    /// `,` after an object value.
    ObjectValue,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `,` after an array element.
    ArrayValue,
    /// `]`
    EndArray,
    /// Insignificant whitespace.
    SkipSpace,
    /// A byte after the top-level value finished.
    End,
    /// The byte is invalid; see [`Scanner::error`].
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parse {
    ObjectKey,
    ObjectValue,
    ArrayValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeginValueOrEmpty,
    BeginValue,
    BeginStringOrEmpty,
    BeginString,
    EndValue,
    EndTop,
    InString,
    InStringEsc,
    InStringEscU(u8),
    Neg,
    Digits,
    Zero,
    Dot,
    DotDigits,
    Exp,
    ExpSign,
    ExpDigits,
    Literal(Literal),
    Error,
}

pub(crate) fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n')
}

#[derive(Debug, Clone)]
pub(crate) struct Scanner {
    state: State,
    stack: Vec<Parse>,
    end_top: bool,
    err: Option<SyntaxError>,
    bytes: usize,
    max_depth: usize,
    multi: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Scanner {
    /// A scanner that accepts exactly one top-level value.
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            state: State::BeginValue,
            stack: Vec::new(),
            end_top: false,
            err: None,
            bytes: 0,
            max_depth,
            multi: false,
        }
    }

    /// A scanner that accepts a stream of top-level values.
    pub(crate) fn multi(max_depth: usize) -> Self {
        Self {
            multi: true,
            ..Self::new(max_depth)
        }
    }

    /// The recorded error, if any.
    pub(crate) fn error(&self) -> Option<&SyntaxError> {
        self.err.as_ref()
    }

    /// Number of bytes stepped so far.
    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }

    /// Feeds one byte.
    pub(crate) fn step(&mut self, c: u8) -> Op {
        self.bytes += 1;
        self.advance(c)
    }

    /// Signals end of input, reporting any unterminated value.
    pub(crate) fn eof(&mut self) -> Op {
        if self.err.is_some() {
            return Op::Error;
        }
        if self.end_top {
            return Op::End;
        }
        if self.multi && self.state == State::BeginValue && self.stack.is_empty() {
            return Op::End;
        }
        self.advance(b' ');
        if self.end_top {
            return Op::End;
        }
        if self.err.is_none() {
            self.err = Some(SyntaxError::unexpected_end(self.bytes));
        }
        Op::Error
    }

    fn advance(&mut self, c: u8) -> Op {
        match self.state {
            State::BeginValueOrEmpty => {
                if is_space(c) {
                    Op::SkipSpace
                } else if c == b']' {
                    self.end_value(c)
                } else {
                    self.begin_value(c)
                }
            }
            State::BeginValue => self.begin_value(c),
            State::BeginStringOrEmpty => {
                if is_space(c) {
                    return Op::SkipSpace;
                }
                if c == b'}' {
                    if let Some(top) = self.stack.last_mut() {
                        *top = Parse::ObjectValue;
                    }
                    return self.end_value(c);
                }
                self.begin_string(c)
            }
            State::BeginString => self.begin_string(c),
            State::EndValue => self.end_value(c),
            State::EndTop => self.end_top(c),
            State::InString => match c {
                b'"' => {
                    self.state = State::EndValue;
                    Op::Continue
                }
                b'\\' => {
                    self.state = State::InStringEsc;
                    Op::Continue
                }
                0..0x20 => self.fail(c, "in string literal"),
                _ => Op::Continue,
            },
            State::InStringEsc => match c {
                b'b' | b'f' | b'n' | b'r' | b't' | b'\\' | b'/' | b'"' => {
                    self.state = State::InString;
                    Op::Continue
                }
                b'u' => {
                    self.state = State::InStringEscU(0);
                    Op::Continue
                }
                _ => self.fail(c, "in string escape code"),
            },
            State::InStringEscU(seen) => {
                if !c.is_ascii_hexdigit() {
                    return self.fail(c, "in \\u hexadecimal character escape");
                }
                self.state = if seen == 3 {
                    State::InString
                } else {
                    State::InStringEscU(seen + 1)
                };
                Op::Continue
            }
            State::Neg => match c {
                b'0' => {
                    self.state = State::Zero;
                    Op::Continue
                }
                b'1'..=b'9' => {
                    self.state = State::Digits;
                    Op::Continue
                }
                _ => self.fail(c, "in numeric literal"),
            },
            State::Digits => {
                if c.is_ascii_digit() {
                    Op::Continue
                } else {
                    self.zero(c)
                }
            }
            State::Zero => self.zero(c),
            State::Dot => {
                if c.is_ascii_digit() {
                    self.state = State::DotDigits;
                    Op::Continue
                } else {
                    self.fail(c, "after decimal point in numeric literal")
                }
            }
            State::DotDigits => match c {
                b'0'..=b'9' => Op::Continue,
                b'e' | b'E' => {
                    self.state = State::Exp;
                    Op::Continue
                }
                _ => self.end_value(c),
            },
            State::Exp => {
                if c == b'+' || c == b'-' {
                    self.state = State::ExpSign;
                    Op::Continue
                } else {
                    self.exp_sign(c)
                }
            }
            State::ExpSign => self.exp_sign(c),
            State::ExpDigits => {
                if c.is_ascii_digit() {
                    Op::Continue
                } else {
                    self.end_value(c)
                }
            }
            State::Literal(mut lit) => match lit.step(c) {
                Matched::More => {
                    self.state = State::Literal(lit);
                    Op::Continue
                }
                Matched::Done => {
                    self.state = State::EndValue;
                    Op::Continue
                }
                Matched::Reject(expected) => {
                    let context = format!(
                        "in literal {} (expecting {})",
                        lit.word(),
                        quote_char(expected)
                    );
                    self.fail(c, &context)
                }
            },
            State::Error => Op::Error,
        }
    }

    fn begin_value(&mut self, c: u8) -> Op {
        if is_space(c) {
            return Op::SkipSpace;
        }
        match c {
            b'{' => {
                self.state = State::BeginStringOrEmpty;
                self.push(c, Parse::ObjectKey, Op::BeginObject)
            }
            b'[' => {
                self.state = State::BeginValueOrEmpty;
                self.push(c, Parse::ArrayValue, Op::BeginArray)
            }
            b'"' => {
                self.state = State::InString;
                Op::BeginLiteral
            }
            b'-' => {
                self.state = State::Neg;
                Op::BeginLiteral
            }
            b'0' => {
                self.state = State::Zero;
                Op::BeginLiteral
            }
            b'1'..=b'9' => {
                self.state = State::Digits;
                Op::BeginLiteral
            }
            b't' | b'f' | b'n' => {
                self.state = State::Literal(Literal::after_first(c));
                Op::BeginLiteral
            }
            _ => self.fail(c, "looking for beginning of value"),
        }
    }

    fn begin_string(&mut self, c: u8) -> Op {
        if is_space(c) {
            return Op::SkipSpace;
        }
        if c == b'"' {
            self.state = State::InString;
            return Op::BeginLiteral;
        }
        self.fail(c, "looking for beginning of object key string")
    }

    fn end_value(&mut self, c: u8) -> Op {
        let Some(&top) = self.stack.last() else {
            self.state = State::EndTop;
            self.end_top = true;
            return self.end_top(c);
        };
        if is_space(c) {
            self.state = State::EndValue;
            return Op::SkipSpace;
        }
        match top {
            Parse::ObjectKey => {
                if c == b':' {
                    self.set_top(Parse::ObjectValue);
                    self.state = State::BeginValue;
                    return Op::ObjectKey;
                }
                self.fail(c, "after object key")
            }
            Parse::ObjectValue => match c {
                b',' => {
                    self.set_top(Parse::ObjectKey);
                    self.state = State::BeginString;
                    Op::ObjectValue
                }
                b'}' => {
                    self.pop();
                    Op::EndObject
                }
                _ => self.fail(c, "after object key:value pair"),
            },
            Parse::ArrayValue => match c {
                b',' => {
                    self.state = State::BeginValue;
                    Op::ArrayValue
                }
                b']' => {
                    self.pop();
                    Op::EndArray
                }
                _ => self.fail(c, "after array element"),
            },
        }
    }

    fn end_top(&mut self, c: u8) -> Op {
        if is_space(c) {
            return Op::End;
        }
        if self.multi {
            self.end_top = false;
            self.state = State::BeginValue;
            return self.begin_value(c);
        }
        self.fail(c, "after top-level value")
    }

    fn zero(&mut self, c: u8) -> Op {
        match c {
            b'.' => {
                self.state = State::Dot;
                Op::Continue
            }
            b'e' | b'E' => {
                self.state = State::Exp;
                Op::Continue
            }
            _ => self.end_value(c),
        }
    }

    fn exp_sign(&mut self, c: u8) -> Op {
        if c.is_ascii_digit() {
            self.state = State::ExpDigits;
            Op::Continue
        } else {
            self.fail(c, "in exponent of numeric literal")
        }
    }

    fn push(&mut self, c: u8, parse: Parse, op: Op) -> Op {
        self.stack.push(parse);
        if self.stack.len() <= self.max_depth {
            op
        } else {
            self.fail(c, "exceeded max depth")
        }
    }

    fn pop(&mut self) {
        self.stack.pop();
        if self.stack.is_empty() {
            self.state = State::EndTop;
            self.end_top = true;
        } else {
            self.state = State::EndValue;
        }
    }

    fn set_top(&mut self, parse: Parse) {
        if let Some(top) = self.stack.last_mut() {
            *top = parse;
        }
    }

    fn fail(&mut self, c: u8, context: &str) -> Op {
        self.state = State::Error;
        self.err = Some(SyntaxError::new(
            format!("invalid character {} {context}", quote_char(c)),
            self.bytes,
        ));
        Op::Error
    }
}

/// Formats a byte the way syntax errors show it: `'x'`, `'\n'`, `'\x01'`.
pub(crate) fn quote_char(c: u8) -> String {
    match c {
        b'\'' => "'\\''".into(),
        b'"' => "'\"'".into(),
        0x07 => "'\\a'".into(),
        0x08 => "'\\b'".into(),
        0x0c => "'\\f'".into(),
        b'\n' => "'\\n'".into(),
        b'\r' => "'\\r'".into(),
        b'\t' => "'\\t'".into(),
        0x0b => "'\\v'".into(),
        b'\\' => "'\\\\'".into(),
        0..0x20 | 0x7f => format!("'\\x{c:02x}'"),
        0x80..=0xa0 | 0xad => format!("'\\u{c:04x}'"),
        _ => format!("'{}'", char::from(c)),
    }
}

/// Reports whether `data` is exactly one valid JSON value.
pub(crate) fn check_valid(data: &[u8], scan: &mut Scanner) -> Result<(), SyntaxError> {
    for &c in data {
        if scan.step(c) == Op::Error {
            break;
        }
    }
    if scan.eof() == Op::Error {
        return Err(scan.err.clone().unwrap_or_else(|| SyntaxError::unexpected_end(scan.bytes)));
    }
    Ok(())
}
