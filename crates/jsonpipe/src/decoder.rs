//! Pull-based decoding of a stream of values.

use std::io::{Read, Write};

use crate::{
    Number, RawValue, Value,
    decode::{Decode, engine::DecodeState},
    encoder,
    error::{Error, InvalidTargetError, SyntaxError},
    options::{DecoderOptions, EncoderOptions},
    scanner::{Scanner, is_space, quote_char},
    stream::LogicalStream,
};

/// One step of the token stream produced by [`Decoder::token`].
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// One of `[`, `]`, `{` or `}`.
    Delim(char),
    /// `true` or `false`.
    Bool(bool),
    /// A number, converted to `f64`.
    Number(f64),
    /// A number kept as written, produced when the decoder uses
    /// [`Number`] literals.
    Literal(Number),
    /// A string, object keys included.
    String(String),
    /// `null`
    Null,
}

/// Where the token stream stands inside the current container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenState {
    TopValue,
    ArrayStart,
    ArrayValue,
    ArrayComma,
    ObjectStart,
    ObjectKey,
    ObjectColon,
    ObjectValue,
    ObjectComma,
}

impl TokenState {
    fn value_allowed(self) -> bool {
        matches!(
            self,
            Self::TopValue | Self::ArrayStart | Self::ArrayValue | Self::ObjectValue
        )
    }

    fn context(self) -> &'static str {
        match self {
            Self::TopValue | Self::ArrayStart | Self::ArrayValue | Self::ObjectValue => {
                "looking for beginning of value"
            }
            Self::ArrayComma => "after array element",
            Self::ObjectStart | Self::ObjectKey => "looking for beginning of object key string",
            Self::ObjectColon => "after object key",
            Self::ObjectComma => "after object key:value pair",
        }
    }
}

/// Reads a sequence of JSON values from a byte source.
///
/// Values may be separated by any amount of whitespace. Only the bytes a
/// call needs are pulled from the source, so a decoder can sit on a pipe or
/// socket whose peer is still writing. [`decode`](Self::decode) and
/// [`token`](Self::token) can be interleaved to stream the elements of a
/// large array one at a time.
///
/// # Examples
///
/// ```
/// use jsonpipe::{Decoder, Token, Value};
///
/// let mut dec = Decoder::new(&br#"[{"n": 1}, {"n": 2}]"#[..]);
/// assert_eq!(dec.token().unwrap(), Token::Delim('['));
/// let mut total = 0.0;
/// while dec.more() {
///     let mut item = Value::Null;
///     dec.decode(&mut item).unwrap();
///     total += item.as_object().unwrap()["n"].as_f64().unwrap();
/// }
/// assert_eq!(dec.token().unwrap(), Token::Delim(']'));
/// assert_eq!(total, 3.0);
/// ```
pub struct Decoder<R> {
    stream: LogicalStream<R>,
    pos: usize,
    options: DecoderOptions,
    output: EncoderOptions,
    token_state: TokenState,
    token_stack: Vec<TokenState>,
    poisoned: Option<String>,
}

impl<R: Read> Decoder<R> {
    /// Creates a decoder with default options.
    pub fn new(source: R) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    /// Creates a decoder with the given options.
    pub fn with_options(source: R, options: DecoderOptions) -> Self {
        let scanner = Scanner::multi(options.max_depth);
        Self {
            stream: LogicalStream::new(source, scanner, options.retry),
            pos: 0,
            options,
            output: EncoderOptions::default(),
            token_state: TokenState::TopValue,
            token_stack: Vec::new(),
            poisoned: None,
        }
    }

    /// Makes dynamically typed destinations keep numbers as [`Number`]
    /// literals.
    pub fn use_number(&mut self) {
        self.options.use_number = true;
    }

    /// Sets the indentation [`transcode`](Self::transcode) writes with.
    /// Output is compact when both strings are empty.
    pub fn set_indent(&mut self, prefix: &str, indent: &str) {
        prefix.clone_into(&mut self.output.prefix);
        indent.clone_into(&mut self.output.indent);
    }

    /// Sets whether [`transcode`](Self::transcode) escapes HTML-sensitive
    /// characters.
    pub fn set_escape_html(&mut self, on: bool) {
        self.output.escape_html = on;
    }

    /// Decodes the next value into `dst`.
    ///
    /// # Errors
    ///
    /// - [`Error::Eof`] when the source ends cleanly before another value.
    /// - [`Error::Syntax`] for malformed input, which also ends the stream.
    /// - [`Error::Type`] and the other recoverable errors once the value has
    ///   been read completely; the decoder can go on to the next value.
    /// - Anything else leaves the decoder unusable: later calls fail with
    ///   [`Error::InvalidTarget`].
    pub fn decode<T: Decode>(&mut self, dst: &mut T) -> Result<(), Error> {
        self.check_poisoned()?;
        self.prepare_for_decode()?;
        if !self.token_state.value_allowed() {
            return Err(SyntaxError::new("not at beginning of value", self.pos).into());
        }
        self.peek()?;

        let mut state = DecodeState::new(&mut self.stream, self.pos, self.options.use_number);
        let result = state.value(dst);
        let (pos, saved) = state.finish();
        self.pos = pos;
        if let Err(err) = result {
            if !matches!(err, Error::Syntax(_)) {
                self.poison(&err);
            }
            return Err(err);
        }

        self.token_value_end();
        self.release();
        saved.map_or(Ok(()), Err)
    }

    /// Returns the next token.
    ///
    /// Commas and colons are consumed silently. Object keys come back as
    /// [`Token::String`]. A value that starts an array or object yields just
    /// its opening delimiter.
    ///
    /// # Errors
    ///
    /// [`Error::Eof`] at the end of the input, [`Error::Syntax`] for a token
    /// that cannot appear where it does.
    pub fn token(&mut self) -> Result<Token, Error> {
        self.check_poisoned()?;
        loop {
            let c = self.peek_token()?;
            match c {
                b'[' | b'{' => {
                    if !self.token_state.value_allowed() {
                        return Err(self.token_error(c));
                    }
                    self.pos += 1;
                    self.token_stack.push(self.token_state);
                    self.token_state = if c == b'[' {
                        TokenState::ArrayStart
                    } else {
                        TokenState::ObjectStart
                    };
                    return Ok(Token::Delim(char::from(c)));
                }
                b']' | b'}' => {
                    let open = if c == b']' {
                        matches!(self.token_state, TokenState::ArrayStart | TokenState::ArrayComma)
                    } else {
                        matches!(self.token_state, TokenState::ObjectStart | TokenState::ObjectComma)
                    };
                    if !open {
                        return Err(self.token_error(c));
                    }
                    self.pos += 1;
                    self.token_state = self.token_stack.pop().unwrap_or(TokenState::TopValue);
                    self.token_value_end();
                    self.release();
                    return Ok(Token::Delim(char::from(c)));
                }
                b':' => {
                    if self.token_state != TokenState::ObjectColon {
                        return Err(self.token_error(c));
                    }
                    self.pos += 1;
                    self.token_state = TokenState::ObjectValue;
                }
                b',' => {
                    self.token_state = match self.token_state {
                        TokenState::ArrayComma => TokenState::ArrayValue,
                        TokenState::ObjectComma => TokenState::ObjectKey,
                        _ => return Err(self.token_error(c)),
                    };
                    self.pos += 1;
                }
                b'"' if matches!(
                    self.token_state,
                    TokenState::ObjectStart | TokenState::ObjectKey
                ) =>
                {
                    let outer = std::mem::replace(&mut self.token_state, TokenState::TopValue);
                    let mut key = String::new();
                    let result = self.decode(&mut key);
                    self.token_state = outer;
                    result?;
                    self.token_state = TokenState::ObjectColon;
                    return Ok(Token::String(key));
                }
                _ => {
                    if !self.token_state.value_allowed() {
                        return Err(self.token_error(c));
                    }
                    let mut value = Value::Null;
                    self.decode(&mut value)?;
                    return match value {
                        Value::Null => Ok(Token::Null),
                        Value::Boolean(b) => Ok(Token::Bool(b)),
                        Value::Number(n) => Ok(Token::Number(n)),
                        Value::RawNumber(n) => Ok(Token::Literal(n)),
                        Value::String(s) => Ok(Token::String(s)),
                        Value::Array(_) | Value::Object(_) => {
                            Err(SyntaxError::new("JSON decoder out of sync", self.pos).into())
                        }
                    };
                }
            }
        }
    }

    /// Reports whether another element follows in the current array or
    /// object, or another value on the stream.
    pub fn more(&mut self) -> bool {
        matches!(self.peek(), Ok(c) if c != b']' && c != b'}')
    }

    /// Bytes already pulled from the source but not consumed by a decode.
    ///
    /// Reading them and then the source itself continues the input without
    /// loss.
    pub fn buffered(&self) -> impl Read + '_ {
        self.stream.buffered(self.pos)
    }

    /// Offset of the next unread byte, counted from the start of the source.
    #[must_use]
    pub fn input_offset(&self) -> usize {
        self.pos
    }

    /// Decodes the next value and writes it to `sink` re-encoded with this
    /// decoder's output settings, followed by a newline.
    ///
    /// # Errors
    ///
    /// Anything [`decode`](Self::decode) reports, and write errors from
    /// `sink`.
    pub fn transcode<W: Write>(&mut self, mut sink: W) -> Result<(), Error> {
        let mut raw = RawValue::default();
        self.decode(&mut raw)?;
        encoder::emit(&mut sink, raw.get(), &self.output)
    }

    /// Skips whitespace and returns the next byte without consuming it.
    fn peek(&mut self) -> Result<u8, Error> {
        loop {
            self.stream.load(self.pos)?;
            let c = self
                .stream
                .get(self.pos)
                .ok_or_else(|| SyntaxError::unexpected_end(self.pos))?;
            if !is_space(c) {
                return Ok(c);
            }
            self.pos += 1;
        }
    }

    /// Like [`peek`](Self::peek), with a rejected byte reported the way the
    /// token stream sees it.
    fn peek_token(&mut self) -> Result<u8, Error> {
        match self.peek() {
            Err(Error::Syntax(err))
                if err.offset() == self.pos + 1
                    && err.message().starts_with("invalid character")
                    && !err.message().ends_with("exceeded max depth") =>
            {
                match self.stream.get(self.pos) {
                    Some(c) => Err(self.token_error(c)),
                    None => Err(err.into()),
                }
            }
            other => other,
        }
    }

    fn token_error(&self, c: u8) -> Error {
        SyntaxError::new(
            format!("invalid character {} {}", quote_char(c), self.token_state.context()),
            self.pos,
        )
        .into()
    }

    /// Consumes the separator a preceding [`token`](Self::token) call left
    /// pending.
    fn prepare_for_decode(&mut self) -> Result<(), Error> {
        let (sep, next, msg) = match self.token_state {
            TokenState::ArrayComma => (
                b',',
                TokenState::ArrayValue,
                "expected comma after array element",
            ),
            TokenState::ObjectColon => (
                b':',
                TokenState::ObjectValue,
                "expected colon after object key",
            ),
            _ => return Ok(()),
        };
        match self.peek() {
            Ok(c) if c == sep => {
                self.pos += 1;
                self.token_state = next;
                Ok(())
            }
            Ok(_) => Err(SyntaxError::new(msg, self.pos).into()),
            Err(Error::Syntax(err)) if err.offset() == self.pos + 1 => {
                Err(SyntaxError::new(msg, self.pos).into())
            }
            Err(err) => Err(err),
        }
    }

    fn token_value_end(&mut self) {
        self.token_state = match self.token_state {
            TokenState::ArrayStart | TokenState::ArrayValue => TokenState::ArrayComma,
            TokenState::ObjectValue => TokenState::ObjectComma,
            other => other,
        };
    }

    fn release(&mut self) {
        if self.pos == self.stream.len() {
            self.stream.release();
        }
    }

    fn check_poisoned(&self) -> Result<(), Error> {
        match &self.poisoned {
            Some(reason) => Err(InvalidTargetError::new(format!(
                "Decoder unusable after earlier error: {reason}"
            ))
            .into()),
            None => Ok(()),
        }
    }

    fn poison(&mut self, err: &Error) {
        tracing::debug!(target: "jsonpipe", offset = self.pos, error = %err, "decoder stopped mid-value");
        self.poisoned = Some(err.to_string());
    }
}
