//! Writing values as newline-terminated JSON.

use std::io::Write;

use serde::Serialize;

use crate::{error::Error, format, options::EncoderOptions};

/// Writes a stream of JSON values, one per line.
///
/// Serialization is delegated to `serde_json`; the encoder applies the
/// output settings and writes each value to the sink in a single call.
///
/// ```
/// use jsonpipe::Encoder;
///
/// let mut out = Vec::new();
/// let mut enc = Encoder::new(&mut out);
/// enc.encode(&["<b>", "x"]).unwrap();
/// enc.set_indent("", " ");
/// enc.encode(&1).unwrap();
/// assert_eq!(out, b"[\"\\u003cb\\u003e\",\"x\"]\n1\n");
/// ```
pub struct Encoder<W> {
    sink: W,
    options: EncoderOptions,
}

impl<W: Write> Encoder<W> {
    /// Creates an encoder that escapes HTML and writes compact output.
    pub fn new(sink: W) -> Self {
        Self::with_options(sink, EncoderOptions::default())
    }

    /// Creates an encoder with explicit output settings.
    pub fn with_options(sink: W, options: EncoderOptions) -> Self {
        Self { sink, options }
    }

    /// Serializes `value` and writes it followed by a newline.
    ///
    /// # Errors
    ///
    /// [`Error::Encode`] when serialization fails, [`Error::Io`] when the
    /// sink does. Nothing is written in the first case.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        let json = serde_json::to_vec(value)?;
        emit(&mut self.sink, &json, &self.options)
    }

    /// Indents subsequent values: each line starts with `prefix`, followed
    /// by one `indent` per nesting level.
    pub fn set_indent(&mut self, prefix: &str, indent: &str) {
        prefix.clone_into(&mut self.options.prefix);
        indent.clone_into(&mut self.options.indent);
    }

    /// Sets whether HTML-sensitive characters inside strings are escaped.
    pub fn set_escape_html(&mut self, on: bool) {
        self.options.escape_html = on;
    }

    /// Returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Serializes `value` to compact JSON with HTML-sensitive characters escaped
/// and writes it to `sink` in one call, without a trailing newline.
///
/// # Errors
///
/// [`Error::Encode`] when serialization fails, [`Error::Io`] when the sink
/// does.
pub fn marshal<T: Serialize + ?Sized, W: Write>(value: &T, mut sink: W) -> Result<(), Error> {
    let json = serde_json::to_vec(value)?;
    let mut out = Vec::with_capacity(json.len());
    format::compact_into(&mut out, &json, true)?;
    sink.write_all(&out)?;
    Ok(())
}

/// Writes one already encoded value as a complete output line.
pub(crate) fn emit<W: Write>(
    sink: &mut W,
    json: &[u8],
    options: &EncoderOptions,
) -> Result<(), Error> {
    let mut line = Vec::with_capacity(json.len() + 1);
    format::compact_into(&mut line, json, options.escape_html)?;
    line.push(b'\n');
    if options.indents() {
        let mut indented = Vec::with_capacity(line.len() * 2);
        format::indent(&mut indented, &line, &options.prefix, &options.indent)?;
        line = indented;
    }
    tracing::trace!(target: "jsonpipe", bytes = line.len(), "value encoded");
    sink.write_all(&line)?;
    Ok(())
}
