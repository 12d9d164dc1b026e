use std::{fmt, io};

use thiserror::Error;

/// Boxed error returned by user decoding hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Malformed input detected by the scanner.
///
/// The offset is the number of bytes consumed when the problem was found; for
/// an unexpected character this is one past its index, and for a truncated
/// input it is the total number of bytes read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{msg}")]
pub struct SyntaxError {
    msg: String,
    offset: usize,
}

impl SyntaxError {
    pub(crate) fn new(msg: impl Into<String>, offset: usize) -> Self {
        Self {
            msg: msg.into(),
            offset,
        }
    }

    pub(crate) fn unexpected_end(offset: usize) -> Self {
        Self::new("unexpected end of JSON input", offset)
    }

    /// Byte offset at which the error was detected.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The message without the offset.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.msg
    }
}

/// A JSON value that cannot be stored in the destination type.
///
/// These errors are recoverable: decoding continues past the offending value
/// and the error is reported once the whole value has been processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmarshalTypeError {
    /// Description of the JSON value: `"string"`, `"number"`, `"number 300"`,
    /// `"bool"`, `"array"` or `"object"`.
    pub value: String,
    /// Name of the destination type.
    pub type_name: String,
    /// Input offset just past the offending value (or past its opening
    /// bracket for containers).
    pub offset: usize,
    /// Name of the innermost struct being decoded, if any.
    pub struct_name: &'static str,
    /// Dotted path of JSON field names leading to the value.
    pub field: String,
}

impl UnmarshalTypeError {
    /// Creates a type error without struct context.
    #[must_use]
    pub fn new(value: impl Into<String>, type_name: impl Into<String>, offset: usize) -> Self {
        Self {
            value: value.into(),
            type_name: type_name.into(),
            offset,
            struct_name: "",
            field: String::new(),
        }
    }
}

impl fmt::Display for UnmarshalTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.struct_name.is_empty() && self.field.is_empty() {
            write!(
                f,
                "json: cannot unmarshal {} into Go value of type {}",
                self.value, self.type_name
            )
        } else {
            write!(
                f,
                "json: cannot unmarshal {} into Go struct field {}.{} of type {}",
                self.value, self.struct_name, self.field, self.type_name
            )
        }
    }
}

impl std::error::Error for UnmarshalTypeError {}

/// A destination or decoder that cannot accept a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("json: {reason}")]
pub struct InvalidTargetError {
    reason: String,
}

impl InvalidTargetError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Every failure the decoder, encoder and helpers can report.
#[derive(Debug, Error)]
pub enum Error {
    /// The input is not valid JSON.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// A value did not fit its destination.
    #[error(transparent)]
    Type(#[from] UnmarshalTypeError),
    /// The destination cannot be decoded into.
    #[error(transparent)]
    InvalidTarget(#[from] InvalidTargetError),
    /// A `,string` field received a quoted value that is not a scalar
    /// literal.
    #[error("json: invalid use of ,string struct tag, trying to unmarshal {item:?} into {type_name}")]
    StringTag {
        /// The unquoted contents of the string.
        item: String,
        /// Name of the destination type.
        type_name: String,
    },
    /// A `,string` field received something other than a string or null.
    #[error(
        "json: invalid use of ,string struct tag, trying to unmarshal unquoted value into {type_name}"
    )]
    UnquotedStringTag {
        /// Name of the destination type.
        type_name: String,
    },
    /// A JSON string decoded into a [`Number`](crate::Number) is not a valid
    /// number literal.
    #[error("json: invalid number literal, trying to unmarshal {literal:?} into Number")]
    InvalidNumber {
        /// The string literal including its quotes.
        literal: String,
    },
    /// A field is reachable only through an absent, unexported embedded
    /// pointer.
    #[error("json: cannot set embedded pointer to unexported struct: {0}")]
    EmbeddedPointer(&'static str),
    /// A byte slice destination received invalid base64.
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    /// A user hook rejected its input.
    #[error("{0}")]
    Hook(HookError),
    /// The byte source failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Serializing a value failed.
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
    /// The source ended before another value started.
    #[error("EOF")]
    Eof,
}

impl Error {
    /// Returns `true` for the clean end-of-stream signal.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        matches!(self, Error::Eof)
    }

    /// Offset of a syntax or type error.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Syntax(err) => Some(err.offset()),
            Error::Type(err) => Some(err.offset),
            _ => None,
        }
    }
}
