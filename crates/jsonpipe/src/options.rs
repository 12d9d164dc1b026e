use std::time::Duration;

/// The deepest container nesting the scanner accepts.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Configuration for [`unmarshal_with`](crate::unmarshal_with) and
/// [`Decoder`](crate::Decoder).
///
/// # Examples
///
/// ```rust
/// use jsonpipe::{DecoderOptions, Value};
///
/// let options = DecoderOptions {
///     use_number: true,
///     ..Default::default()
/// };
/// let mut value = Value::Null;
/// jsonpipe::unmarshal_with(&b"[1.50]"[..], &mut value, options).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    /// Whether dynamically typed destinations keep numbers as
    /// [`Number`](crate::Number) literals instead of converting them to
    /// `f64`.
    ///
    /// # Default
    ///
    /// `false`
    pub use_number: bool,

    /// Maximum container nesting depth.
    ///
    /// Opening one more array or object than this fails with an `exceeded max
    /// depth` syntax error. The limit is enforced by the scanner, so it holds
    /// for every destination type regardless of how the engine recurses.
    ///
    /// # Default
    ///
    /// `10000`
    pub max_depth: usize,

    /// What to do when the source reports
    /// [`WouldBlock`](std::io::ErrorKind::WouldBlock).
    ///
    /// # Default
    ///
    /// [`RetryPolicy::Backoff`] with a one millisecond delay.
    pub retry: RetryPolicy,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            use_number: false,
            max_depth: DEFAULT_MAX_DEPTH,
            retry: RetryPolicy::default(),
        }
    }
}

/// How a source that has no bytes ready yet is polled again.
///
/// Reads failing with [`Interrupted`](std::io::ErrorKind::Interrupted) are
/// always retried immediately; this policy only governs
/// [`WouldBlock`](std::io::ErrorKind::WouldBlock).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Yield the thread and read again.
    Immediate,
    /// Sleep for the given delay before reading again.
    Backoff(Duration),
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Backoff(Duration::from_millis(1))
    }
}

impl RetryPolicy {
    pub(crate) fn wait(self) {
        match self {
            RetryPolicy::Immediate => std::thread::yield_now(),
            RetryPolicy::Backoff(delay) => std::thread::sleep(delay),
        }
    }
}

/// Output settings shared by [`Encoder`](crate::Encoder) and
/// [`Decoder::transcode`](crate::Decoder::transcode).
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Whether `<`, `>`, `&`, U+2028 and U+2029 inside strings are written as
    /// `\u` escapes so the output can be embedded in HTML.
    ///
    /// # Default
    ///
    /// `true`
    pub escape_html: bool,

    /// Written at the start of every indented line.
    ///
    /// # Default
    ///
    /// Empty.
    pub prefix: String,

    /// Written once per nesting level. Output is compact when both `prefix`
    /// and `indent` are empty.
    ///
    /// # Default
    ///
    /// Empty.
    pub indent: String,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            escape_html: true,
            prefix: String::new(),
            indent: String::new(),
        }
    }
}

impl EncoderOptions {
    pub(crate) fn indents(&self) -> bool {
        !self.prefix.is_empty() || !self.indent.is_empty()
    }
}
