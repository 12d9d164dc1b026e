//! Position-addressable view over a byte source.
//!
//! Positions are absolute offsets into the source. Bytes become addressable
//! once [`LogicalStream::load`] has pulled and validated them, and stay
//! addressable until [`LogicalStream::release`] discards everything before
//! the current end.

use std::io::{Chain, Read};

use crate::{
    buffer::{ChunkBuffer, Fill},
    error::{Error, SyntaxError},
    options::RetryPolicy,
    scanner::{Op, Scanner},
};

pub(crate) struct LogicalStream<R> {
    dropped: usize,
    retained: Vec<u8>,
    chunks: ChunkBuffer<R>,
    scanner: Scanner,
    finished: bool,
}

impl<R: Read> LogicalStream<R> {
    pub(crate) fn new(source: R, scanner: Scanner, retry: RetryPolicy) -> Self {
        Self {
            dropped: 0,
            retained: Vec::new(),
            chunks: ChunkBuffer::new(source, retry),
            scanner,
            finished: false,
        }
    }

    /// One past the highest loaded position.
    pub(crate) fn len(&self) -> usize {
        self.dropped + self.retained.len()
    }

    /// Makes position `i` addressable.
    ///
    /// Returns [`Error::Eof`] when the source ends first and the scanner
    /// accepts the input so far; a scanner error takes priority.
    pub(crate) fn load(&mut self, i: usize) -> Result<(), Error> {
        if let Some(err) = self.scanner.error() {
            return Err(err.clone().into());
        }
        if i < self.len() {
            return Ok(());
        }
        if self.finished {
            return Err(Error::Eof);
        }
        let need = i + 1 - self.len();
        let start = self.retained.len();
        let fill = self.chunks.get(need, &mut self.retained);
        for &c in &self.retained[start..] {
            if self.scanner.step(c) == Op::Error {
                return Err(self.scanner_error());
            }
        }
        match fill? {
            Fill::Complete => Ok(()),
            Fill::Exhausted => {
                self.finished = true;
                if self.scanner.eof() == Op::Error {
                    return Err(self.scanner_error());
                }
                Err(Error::Eof)
            }
        }
    }

    /// Byte at `i`, if it is loaded and not dropped.
    pub(crate) fn get(&self, i: usize) -> Option<u8> {
        let idx = i.checked_sub(self.dropped)?;
        self.retained.get(idx).copied()
    }

    /// Bytes in `[l, r)`, if all of them are loaded and none dropped.
    pub(crate) fn range(&self, l: usize, r: usize) -> Option<&[u8]> {
        let l = l.checked_sub(self.dropped)?;
        let r = r.checked_sub(self.dropped)?;
        self.retained.get(l..r)
    }

    /// Discards every loaded byte; later positions stay addressable.
    pub(crate) fn release(&mut self) {
        if self.retained.is_empty() {
            return;
        }
        tracing::debug!(target: "jsonpipe", dropped = self.retained.len(), offset = self.len(), "releasing consumed bytes");
        self.dropped += self.retained.len();
        self.retained.clear();
    }

    /// Drains the source, requiring that only whitespace follows the value.
    pub(crate) fn close(&mut self) -> Result<(), Error> {
        if let Some(err) = self.scanner.error() {
            return Err(err.clone().into());
        }
        if !self.finished {
            loop {
                let block = self.chunks.next_block()?;
                if block.is_empty() {
                    break;
                }
                for &c in block {
                    if self.scanner.step(c) == Op::Error {
                        return Err(self.scanner_error());
                    }
                }
            }
            self.finished = true;
        }
        if self.scanner.eof() == Op::Error {
            return Err(self.scanner_error());
        }
        Ok(())
    }

    /// Everything pulled from the source at or after `from` that has not been
    /// validated by a decode yet.
    pub(crate) fn buffered(&self, from: usize) -> Chain<&[u8], &[u8]> {
        let tail = from
            .checked_sub(self.dropped)
            .and_then(|idx| self.retained.get(idx..))
            .unwrap_or_default();
        tail.chain(self.chunks.remaining())
    }

    fn scanner_error(&self) -> Error {
        let err = self
            .scanner
            .error()
            .cloned()
            .unwrap_or_else(|| SyntaxError::unexpected_end(self.scanner.bytes()));
        tracing::debug!(target: "jsonpipe", offset = err.offset(), error = %err, "scanner rejected input");
        err.into()
    }
}
