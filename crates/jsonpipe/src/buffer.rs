//! Fixed-size block cache over a byte source.

use std::io::{self, ErrorKind, Read};

use crate::options::RetryPolicy;

/// Size of one block pulled from the source.
pub(crate) const BLOCK_SIZE: usize = 1 << 10;

/// Outcome of a successful [`ChunkBuffer::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fill {
    /// Every requested byte was appended.
    Complete,
    /// The source ended first; whatever it had left was appended.
    Exhausted,
}

pub(crate) struct ChunkBuffer<R> {
    block: Box<[u8; BLOCK_SIZE]>,
    index: usize,
    len: usize,
    source: R,
    retry: RetryPolicy,
    exhausted: bool,
}

impl<R: Read> ChunkBuffer<R> {
    pub(crate) fn new(source: R, retry: RetryPolicy) -> Self {
        Self {
            block: Box::new([0; BLOCK_SIZE]),
            index: 0,
            len: 0,
            source,
            retry,
            exhausted: false,
        }
    }

    /// Appends up to `n` bytes to `out`.
    ///
    /// On a source error the bytes obtained so far stay in `out`.
    pub(crate) fn get(&mut self, n: usize, out: &mut Vec<u8>) -> io::Result<Fill> {
        let mut need = n;
        while need > 0 {
            if self.index == self.len {
                if self.exhausted {
                    return Ok(Fill::Exhausted);
                }
                self.load()?;
                continue;
            }
            let take = need.min(self.len - self.index);
            out.extend_from_slice(&self.block[self.index..self.index + take]);
            self.index += take;
            need -= take;
        }
        Ok(Fill::Complete)
    }

    /// Returns the unread part of the current block, pulling a fresh block
    /// when it is empty. An empty slice means the source is exhausted.
    pub(crate) fn next_block(&mut self) -> io::Result<&[u8]> {
        if self.index == self.len && !self.exhausted {
            self.load()?;
        }
        let start = self.index;
        self.index = self.len;
        Ok(&self.block[start..self.len])
    }

    /// Bytes pulled from the source but not yet handed out.
    pub(crate) fn remaining(&self) -> &[u8] {
        &self.block[self.index..self.len]
    }

    fn load(&mut self) -> io::Result<()> {
        loop {
            match self.source.read(&mut self.block[..]) {
                Ok(0) => {
                    tracing::trace!(target: "jsonpipe", "source exhausted");
                    self.exhausted = true;
                    self.index = 0;
                    self.len = 0;
                    return Ok(());
                }
                Ok(n) => {
                    tracing::trace!(target: "jsonpipe", bytes = n, "pulled block");
                    self.index = 0;
                    self.len = n;
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) if err.kind() == ErrorKind::WouldBlock => {
                    tracing::trace!(target: "jsonpipe", policy = ?self.retry, "source not ready");
                    self.retry.wait();
                }
                Err(err) => return Err(err),
            }
        }
    }
}
