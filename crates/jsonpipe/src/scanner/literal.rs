//! Matching the remaining bytes of `true`, `false` and `null`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Word {
    True,
    False,
    Null,
}

impl Word {
    fn bytes(self) -> &'static [u8] {
        match self {
            Word::True => b"true",
            Word::False => b"false",
            Word::Null => b"null",
        }
    }
}

/// What happened after feeding one more byte into the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Matched {
    /// The byte matched and more are expected.
    More,
    /// The byte matched and completed the word.
    Done,
    /// The byte did not match; carries the byte that was expected.
    Reject(u8),
}

/// Progress through a keyword, positioned after its first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Literal {
    word: Word,
    next: usize,
}

impl Literal {
    /// Starts matching once the first byte (`t`, `f` or `n`) was seen.
    pub(super) fn after_first(first: u8) -> Self {
        let word = match first {
            b't' => Word::True,
            b'f' => Word::False,
            _ => Word::Null,
        };
        Self { word, next: 1 }
    }

    pub(super) fn word(self) -> &'static str {
        match self.word {
            Word::True => "true",
            Word::False => "false",
            Word::Null => "null",
        }
    }

    pub(super) fn step(&mut self, c: u8) -> Matched {
        let bytes = self.word.bytes();
        let expected = bytes[self.next];
        if c != expected {
            return Matched::Reject(expected);
        }
        self.next += 1;
        if self.next == bytes.len() {
            Matched::Done
        } else {
            Matched::More
        }
    }
}
