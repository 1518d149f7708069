// Wed Jan 14 2026 - Alex

use crate::config::DEFAULT_MAX_TOKEN_LEN;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::Range;

/// Bytes that can appear inside a token. Everything else is a separator.
#[inline]
pub fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphabetic()
}

/// A normalized word: lower-case ASCII letters, at most `max_len` of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(Vec<u8>);

impl Token {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Token {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    max_len: usize,
    overrun: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_TOKEN_LEN,
            overrun: false,
        }
    }
}

impl Tokenizer {
    pub fn new(max_len: usize) -> Self {
        assert!(max_len > 0, "tokens need room for at least one byte");
        Self {
            max_len,
            overrun: false,
        }
    }

    /// Let a token that is still open at the end of the range run on to the
    /// next separator instead of being dropped.
    pub fn with_overrun(mut self, overrun: bool) -> Self {
        self.overrun = overrun;
        self
    }

    pub fn tokens<'a>(&self, data: &'a [u8], range: Range<usize>) -> Tokens<'a> {
        let end = range.end.min(data.len());
        Tokens {
            data,
            pos: range.start.min(end),
            end,
            max_len: self.max_len,
            overrun: self.overrun,
            buf: Vec::with_capacity(self.max_len),
            finished: false,
        }
    }

    pub fn tokenize(&self, data: &[u8], range: Range<usize>) -> Vec<Token> {
        self.tokens(data, range).collect()
    }
}

/// Lazy scan over one byte range. Single pass: once exhausted it stays exhausted.
pub struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    max_len: usize,
    overrun: bool,
    buf: Vec<u8>,
    finished: bool,
}

impl<'a> Tokens<'a> {
    /// Offset of the next byte to be scanned.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self) -> Token {
        let token = Token(self.buf.clone());
        self.buf.clear();
        token
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        loop {
            let open = !self.buf.is_empty();
            let extending = self.pos >= self.end && self.overrun && open;
            if (self.pos >= self.end && !extending) || self.pos >= self.data.len() {
                break;
            }

            let byte = self.data[self.pos];
            self.pos += 1;
            if is_token_byte(byte) {
                // overlong tokens keep consuming letters but stop growing
                if self.buf.len() < self.max_len {
                    self.buf.push(byte.to_ascii_lowercase());
                }
            } else if open {
                return Some(self.take());
            }
        }

        self.finished = true;
        if !self.buf.is_empty() {
            let at_boundary = self.pos >= self.data.len() || !is_token_byte(self.data[self.pos]);
            if at_boundary {
                return Some(self.take());
            }
            self.buf.clear();
        }
        None
    }
}

impl<'a> FusedIterator for Tokens<'a> {}
