// Thu Jan 15 2026 - Alex

//! Length-prefixed frames carried inside batch payloads.
//!
//! ```text
//! token         [len:u8 (1..=255)][key bytes]
//! window        [len:u8 (1..=255)][key bytes][size:u64 LE]
//! end-of-stream [0u8][sender:u32 LE]
//! ```
//!
//! A zero length prefix can never start a key, which makes it the marker
//! sentinel.

use crate::transport::Rank;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const MAX_KEY_LEN: usize = u8::MAX as usize;
pub const MARKER_FRAME_LEN: usize = 1 + 4;

pub fn token_frame_len(key_len: usize) -> usize {
    1 + key_len
}

pub fn window_frame_len(key_len: usize) -> usize {
    1 + key_len + 8
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WireError {
    #[error("frame truncated: needed {needed} bytes, {remaining} left")]
    Truncated { needed: usize, remaining: usize },
    #[error("key of {0} bytes does not fit a frame")]
    KeyTooLong(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    Token(&'a [u8]),
    Window { key: &'a [u8], size: u64 },
    EndOfStream { sender: Rank },
}

impl<'a> Frame<'a> {
    pub fn encoded_len(&self) -> usize {
        match self {
            Frame::Token(key) => token_frame_len(key.len()),
            Frame::Window { key, .. } => window_frame_len(key.len()),
            Frame::EndOfStream { .. } => MARKER_FRAME_LEN,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        match *self {
            Frame::Token(key) => {
                debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_LEN);
                buf.put_u8(key.len() as u8);
                buf.put_slice(key);
            }
            Frame::Window { key, size } => {
                debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_LEN);
                buf.put_u8(key.len() as u8);
                buf.put_slice(key);
                buf.put_u64_le(size);
            }
            Frame::EndOfStream { sender } => {
                buf.put_u8(0);
                buf.put_u32_le(sender as u32);
            }
        }
    }
}

/// One decoded frame of an inbound stream: a data record or the sender's
/// end-of-stream marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry<T> {
    Data(T),
    EndOfStream { sender: Rank },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRecord<'a> {
    pub key: &'a [u8],
    pub size: u64,
}

struct Cursor<'a> {
    rest: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn need(&self, needed: usize) -> Result<(), WireError> {
        if self.rest.remaining() < needed {
            return Err(WireError::Truncated {
                needed,
                remaining: self.rest.remaining(),
            });
        }
        Ok(())
    }

    fn key_or_marker(&mut self) -> Result<Entry<&'a [u8]>, WireError> {
        let len = self.rest.get_u8() as usize;
        if len == 0 {
            self.need(4)?;
            return Ok(Entry::EndOfStream {
                sender: self.rest.get_u32_le() as Rank,
            });
        }
        self.need(len)?;
        let (key, rest) = self.rest.split_at(len);
        self.rest = rest;
        Ok(Entry::Data(key))
    }

    fn size(&mut self) -> Result<u64, WireError> {
        self.need(8)?;
        Ok(self.rest.get_u64_le())
    }

    fn next_entry<T>(
        &mut self,
        read: impl FnOnce(&mut Self) -> Result<Entry<T>, WireError>,
    ) -> Option<Result<Entry<T>, WireError>> {
        if self.rest.is_empty() {
            return None;
        }
        let entry = read(self);
        if entry.is_err() {
            // stop after the first malformed frame
            self.rest = &[];
        }
        Some(entry)
    }
}

/// Walks the frames of a token batch.
pub struct TokenReader<'a> {
    cursor: Cursor<'a>,
}

impl<'a> TokenReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: Cursor { rest: payload },
        }
    }
}

impl<'a> Iterator for TokenReader<'a> {
    type Item = Result<Entry<&'a [u8]>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_entry(Cursor::key_or_marker)
    }
}

/// Walks the frames of a window batch.
pub struct WindowReader<'a> {
    cursor: Cursor<'a>,
}

impl<'a> WindowReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: Cursor { rest: payload },
        }
    }
}

impl<'a> Iterator for WindowReader<'a> {
    type Item = Result<Entry<WindowRecord<'a>>, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_entry(|cursor| match cursor.key_or_marker()? {
            Entry::Data(key) => Ok(Entry::Data(WindowRecord {
                key,
                size: cursor.size()?,
            })),
            Entry::EndOfStream { sender } => Ok(Entry::EndOfStream { sender }),
        })
    }
}

/// Outgoing payload bounded by a byte capacity.
///
/// Pushing a frame that does not fit cuts the current contents first and hands
/// them back, so a returned batch never exceeds the capacity unless a single
/// frame does.
pub struct BatchBuffer {
    buf: BytesMut,
    capacity: usize,
    frames: usize,
}

impl BatchBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            capacity,
            frames: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn push(&mut self, frame: Frame<'_>) -> Option<Bytes> {
        let flushed = if !self.is_empty() && self.len() + frame.encoded_len() > self.capacity {
            Some(self.take())
        } else {
            None
        };
        frame.encode(&mut self.buf);
        self.frames += 1;
        flushed
    }

    pub fn push_token(&mut self, key: &[u8]) -> Option<Bytes> {
        self.push(Frame::Token(key))
    }

    pub fn push_window(&mut self, key: &[u8], size: u64) -> Option<Bytes> {
        self.push(Frame::Window { key, size })
    }

    pub fn push_marker(&mut self, sender: Rank) -> Option<Bytes> {
        self.push(Frame::EndOfStream { sender })
    }

    /// Hands out the current contents and starts a fresh batch.
    pub fn take(&mut self) -> Bytes {
        self.frames = 0;
        let out = self.buf.split().freeze();
        self.buf.reserve(self.capacity);
        out
    }
}
