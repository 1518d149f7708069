// Thu Jan 15 2026 - Alex

pub mod error;
pub mod local;
pub mod wire;

pub use error::TransportError;
pub use local::{AbortHandle, LocalFabric, LocalTransport};

use bytes::Bytes;
use serde::Serialize;

pub type Rank = usize;

/// Logical stream a message belongs to. Receives can select on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Tag {
    Tokens,
    Windows,
    Collective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Any,
    Rank(Rank),
}

impl Source {
    pub fn matches(&self, rank: Rank) -> bool {
        match self {
            Source::Any => true,
            Source::Rank(r) => *r == rank,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub source: Rank,
    pub tag: Tag,
    pub payload: Bytes,
}

impl Envelope {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A send started with [`Transport::send_async`].
///
/// The handle owns the payload until the transport has queued it, so the
/// caller cannot touch the buffer while the send is in flight.
#[derive(Debug)]
#[must_use = "a pending send must be waited on"]
pub struct SendHandle {
    dest: Rank,
    pending: Option<Envelope>,
}

impl SendHandle {
    pub(crate) fn completed(dest: Rank) -> Self {
        Self {
            dest,
            pending: None,
        }
    }

    pub(crate) fn pending(dest: Rank, envelope: Envelope) -> Self {
        Self {
            dest,
            pending: Some(envelope),
        }
    }

    pub(crate) fn take_pending(&mut self) -> Option<Envelope> {
        self.pending.take()
    }

    pub(crate) fn restore(&mut self, envelope: Envelope) {
        self.pending = Some(envelope);
    }

    pub fn dest(&self) -> Rank {
        self.dest
    }

    pub fn is_complete(&self) -> bool {
        self.pending.is_none()
    }
}

/// Point-to-point and collective exchange between the ranks of one run.
pub trait Transport: Send {
    fn rank(&self) -> Rank;

    fn size(&self) -> usize;

    /// Blocks until the payload is queued at `dest`.
    fn send(&self, dest: Rank, tag: Tag, payload: Bytes) -> Result<(), TransportError>;

    /// Queues the payload if that is possible right now, otherwise keeps it in
    /// the returned handle.
    fn send_async(&self, dest: Rank, tag: Tag, payload: Bytes) -> Result<SendHandle, TransportError>;

    /// Non-blocking completion check.
    fn test(&self, handle: &mut SendHandle) -> Result<bool, TransportError>;

    fn wait(&self, handle: SendHandle) -> Result<(), TransportError>;

    /// True if a matching message can be received without blocking.
    fn probe(&self, source: Source, tag: Tag) -> bool;

    fn receive(&self, source: Source, tag: Tag) -> Result<Envelope, TransportError>;

    /// Tells every peer to give up; used when this rank fails.
    fn abort(&self);

    fn wait_all(&self, handles: Vec<SendHandle>) -> Result<(), TransportError> {
        for handle in handles {
            self.wait(handle)?;
        }
        Ok(())
    }

    fn barrier(&self) -> Result<(), TransportError> {
        const ROOT: Rank = 0;
        if self.rank() == ROOT {
            for peer in 1..self.size() {
                self.receive(Source::Rank(peer), Tag::Collective)?;
            }
            for peer in 1..self.size() {
                self.send(peer, Tag::Collective, Bytes::new())?;
            }
        } else {
            self.send(ROOT, Tag::Collective, Bytes::new())?;
            self.receive(Source::Rank(ROOT), Tag::Collective)?;
        }
        Ok(())
    }

    /// Sums one value per rank at `root`. Only the root gets `Some`.
    fn reduce_sum(&self, value: u64, root: Rank) -> Result<Option<u64>, TransportError> {
        if self.rank() != root {
            self.send(root, Tag::Collective, Bytes::copy_from_slice(&value.to_le_bytes()))?;
            return Ok(None);
        }

        let mut total = value;
        for peer in (0..self.size()).filter(|&r| r != root) {
            let envelope = self.receive(Source::Rank(peer), Tag::Collective)?;
            let bytes: [u8; 8] = envelope.payload[..].try_into().map_err(|_| {
                TransportError::Collective {
                    op: "reduce_sum",
                    source_rank: peer,
                    expected: 8,
                    actual: envelope.len(),
                }
            })?;
            total += u64::from_le_bytes(bytes);
        }
        Ok(Some(total))
    }
}
