// Thu Jan 15 2026 - Alex

use crate::transport::wire::WireError;
use crate::transport::{Rank, Tag};
use thiserror::Error;

/// Every variant is fatal to the run; nothing in the engine retries.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("rank {rank} is not part of a {size}-rank fabric")]
    InvalidRank { rank: Rank, size: usize },
    #[error("channel to rank {0} is closed")]
    Disconnected(Rank),
    #[error("run aborted by a failing peer")]
    Aborted,
    #[error("malformed {tag:?} payload from rank {source_rank}: {error}")]
    Malformed {
        source_rank: Rank,
        tag: Tag,
        #[source]
        error: WireError,
    },
    #[error("collective {op} expected {expected} bytes from rank {source_rank}, got {actual}")]
    Collective {
        op: &'static str,
        source_rank: Rank,
        expected: usize,
        actual: usize,
    },
}
