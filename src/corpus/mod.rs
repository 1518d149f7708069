// Tue Jan 13 2026 - Alex

pub mod error;
pub mod mmap;
pub mod partition;

pub use error::CorpusError;
pub use mmap::Corpus;
pub use partition::{Chunk, Partitioner};
