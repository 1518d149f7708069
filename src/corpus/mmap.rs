// Tue Jan 13 2026 - Alex

use crate::corpus::CorpusError;
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

enum Backing {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

/// Read-only corpus shared by every rank.
///
/// Files are mapped rather than read so readers scan their chunk straight out of
/// the page cache; each rank only touches its own byte range.
pub struct Corpus {
    backing: Arc<Backing>,
    source: Option<PathBuf>,
}

impl Clone for Corpus {
    fn clone(&self) -> Self {
        Self {
            backing: self.backing.clone(),
            source: self.source.clone(),
        }
    }
}

impl Corpus {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CorpusError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| CorpusError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(CorpusError::NotAFile(path.to_path_buf()));
        }
        // Partition boundaries depend on the global size, so an empty corpus
        // cannot be split meaningfully.
        if metadata.len() == 0 {
            return Err(CorpusError::Empty(path.to_path_buf()));
        }

        let mmap = unsafe { Mmap::map(&file) }.map_err(|source| CorpusError::Map {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("mapped corpus {} ({} bytes)", path.display(), mmap.len());

        Ok(Self {
            backing: Arc::new(Backing::Mapped(mmap)),
            source: Some(path.to_path_buf()),
        })
    }

    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> Self {
        Self {
            backing: Arc::new(Backing::Owned(bytes.into())),
            source: None,
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self.backing.as_ref() {
            Backing::Mapped(mmap) => mmap.as_ref(),
            Backing::Owned(bytes) => bytes.as_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.backing.as_ref(), Backing::Mapped(_))
    }
}
