// Fri Jan 16 2026 - Alex

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowKind {
    /// The key's count reached the window size.
    Crossing,
    /// Drained from residual state at shutdown.
    Flush,
}

/// A completed window for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowEvent {
    pub key: String,
    /// Arrivals the window held when it was emitted. Equal to the window size
    /// for crossings; the residual count for flushed windows.
    pub size: u64,
    pub kind: WindowKind,
}

impl WindowEvent {
    pub fn crossing(key: &[u8], size: u64) -> Self {
        Self {
            key: String::from_utf8_lossy(key).into_owned(),
            size,
            kind: WindowKind::Crossing,
        }
    }

    pub fn flush(key: &[u8], size: u64) -> Self {
        Self {
            key: String::from_utf8_lossy(key).into_owned(),
            size,
            kind: WindowKind::Flush,
        }
    }
}

impl fmt::Display for WindowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.size)
    }
}
