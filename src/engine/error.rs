// Sat Jan 17 2026 - Alex

use crate::config::ConfigError;
use crate::corpus::CorpusError;
use crate::engine::termination::ProtocolError;
use crate::transport::{Rank, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("worker {0} panicked")]
    WorkerPanicked(Rank),
    #[error("failed to spawn worker {rank}: {source}")]
    Spawn {
        rank: Rank,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Config(_) => 1,
            EngineError::Corpus(_) => 2,
            EngineError::Transport(_)
            | EngineError::Protocol(_)
            | EngineError::WorkerPanicked(_)
            | EngineError::Spawn { .. } => 3,
        }
    }

    /// Errors a rank sees only because another rank gave up first.
    pub fn is_secondary(&self) -> bool {
        matches!(
            self,
            EngineError::Transport(TransportError::Aborted)
                | EngineError::Transport(TransportError::Disconnected(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(EngineError::from(ConfigError::ZeroWindow).exit_code(), 1);
        assert_eq!(
            EngineError::from(CorpusError::Empty("x".into())).exit_code(),
            2
        );
        assert_eq!(EngineError::from(TransportError::Aborted).exit_code(), 3);
        assert_eq!(EngineError::WorkerPanicked(2).exit_code(), 3);
    }

    #[test]
    fn test_secondary_errors() {
        assert!(EngineError::from(TransportError::Aborted).is_secondary());
        assert!(!EngineError::WorkerPanicked(1).is_secondary());
    }
}
