// Tue Jan 13 2026 - Alex

pub mod core;
pub mod error;
pub mod result;
pub mod sink;
pub mod termination;
pub mod topology;
pub mod worker;

pub use self::core::{Engine, EngineState};
pub use error::EngineError;
pub use result::{KeyCount, RunReport, WorkerReport};
pub use sink::{Sink, SinkSummary};
pub use termination::{CompletionCounter, ProtocolError};
pub use topology::{Layout, Roles, TopologyKind};
pub use worker::{Worker, WorkerSettings};
