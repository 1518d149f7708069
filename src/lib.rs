// Tue Jan 15 2026 - Alex

pub mod config;
pub mod corpus;
pub mod engine;
pub mod output;
pub mod token;
pub mod transport;
pub mod ui;
pub mod utils;
pub mod window;

pub use config::Config;
pub use corpus::{Corpus, Partitioner};
pub use engine::{Engine, EngineError, RunReport, TopologyKind};
pub use output::{ReportPrinter, RunMetrics};
pub use token::{KeyRouter, Tokenizer};
pub use transport::{LocalFabric, Transport};
pub use window::{WindowAggregator, WindowEvent};
