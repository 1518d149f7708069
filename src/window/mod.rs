// Fri Jan 16 2026 - Alex

pub mod aggregator;
pub mod event;

pub use aggregator::{FlushStats, WindowAggregator, WindowParams};
pub use event::{WindowEvent, WindowKind};
