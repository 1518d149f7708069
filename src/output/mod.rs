// Tue Jan 13 2026 - Alex

pub mod metrics;
pub mod report;

pub use metrics::{Phase, RunMetrics};
pub use report::ReportPrinter;
