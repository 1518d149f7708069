// Sat Jan 17 2026 - Alex

use crate::corpus::Chunk;
use crate::engine::topology::{Roles, TopologyKind};
use crate::output::RunMetrics;
use crate::transport::Rank;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub windows: u64,
}

/// What one rank hands back when its control loop ends.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub rank: Rank,
    pub roles: Roles,
    pub chunk: Option<Chunk>,
    /// Set on the rank that produced the run's result.
    pub total_windows: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<KeyCount>,
    pub metrics: RunMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub topology: TopologyKind,
    pub workers: usize,
    pub window_size: u64,
    pub slide_step: u64,
    pub total_windows: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<KeyCount>,
    /// Every rank's metrics folded together.
    pub metrics: RunMetrics,
    pub ranks: Vec<WorkerReport>,
}

impl RunReport {
    pub fn rank(&self, rank: Rank) -> Option<&WorkerReport> {
        self.ranks.iter().find(|r| r.rank == rank)
    }
}
