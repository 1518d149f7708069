// Tue Jan 13 2026 - Alex

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Total,
    Read,
    Network,
    Aggregate,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Total, Phase::Read, Phase::Network, Phase::Aggregate];

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Total => "total",
            Phase::Read => "read",
            Phase::Network => "network",
            Phase::Aggregate => "aggregate",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Counters and phase timings for one rank, or for a whole run once merged.
///
/// Owned by the worker that fills it and handed back when the worker returns;
/// nothing here is shared between threads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    #[serde(rename = "timings", serialize_with = "serialize_phases")]
    phase_nanos: [u64; 4],
    pub bytes_scanned: u64,
    pub tokens_read: u64,
    pub tokens_routed_local: u64,
    pub tokens_received: u64,
    pub tokens_sent: u64,
    pub batches_sent: u64,
    pub markers_sent: u64,
    pub markers_received: u64,
    pub windows_emitted: u64,
    pub windows_flushed: u64,
    pub windows_forwarded: u64,
    pub remainders_discarded: u64,
    pub keys_owned: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_time(&mut self, phase: Phase, duration: Duration) {
        self.phase_nanos[phase.index()] += duration.as_nanos() as u64;
    }

    /// Adds the time elapsed since `started` to `phase`.
    pub fn record_since(&mut self, phase: Phase, started: Instant) {
        self.add_time(phase, started.elapsed());
    }

    pub fn phase(&self, phase: Phase) -> Duration {
        Duration::from_nanos(self.phase_nanos[phase.index()])
    }

    pub fn phase_nanos(&self, phase: Phase) -> u64 {
        self.phase_nanos[phase.index()]
    }

    /// Phase timings in a stable order, in nanoseconds.
    pub fn timings(&self) -> IndexMap<&'static str, u64> {
        Phase::ALL
            .iter()
            .map(|p| (p.name(), self.phase_nanos(*p)))
            .collect()
    }

    /// Windows this rank produced, crossings and flushes together.
    pub fn windows_produced(&self) -> u64 {
        self.windows_emitted + self.windows_flushed
    }

    /// Folds another rank's metrics into this one. Counters and busy phases
    /// add up; `total` is wall-clock, so the slowest rank wins.
    pub fn merge(&mut self, other: &RunMetrics) {
        for phase in Phase::ALL {
            let i = phase.index();
            if phase == Phase::Total {
                self.phase_nanos[i] = self.phase_nanos[i].max(other.phase_nanos[i]);
            } else {
                self.phase_nanos[i] += other.phase_nanos[i];
            }
        }
        self.bytes_scanned += other.bytes_scanned;
        self.tokens_read += other.tokens_read;
        self.tokens_routed_local += other.tokens_routed_local;
        self.tokens_received += other.tokens_received;
        self.tokens_sent += other.tokens_sent;
        self.batches_sent += other.batches_sent;
        self.markers_sent += other.markers_sent;
        self.markers_received += other.markers_received;
        self.windows_emitted += other.windows_emitted;
        self.windows_flushed += other.windows_flushed;
        self.windows_forwarded += other.windows_forwarded;
        self.remainders_discarded += other.remainders_discarded;
        self.keys_owned += other.keys_owned;
    }
}

fn serialize_phases<S: Serializer>(nanos: &[u64; 4], serializer: S) -> Result<S::Ok, S::Error> {
    let map: IndexMap<&'static str, u64> = Phase::ALL
        .iter()
        .map(|p| (p.name(), nanos[p.index()]))
        .collect();
    map.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_adds_counters_and_maxes_total() {
        let mut a = RunMetrics::new();
        a.tokens_read = 10;
        a.add_time(Phase::Total, Duration::from_millis(5));
        a.add_time(Phase::Read, Duration::from_millis(2));

        let mut b = RunMetrics::new();
        b.tokens_read = 7;
        b.add_time(Phase::Total, Duration::from_millis(9));
        b.add_time(Phase::Read, Duration::from_millis(3));

        a.merge(&b);
        assert_eq!(a.tokens_read, 17);
        assert_eq!(a.phase(Phase::Total), Duration::from_millis(9));
        assert_eq!(a.phase(Phase::Read), Duration::from_millis(5));
    }

    #[test]
    fn test_timings_order() {
        let metrics = RunMetrics::new();
        let names: Vec<_> = metrics.timings().keys().copied().collect();
        assert_eq!(names, vec!["total", "read", "network", "aggregate"]);
    }
}
