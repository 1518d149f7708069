// Sat Jan 17 2026 - Alex

use crate::config::ConfigError;
use crate::transport::Rank;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TopologyKind {
    /// Every rank reads and owns keys; rank 0 also collects windows.
    Symmetric,
    /// Rank 0 only collects; the others read and own keys.
    Root,
    /// Readers, then reducers, then an optional sink.
    Pipeline,
}

impl TopologyKind {
    pub fn name(&self) -> &'static str {
        match self {
            TopologyKind::Symmetric => "symmetric",
            TopologyKind::Root => "root",
            TopologyKind::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for TopologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single rank does in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Roles {
    /// Index of the corpus chunk this rank scans.
    pub reader: Option<usize>,
    /// Position in the owner list when this rank aggregates keys.
    pub owner: Option<usize>,
    pub sink: bool,
}

impl Roles {
    pub fn is_reader(&self) -> bool {
        self.reader.is_some()
    }

    pub fn is_owner(&self) -> bool {
        self.owner.is_some()
    }
}

impl fmt::Display for Roles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(i) = self.reader {
            parts.push(format!("reader#{}", i));
        }
        if let Some(i) = self.owner {
            parts.push(format!("owner#{}", i));
        }
        if self.sink {
            parts.push("sink".to_string());
        }
        if parts.is_empty() {
            parts.push("idle".to_string());
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// Role assignment for every rank of a run.
///
/// All topologies reduce to three rank lists. Readers send tokens to owners,
/// owners send windows to the sink. A rank holding both ends of an edge
/// applies the data locally instead of messaging itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub kind: TopologyKind,
    pub world: usize,
    pub readers: Vec<Rank>,
    pub owners: Vec<Rank>,
    pub sink: Option<Rank>,
}

impl Layout {
    pub const SINK_RANK: Rank = 0;

    /// Builds the layout for `world` ranks. `with_sink` only matters for the
    /// pipeline; the other topologies always collect at rank 0.
    pub fn build(kind: TopologyKind, world: usize, with_sink: bool) -> Result<Self, ConfigError> {
        if world == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        let required = Self::required_workers(kind, with_sink);
        if world < required {
            return Err(ConfigError::NotEnoughWorkers {
                topology: kind,
                workers: world,
                required,
            });
        }

        let all: Vec<Rank> = (0..world).collect();
        let layout = match kind {
            TopologyKind::Symmetric => Layout {
                kind,
                world,
                readers: all.clone(),
                owners: all,
                sink: Some(Self::SINK_RANK),
            },
            TopologyKind::Root => Layout {
                kind,
                world,
                readers: all[1..].to_vec(),
                owners: all[1..].to_vec(),
                sink: Some(Self::SINK_RANK),
            },
            TopologyKind::Pipeline if with_sink => {
                let workers = &all[1..];
                let readers = (workers.len() / 2).max(1);
                Layout {
                    kind,
                    world,
                    readers: workers[..readers].to_vec(),
                    owners: workers[readers..].to_vec(),
                    sink: Some(Self::SINK_RANK),
                }
            }
            TopologyKind::Pipeline => {
                let readers = (world / 2).max(1);
                Layout {
                    kind,
                    world,
                    readers: all[..readers].to_vec(),
                    owners: all[readers..].to_vec(),
                    sink: None,
                }
            }
        };
        Ok(layout)
    }

    pub fn required_workers(kind: TopologyKind, with_sink: bool) -> usize {
        match kind {
            TopologyKind::Symmetric => 1,
            TopologyKind::Root => 2,
            TopologyKind::Pipeline if with_sink => 3,
            TopologyKind::Pipeline => 2,
        }
    }

    pub fn roles(&self, rank: Rank) -> Roles {
        Roles {
            reader: self.readers.iter().position(|&r| r == rank),
            owner: self.owners.iter().position(|&r| r == rank),
            sink: self.sink == Some(rank),
        }
    }

    /// Ranks whose token markers `owner` must collect before it may flush.
    pub fn token_senders(&self, owner: Rank) -> Vec<Rank> {
        self.readers.iter().copied().filter(|&r| r != owner).collect()
    }

    /// Ranks whose window markers the sink must collect before it reports.
    pub fn window_producers(&self) -> Vec<Rank> {
        match self.sink {
            Some(sink) => self.owners.iter().copied().filter(|&r| r != sink).collect(),
            None => Vec::new(),
        }
    }

    /// Hops a window makes from the token's reader to the sink.
    pub fn forwarding_hops(&self) -> usize {
        match self.kind {
            TopologyKind::Symmetric | TopologyKind::Root => 1,
            TopologyKind::Pipeline => 2,
        }
    }
}
