// Tue Jan 13 2026 - Alex

use crate::engine::topology::{Layout, TopologyKind};
use crate::transport::wire;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_WINDOW_SIZE: u64 = 10;
pub const DEFAULT_SLIDE_STEP: u64 = 5;
pub const DEFAULT_BATCH_CAPACITY: usize = 5 * 1024;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_MAX_TOKEN_LEN: usize = 34;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no corpus path given")]
    MissingCorpus,
    #[error("window size must be greater than 0")]
    ZeroWindow,
    #[error("slide step must be greater than 0")]
    ZeroSlide,
    #[error("slide step {slide} is larger than window size {window}")]
    SlideExceedsWindow { window: u64, slide: u64 },
    #[error("worker count must be greater than 0")]
    ZeroWorkers,
    #[error("scan_threads must be greater than 0")]
    ZeroScanThreads,
    #[error("channel_capacity must be greater than 0")]
    ZeroChannelCapacity,
    #[error("max_in_flight must be greater than 0")]
    ZeroInFlight,
    #[error("max token length {0} must be between 1 and 255")]
    InvalidTokenLength(usize),
    #[error("batch capacity {capacity} cannot hold a single frame of {required} bytes")]
    BatchTooSmall { capacity: usize, required: usize },
    #[error("{topology} topology needs at least {required} workers, got {workers}")]
    NotEnoughWorkers {
        topology: TopologyKind,
        workers: usize,
        required: usize,
    },
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus_path: Option<PathBuf>,
    pub window_size: u64,
    pub slide_step: u64,
    pub topology: TopologyKind,
    pub pipeline_sink: bool,
    pub batch_capacity: usize,
    pub workers: usize,
    pub scan_threads: usize,
    pub channel_capacity: usize,
    pub max_in_flight: usize,
    pub max_token_len: usize,
    pub debug_keys: bool,
    pub timings: bool,
    pub show_progress: bool,
    pub report_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_path: None,
            window_size: DEFAULT_WINDOW_SIZE,
            slide_step: DEFAULT_SLIDE_STEP,
            topology: TopologyKind::Symmetric,
            pipeline_sink: true,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            workers: num_cpus::get(),
            scan_threads: 1,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            max_token_len: DEFAULT_MAX_TOKEN_LEN,
            debug_keys: false,
            timings: false,
            show_progress: false,
            report_path: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_corpus<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.corpus_path = Some(path.into());
        self
    }

    pub fn with_window(mut self, window_size: u64, slide_step: u64) -> Self {
        self.window_size = window_size;
        self.slide_step = slide_step;
        self
    }

    pub fn with_topology(mut self, topology: TopologyKind) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_pipeline_sink(mut self, sink: bool) -> Self {
        self.pipeline_sink = sink;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = capacity;
        self
    }

    pub fn with_scan_threads(mut self, threads: usize) -> Self {
        self.scan_threads = threads;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_debug_keys(mut self, debug: bool) -> Self {
        self.debug_keys = debug;
        self
    }

    /// Largest single frame a batch buffer must be able to hold.
    pub fn max_frame_len(&self) -> usize {
        wire::window_frame_len(self.max_token_len)
            .max(wire::token_frame_len(self.max_token_len))
            .max(wire::MARKER_FRAME_LEN)
    }

    /// Checks everything that can be checked before a corpus is opened.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.slide_step == 0 {
            return Err(ConfigError::ZeroSlide);
        }
        if self.slide_step > self.window_size {
            return Err(ConfigError::SlideExceedsWindow {
                window: self.window_size,
                slide: self.slide_step,
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.scan_threads == 0 {
            return Err(ConfigError::ZeroScanThreads);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        if self.max_token_len == 0 || self.max_token_len > wire::MAX_KEY_LEN {
            return Err(ConfigError::InvalidTokenLength(self.max_token_len));
        }
        let required = self.max_frame_len();
        if self.batch_capacity < required {
            return Err(ConfigError::BatchTooSmall {
                capacity: self.batch_capacity,
                required,
            });
        }
        Layout::build(self.topology, self.workers, self.pipeline_sink)?;
        Ok(())
    }

    pub fn corpus_path(&self) -> Result<&Path, ConfigError> {
        self.corpus_path.as_deref().ok_or(ConfigError::MissingCorpus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::new().with_workers(4);
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 10);
        assert_eq!(config.slide_step, 5);
    }

    #[test]
    fn test_slide_larger_than_window_rejected() {
        let config = Config::new().with_workers(2).with_window(3, 4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SlideExceedsWindow { window: 3, slide: 4 })
        ));
    }

    #[test]
    fn test_slide_equal_to_window_accepted() {
        let config = Config::new().with_workers(2).with_window(4, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            Config::new().with_workers(0).validate(),
            Err(ConfigError::ZeroWorkers)
        ));
        assert!(matches!(
            Config::new().with_workers(1).with_window(0, 0).validate(),
            Err(ConfigError::ZeroWindow)
        ));
        assert!(matches!(
            Config::new().with_workers(1).with_window(3, 0).validate(),
            Err(ConfigError::ZeroSlide)
        ));
    }

    #[test]
    fn test_batch_capacity_must_hold_a_frame() {
        let config = Config::new().with_workers(2).with_batch_capacity(8);
        assert!(matches!(config.validate(), Err(ConfigError::BatchTooSmall { .. })));
    }

    #[test]
    fn test_topology_worker_requirements() {
        let root = Config::new().with_topology(TopologyKind::Root).with_workers(1);
        assert!(matches!(root.validate(), Err(ConfigError::NotEnoughWorkers { .. })));

        let pipeline = Config::new()
            .with_topology(TopologyKind::Pipeline)
            .with_workers(2);
        assert!(matches!(pipeline.validate(), Err(ConfigError::NotEnoughWorkers { .. })));
        assert!(pipeline.with_pipeline_sink(false).validate().is_ok());
    }

    #[test]
    fn test_missing_corpus() {
        assert!(matches!(Config::new().corpus_path(), Err(ConfigError::MissingCorpus)));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"window_size": 3, "slide_step": 2, "topology": "pipeline"}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.window_size, 3);
        assert_eq!(config.slide_step, 2);
        assert_eq!(config.topology, TopologyKind::Pipeline);
        assert_eq!(config.batch_capacity, DEFAULT_BATCH_CAPACITY);
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(Config::from_file(file.path()), Err(ConfigError::Parse { .. })));
    }
}
