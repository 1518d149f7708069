// Tue Jan 13 2026 - Alex

use indicatif::ProgressBar;
use log::LevelFilter;

pub struct LoggingUtils;

impl LoggingUtils {
    pub fn init_logger(level: LevelFilter) {
        // A second init (tests, embedding) is not an error worth surfacing.
        let _ = env_logger::Builder::new()
            .filter_level(level)
            .format_timestamp(None)
            .format_target(true)
            .try_init();
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }
}

const PROGRESS_STEP: usize = 10 * 1024 * 1024;

/// Reports how far a reader got through its chunk, one line per 10 MiB.
pub struct ScanProgress {
    rank: usize,
    total: usize,
    current: usize,
    last_step: usize,
    bar: Option<ProgressBar>,
}

impl ScanProgress {
    pub fn new(rank: usize, total: usize) -> Self {
        log::debug!("rank {} scanning {} bytes", rank, total);
        Self {
            rank,
            total,
            current: 0,
            last_step: 0,
            bar: None,
        }
    }

    pub fn with_bar(mut self, bar: ProgressBar) -> Self {
        bar.set_length(self.total as u64);
        self.bar = Some(bar);
        self
    }

    pub fn set(&mut self, scanned: usize) {
        self.current = scanned;
        let step = scanned / PROGRESS_STEP;
        if step > self.last_step {
            self.last_step = step;
            log::debug!("rank {} read {} MBytes", self.rank, step * 10);
            if let Some(ref bar) = self.bar {
                bar.set_position(scanned as u64);
            }
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.set_position(self.current as u64);
            bar.finish_with_message("done");
        }
        log::debug!("rank {} finished scanning ({}/{})", self.rank, self.current, self.total);
    }
}
