// Tue Jan 13 2026 - Alex

use crate::config::Config;
use crate::corpus::Corpus;
use crate::engine::result::{RunReport, WorkerReport};
use crate::engine::topology::Layout;
use crate::engine::worker::{Worker, WorkerSettings};
use crate::engine::EngineError;
use crate::output::RunMetrics;
use crate::transport::{LocalFabric, Transport};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Launches one worker thread per rank over an in-process fabric and
/// gathers their reports.
pub struct Engine {
    config: Config,
    layout: Arc<Layout>,
    corpus: Corpus,
    state: EngineState,
}

impl Engine {
    /// Validates the configuration and maps the corpus.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        config.validate()?;
        let corpus = Corpus::open(config.corpus_path()?)?;
        Self::from_parts(config, corpus)
    }

    /// Runs over an already loaded corpus; no path is needed.
    pub fn from_parts(config: Config, corpus: Corpus) -> Result<Self, EngineError> {
        config.validate()?;
        let layout = Layout::build(config.topology, config.workers, config.pipeline_sink)?;
        log::info!(
            "{} topology on {} workers: readers {:?}, owners {:?}, sink {:?}",
            layout.kind,
            layout.world,
            layout.readers,
            layout.owners,
            layout.sink
        );
        Ok(Self {
            config,
            layout: Arc::new(layout),
            corpus,
            state: EngineState::Idle,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn run(&mut self) -> Result<RunReport, EngineError> {
        self.state = EngineState::Running;
        match self.launch() {
            Ok(report) => {
                self.state = EngineState::Completed;
                Ok(report)
            }
            Err(e) => {
                self.state = EngineState::Failed;
                Err(e)
            }
        }
    }

    fn launch(&self) -> Result<RunReport, EngineError> {
        let settings = WorkerSettings::from_config(&self.config)?;
        let bars = self.config.show_progress.then(MultiProgress::new);
        let transports = LocalFabric::build(self.layout.world, self.config.channel_capacity);
        let abort = transports.first().map(|t| t.abort_handle());

        let mut handles = Vec::with_capacity(transports.len());
        for transport in transports {
            let rank = transport.rank();
            let mut worker = Worker::new(transport, self.layout.clone(), self.corpus.clone(), settings);
            if let (Some(bars), true) = (bars.as_ref(), worker.roles().is_reader()) {
                worker = worker.with_progress(bars.add(Self::reader_bar(rank)));
            }

            let spawned = thread::Builder::new()
                .name(format!("rank-{}", rank))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => handles.push((rank, handle)),
                Err(source) => {
                    // the endpoint went down with the closure; unblock the rest
                    if let Some(abort) = abort.as_ref() {
                        abort.abort();
                    }
                    let error = EngineError::Spawn { rank, source };
                    let _ = Self::join(handles);
                    return Err(error);
                }
            }
        }

        let reports = Self::join(handles)?;
        Ok(self.assemble(reports))
    }

    /// Joins every worker and returns the first failure that is not merely a
    /// reaction to another rank aborting.
    fn join(
        handles: Vec<(usize, thread::JoinHandle<Result<WorkerReport, EngineError>>)>,
    ) -> Result<Vec<WorkerReport>, EngineError> {
        let mut reports = Vec::with_capacity(handles.len());
        let mut primary: Option<EngineError> = None;
        let mut secondary: Option<EngineError> = None;

        for (rank, handle) in handles {
            match handle.join() {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) if e.is_secondary() => {
                    secondary.get_or_insert(e);
                }
                Ok(Err(e)) => {
                    primary.get_or_insert(e);
                }
                Err(_) => {
                    primary.get_or_insert(EngineError::WorkerPanicked(rank));
                }
            }
        }

        match primary.or(secondary) {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    fn assemble(&self, mut ranks: Vec<WorkerReport>) -> RunReport {
        ranks.sort_by_key(|r| r.rank);

        let mut metrics = RunMetrics::new();
        for report in &ranks {
            metrics.merge(&report.metrics);
        }

        let (total_windows, keys) = ranks
            .iter()
            .find_map(|r| r.total_windows.map(|t| (t, r.keys.clone())))
            .unwrap_or_default();

        RunReport {
            topology: self.layout.kind,
            workers: self.layout.world,
            window_size: self.config.window_size,
            slide_step: self.config.slide_step,
            total_windows,
            keys,
            metrics,
            ranks,
        }
    }

    fn reader_bar(rank: usize) -> ProgressBar {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix:>8} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_prefix(format!("rank {}", rank));
        bar
    }
}
