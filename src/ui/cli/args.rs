// Wed Jan 15 2026 - Alex

use crate::config::Config;
use crate::engine::TopologyKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "windowed-wordcount")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Sliding-window word counting over a partitioned corpus", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value = "warn")]
    pub log_level: String,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Count windows over a corpus
    Run(RunArgs),
    /// Show role assignment and chunk boundaries without running
    Plan(PlanArgs),
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Corpus file; overrides the config file
    pub corpus: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long)]
    pub window: Option<u64>,

    #[arg(short, long)]
    pub slide: Option<u64>,

    #[arg(short, long, value_enum)]
    pub topology: Option<TopologyKind>,

    /// Run the pipeline without a sink; the total is summed at rank 0
    #[arg(long)]
    pub no_sink: bool,

    #[arg(short = 'n', long)]
    pub workers: Option<usize>,

    /// Batch size in bytes
    #[arg(short, long)]
    pub batch_capacity: Option<usize>,

    #[arg(long)]
    pub scan_threads: Option<usize>,

    #[arg(long)]
    pub channel_capacity: Option<usize>,

    #[arg(long)]
    pub max_in_flight: Option<usize>,

    #[arg(long)]
    pub max_token_len: Option<usize>,

    /// Print the per-key window listing
    #[arg(long)]
    pub debug_keys: bool,

    /// Print timens:<phase>:<nanos> lines
    #[arg(long)]
    pub timings: bool,

    /// Write the full run report as JSON
    #[arg(short, long)]
    pub report: Option<PathBuf>,

    #[arg(long)]
    pub progress: bool,
}

#[derive(Parser, Debug)]
pub struct PlanArgs {
    pub corpus: Option<PathBuf>,

    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    pub topology: Option<TopologyKind>,

    #[arg(long)]
    pub no_sink: bool,

    #[arg(short = 'n', long)]
    pub workers: Option<usize>,
}

impl RunArgs {
    /// Layers the command line over `config`. Flags only ever switch
    /// booleans on.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(ref corpus) = self.corpus {
            config.corpus_path = Some(corpus.clone());
        }
        if let Some(window) = self.window {
            config.window_size = window;
        }
        if let Some(slide) = self.slide {
            config.slide_step = slide;
        }
        if let Some(topology) = self.topology {
            config.topology = topology;
        }
        if self.no_sink {
            config.pipeline_sink = false;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.batch_capacity {
            config.batch_capacity = capacity;
        }
        if let Some(threads) = self.scan_threads {
            config.scan_threads = threads;
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
        if let Some(in_flight) = self.max_in_flight {
            config.max_in_flight = in_flight;
        }
        if let Some(len) = self.max_token_len {
            config.max_token_len = len;
        }
        config.debug_keys |= self.debug_keys;
        config.timings |= self.timings;
        config.show_progress |= self.progress;
        if let Some(ref report) = self.report {
            config.report_path = Some(report.clone());
        }
        config
    }
}

impl PlanArgs {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(ref corpus) = self.corpus {
            config.corpus_path = Some(corpus.clone());
        }
        if let Some(topology) = self.topology {
            config.topology = topology;
        }
        if self.no_sink {
            config.pipeline_sink = false;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        config
    }
}
