// Wed Jan 15 2026 - Alex

use super::args::{Args, Command, PlanArgs, RunArgs};
use crate::config::Config;
use crate::corpus::{Corpus, Partitioner};
use crate::engine::{Engine, EngineError, Layout};
use crate::output::ReportPrinter;
use crate::utils::{format_bytes, LoggingUtils};
use colored::Colorize;
use std::io;
use std::path::Path;

pub struct CommandHandler {
    quiet: bool,
}

impl CommandHandler {
    pub fn new() -> Self {
        Self { quiet: false }
    }

    pub fn execute(&mut self, args: Args) -> anyhow::Result<()> {
        self.quiet = args.quiet;
        if args.no_color {
            colored::control::set_override(false);
        }
        self.setup_logging(&args);

        match args.command {
            Command::Run(run_args) => self.handle_run(run_args),
            Command::Plan(plan_args) => self.handle_plan(plan_args),
        }
    }

    fn setup_logging(&self, args: &Args) {
        LoggingUtils::init_logger(LoggingUtils::level_from_str(&args.log_level));
    }

    fn load_config(path: Option<&Path>) -> Result<Config, EngineError> {
        match path {
            Some(path) => {
                log::info!("loading config from {}", path.display());
                Ok(Config::from_file(path)?)
            }
            None => Ok(Config::default()),
        }
    }

    fn handle_run(&self, args: RunArgs) -> anyhow::Result<()> {
        let config = args.apply(Self::load_config(args.config.as_deref())?);
        let printer = ReportPrinter::new()
            .with_timings(config.timings)
            .with_debug_keys(config.debug_keys);
        let report_path = config.report_path.clone();

        let mut engine = Engine::new(config)?;
        if !self.quiet {
            eprintln!(
                "{} {} ({}) on {} workers",
                "[*]".blue(),
                engine
                    .corpus()
                    .source()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                format_bytes(engine.corpus().len() as u64),
                engine.layout().world
            );
        }

        let report = engine.run()?;
        printer.print(&report, &mut io::stdout().lock())?;

        if let Some(path) = report_path {
            printer.write_json(&report, &path)?;
            if !self.quiet {
                eprintln!("{} Report written to: {}", "[+]".green(), path.display());
            }
        }
        if !self.quiet {
            eprint!("{}", printer.summary(&report));
        }
        Ok(())
    }

    fn handle_plan(&self, args: PlanArgs) -> anyhow::Result<()> {
        let config = args.apply(Self::load_config(args.config.as_deref())?);
        let layout = Layout::build(config.topology, config.workers, config.pipeline_sink)
            .map_err(EngineError::from)?;

        let chunks = match config.corpus_path.as_deref() {
            Some(path) => {
                let corpus = Corpus::open(path).map_err(EngineError::from)?;
                Partitioner::new(layout.readers.len()).split(corpus.as_slice())
            }
            None => Vec::new(),
        };

        println!("{}", format!("{} topology, {} workers", layout.kind, layout.world).cyan().bold());
        println!("{}", "-".repeat(40).cyan());
        for rank in 0..layout.world {
            let roles = layout.roles(rank);
            let chunk = roles
                .reader
                .and_then(|i| chunks.get(i))
                .map(|c| format!("  {}", c))
                .unwrap_or_default();
            println!("  rank {:>3}: {}{}", rank, roles.to_string().yellow(), chunk);
        }
        println!(
            "  windows travel {} hop(s) to {}",
            layout.forwarding_hops(),
            layout
                .sink
                .map(|s| format!("sink rank {}", s))
                .unwrap_or_else(|| "a reduction at rank 0".to_string())
        );
        Ok(())
    }
}

impl Default for CommandHandler {
    fn default() -> Self {
        Self::new()
    }
}
