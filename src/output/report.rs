// Tue Jan 13 2026 - Alex

use crate::engine::result::RunReport;
use crate::output::metrics::Phase;
use crate::utils::{format_bytes, format_duration};
use colored::Colorize;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Renders a finished run: the scalar result on stdout, optional timing and
/// key listings, a human summary on stderr and an optional JSON file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportPrinter {
    timings: bool,
    debug_keys: bool,
}

impl ReportPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timings(mut self, timings: bool) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_debug_keys(mut self, debug_keys: bool) -> Self {
        self.debug_keys = debug_keys;
        self
    }

    /// Everything that goes to stdout, in order.
    pub fn render(&self, report: &RunReport) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Total number of processed windows: {}\n",
            report.total_windows
        ));

        if self.timings {
            for (phase, nanos) in report.metrics.timings() {
                out.push_str(&format!("timens:{}:{}\n", phase, nanos));
            }
        }

        if self.debug_keys {
            for entry in &report.keys {
                out.push_str(&format!("{},{}\n", entry.key, entry.windows));
            }
        }

        out
    }

    pub fn print<W: Write>(&self, report: &RunReport, out: &mut W) -> io::Result<()> {
        out.write_all(self.render(report).as_bytes())?;
        out.flush()
    }

    pub fn summary(&self, report: &RunReport) -> String {
        let metrics = &report.metrics;
        let mut s = String::new();

        s.push_str(&format!("{}\n", "Run Summary".cyan().bold()));
        s.push_str(&format!("{}\n", "-".repeat(40).cyan()));
        s.push_str(&format!(
            "  Topology: {} ({} workers)\n",
            report.topology.to_string().yellow(),
            report.workers
        ));
        s.push_str(&format!(
            "  Window: size {} slide {}\n",
            report.window_size, report.slide_step
        ));
        s.push_str(&format!(
            "  Scanned: {}\n",
            format_bytes(metrics.bytes_scanned)
        ));
        s.push_str(&format!(
            "  Tokens: {} read, {} local, {} sent in {} batches\n",
            metrics.tokens_read, metrics.tokens_routed_local, metrics.tokens_sent, metrics.batches_sent
        ));
        s.push_str(&format!(
            "  Windows: {} crossings, {} flushed, {} forwarded\n",
            metrics.windows_emitted, metrics.windows_flushed, metrics.windows_forwarded
        ));
        s.push_str(&format!(
            "  Total windows: {}\n",
            report.total_windows.to_string().green()
        ));
        s.push_str(&format!(
            "  Elapsed: {}\n",
            format_duration(metrics.phase(Phase::Total))
        ));
        s
    }

    pub fn write_json<P: AsRef<Path>>(&self, report: &RunReport, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::result::KeyCount;
    use crate::engine::topology::TopologyKind;
    use crate::output::RunMetrics;
    use std::time::Duration;

    fn sample() -> RunReport {
        let mut metrics = RunMetrics::new();
        metrics.add_time(Phase::Total, Duration::from_nanos(1500));
        metrics.add_time(Phase::Network, Duration::from_nanos(300));
        RunReport {
            topology: TopologyKind::Symmetric,
            workers: 2,
            window_size: 3,
            slide_step: 2,
            total_windows: 2,
            keys: vec![KeyCount {
                key: "a".to_string(),
                windows: 2,
            }],
            metrics,
            ranks: Vec::new(),
        }
    }

    #[test]
    fn test_render_total_only() {
        let out = ReportPrinter::new().render(&sample());
        assert_eq!(out, "Total number of processed windows: 2\n");
    }

    #[test]
    fn test_render_timings_and_keys() {
        let out = ReportPrinter::new()
            .with_timings(true)
            .with_debug_keys(true)
            .render(&sample());
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[1], "timens:total:1500");
        assert_eq!(lines[3], "timens:network:300");
        assert_eq!(lines.last(), Some(&"a,2"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        ReportPrinter::new().write_json(&sample(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["total_windows"], 2);
        assert_eq!(value["topology"], "symmetric");
        assert_eq!(value["metrics"]["timings"]["total"], 1500);
    }
}
