//! Run report: counts, elapsed time and output path for one command.

use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RunReport {
    pub found: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errored: usize,
    started: Instant,
    elapsed: Option<Duration>,
    output_path: Option<PathBuf>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            found: 0,
            processed: 0,
            skipped: 0,
            errored: 0,
            started: Instant::now(),
            elapsed: None,
            output_path: None,
        }
    }

    pub fn set_output_path(&mut self, path: PathBuf) {
        self.output_path = Some(path);
    }

    /// Freeze the elapsed time. Later calls keep the first value.
    pub fn finish(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    /// `Total: N | Processed: P | Skipped: S`, plus `| Failed: F` when anything failed.
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "Total: {} | Processed: {} | Skipped: {}",
            self.found, self.processed, self.skipped
        );
        if self.errored > 0 {
            line.push_str(&format!(" | Failed: {}", self.errored));
        }
        line
    }

    /// Summary plus timing and output location, for the end of a run.
    pub fn closing_line(&self) -> String {
        let mut line = format!(
            "{} | Elapsed: {:.1}s",
            self.summary_line(),
            self.elapsed().as_secs_f64()
        );
        if let Some(path) = &self.output_path {
            line.push_str(&format!(" | Output: {}", path.display()));
        }
        line
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::start()
    }
}
