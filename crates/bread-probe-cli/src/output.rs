//! Output formatting and progress reporting

use bread_probe::{CheckpointOutcome, ScenarioResult, SuiteResults};
use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for scenario results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Progress reporter for scenario runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
    /// Print passed checkpoints too
    pub verbose: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            spinner: None,
            use_color,
            quiet,
            verbose: false,
        }
    }

    /// Also list passed checkpoints
    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Start a spinner while the suite runs
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message(message.to_string());
        self.spinner = Some(pb);
    }

    /// Stop and clear the spinner
    pub fn finish(&self) {
        if let Some(ref pb) = self.spinner {
            pb.finish_and_clear();
        }
    }

    fn line(&self, prefix: &str, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Printed in quiet mode too
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&prefix, message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one scenario: its verdict, then its checkpoints
    pub fn scenario(&self, result: &ScenarioResult) {
        let secs = result.duration.as_secs_f64();
        if result.passed() {
            self.success(&format!("{} ({secs:.2}s)", result.name));
        } else {
            self.failure(&format!("{} ({secs:.2}s)", result.name));
        }
        if let Some(fatal) = &result.fatal {
            self.failure(&format!("  setup: {fatal}"));
        }
        for checkpoint in &result.checkpoints {
            match checkpoint.outcome {
                CheckpointOutcome::Passed if self.verbose => {
                    self.success(&format!("  {}: {}", checkpoint.name, checkpoint.predicate));
                }
                CheckpointOutcome::Passed => {}
                CheckpointOutcome::Warned => self.warning(&format!(
                    "  {}: {} (observed: {})",
                    checkpoint.name, checkpoint.predicate, checkpoint.observed
                )),
                CheckpointOutcome::Failed => {
                    let kind = checkpoint
                        .failure
                        .map_or_else(String::new, |k| format!("[{k}] "));
                    self.failure(&format!(
                        "  {kind}{}: expected {}, observed {}",
                        checkpoint.name, checkpoint.predicate, checkpoint.observed
                    ));
                }
            }
        }
    }

    /// Print every scenario and the summary line
    pub fn report(&self, results: &SuiteResults) {
        self.header(&format!("Run {}", results.run_id));
        for scenario in &results.scenarios {
            self.scenario(scenario);
        }
        let warnings = results
            .scenarios
            .iter()
            .map(ScenarioResult::warning_count)
            .sum();
        self.summary(
            results.passed_count(),
            results.failed_count(),
            warnings,
            results.duration,
        );
    }

    /// Print the summary line
    pub fn summary(&self, passed: usize, failed: usize, warnings: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");
        let total = passed + failed;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let warn_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} warnings)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                warn_style.apply_to(warnings)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {warnings} warnings)"
            ));
        }
    }
}
