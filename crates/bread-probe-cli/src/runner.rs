//! Scenario runner: layered configuration, browser lifecycle, reporting

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter};
use bread_probe::{Harness, HarnessConfig, ProbeError, ScenarioKind, SuiteResults};

/// Effective harness configuration: defaults, then the YAML file, then
/// environment and flags (clap folds the environment into `args`).
pub fn harness_config(args: &RunArgs) -> CliResult<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::from_yaml_file(path)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?,
        None => HarnessConfig::default(),
    };

    if let Some(url) = &args.base_url {
        config.base_url.clone_from(url);
    }
    if args.headed {
        config.headless = false;
    }
    if args.jobs.is_some() {
        config.jobs = args.jobs;
    }
    if let Some(mode) = args.creation_mode {
        config.creation_mode = mode.into();
    }
    if let Some(policy) = args.invalid_inputs {
        config.invalid_input_policy = policy.into();
    }
    if let Some(ms) = args.settle_timeout {
        config.settle_timeout_ms = ms;
    }
    if let Some(ms) = args.attempt_timeout {
        config.attempt_timeout_ms = ms;
    }
    if let Some(path) = &args.chromium {
        config.chromium_path = Some(path.to_string_lossy().into_owned());
    }
    if args.no_sandbox {
        config.sandbox = false;
    }

    config.validate()?;
    Ok(config)
}

/// Runs the selected scenarios and reports them
#[derive(Debug)]
pub struct ScenarioRunner {
    config: CliConfig,
    reporter: ProgressReporter,
}

impl ScenarioRunner {
    /// Create a new runner
    #[must_use]
    pub fn new(config: CliConfig) -> Self {
        let reporter =
            ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet())
                .with_verbose(config.verbosity.is_verbose());
        Self { config, reporter }
    }

    /// Scenarios selected by `filter`
    ///
    /// # Errors
    ///
    /// Returns an error when the filter selects nothing
    pub fn select(filter: Option<&str>) -> CliResult<Vec<ScenarioKind>> {
        let kinds = ScenarioKind::select(filter);
        if kinds.is_empty() {
            return Err(CliError::invalid_argument(format!(
                "no scenario matches filter {:?}",
                filter.unwrap_or_default()
            )));
        }
        Ok(kinds)
    }

    /// Print the scenario catalogue to stdout
    pub fn list() {
        for kind in ScenarioKind::ALL {
            println!("{:<14} {}", kind.name(), kind.description());
        }
    }

    /// Run the scenarios `args` selects; `Ok` only when every one passed
    pub async fn run(&mut self, args: &RunArgs) -> CliResult<SuiteResults> {
        let kinds = Self::select(args.filter.as_deref())?;
        let harness = Harness::new(harness_config(args)?)?;

        self.reporter.info(&format!(
            "{} scenario(s) against {}",
            kinds.len(),
            harness.config().base_url
        ));
        self.reporter
            .start_spinner(&format!("running {}", names(&kinds)));
        let results = execute(&harness, &kinds).await;
        self.reporter.finish();
        let results = results?;

        match self.config.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&results).map_err(ProbeError::from)?;
                println!("{json}");
            }
            OutputFormat::Text => self.reporter.report(&results),
        }

        if results.all_passed() {
            Ok(results)
        } else {
            Err(CliError::test_execution(format!(
                "{} of {} scenario(s) failed",
                results.failed_count(),
                results.total()
            )))
        }
    }
}

fn names(kinds: &[ScenarioKind]) -> String {
    kinds
        .iter()
        .map(ScenarioKind::name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(feature = "browser")]
async fn execute(harness: &Harness, kinds: &[ScenarioKind]) -> CliResult<SuiteResults> {
    let browser = bread_probe::Browser::launch(harness.config().browser_config()).await?;
    let results = harness.run(&browser, kinds).await;
    if let Err(e) = browser.close().await {
        tracing::warn!(error = %e, "browser did not shut down cleanly");
    }
    Ok(results)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn execute(_harness: &Harness, _kinds: &[ScenarioKind]) -> CliResult<SuiteResults> {
    Err(ProbeError::BrowserUnavailable.into())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{CreationModeArg, InvalidInputsArg};
    use bread_probe::{CreationMode, InvalidInputPolicy};
    use std::io::Write;

    mod harness_config_tests {
        use super::*;

        #[test]
        fn test_defaults_without_flags() {
            let config = harness_config(&RunArgs::default()).unwrap();
            assert_eq!(config, HarnessConfig::default());
        }

        #[test]
        fn test_flags_override_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(
                file,
                "base_url: http://from-file:8001\nsettle_timeout_ms: 4000\ncreation_mode: api"
            )
            .unwrap();

            let args = RunArgs {
                config: Some(file.path().to_path_buf()),
                base_url: Some("http://from-flag:9000".into()),
                invalid_inputs: Some(InvalidInputsArg::Warn),
                headed: true,
                no_sandbox: true,
                jobs: Some(2),
                ..RunArgs::default()
            };
            let config = harness_config(&args).unwrap();

            assert_eq!(config.base_url, "http://from-flag:9000");
            assert_eq!(config.settle_timeout_ms, 4000);
            assert_eq!(config.creation_mode, CreationMode::Api);
            assert_eq!(config.invalid_input_policy, InvalidInputPolicy::Warn);
            assert!(!config.headless);
            assert!(!config.sandbox);
            assert_eq!(config.jobs, Some(2));
        }

        #[test]
        fn test_flag_beats_file_creation_mode() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            writeln!(file, "creation_mode: api").unwrap();
            let args = RunArgs {
                config: Some(file.path().to_path_buf()),
                creation_mode: Some(CreationModeArg::Ui),
                ..RunArgs::default()
            };
            assert_eq!(harness_config(&args).unwrap().creation_mode, CreationMode::Ui);
        }

        #[test]
        fn test_missing_file_is_config_error() {
            let args = RunArgs {
                config: Some("/nonexistent/bread.yaml".into()),
                ..RunArgs::default()
            };
            let err = harness_config(&args).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }));
        }

        #[test]
        fn test_zero_timeout_rejected() {
            let args = RunArgs {
                attempt_timeout: Some(0),
                ..RunArgs::default()
            };
            assert!(harness_config(&args).is_err());
        }
    }

    mod selection_tests {
        use super::*;

        #[test]
        fn test_select_all() {
            assert_eq!(ScenarioRunner::select(None).unwrap().len(), 4);
        }

        #[test]
        fn test_select_nothing_is_error() {
            let err = ScenarioRunner::select(Some("checkout")).unwrap_err();
            assert!(err.to_string().contains("checkout"));
        }

        #[test]
        fn test_names() {
            assert_eq!(names(&[ScenarioKind::Auth, ScenarioKind::Crud]), "auth, crud");
        }
    }
}
