//! `volsmoke run` command handler

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use volsmoke_core::client::StorageClient;
use volsmoke_core::config::VolsmokeConfig;
use volsmoke_docker::{DockerVolumeClient, DockerVolumeConfig};
use volsmoke_harness::{
    HarnessConfig, InMemoryStorageClient, LifecycleHarness, LifecycleReport, Verdict,
};

use crate::cli::{Backend, RunArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// The report is rendered before the verdict is turned into an error,
/// so a failing run still prints what happened.
pub async fn execute(
    args: RunArgs,
    config: VolsmokeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let harness_config = build_harness_config(&config, &args)?;

    let mut volume = config.docker.volume_name.clone();
    if args.unique {
        volume = unique_volume_name(&volume);
    }

    info!(
        backend = args.backend.as_str(),
        volume = volume.as_str(),
        "starting lifecycle run"
    );

    let report = match args.backend {
        Backend::Memory => {
            let client = InMemoryStorageClient::new()
                .with_volume_name(volume.as_str())
                .with_visibility_lag(args.simulate_lag);
            run_lifecycle(Arc::new(client), harness_config).await?
        }
        Backend::Docker => {
            let mut docker_config = DockerVolumeConfig::from_core(&config.docker);
            docker_config.volume_name = volume.clone();

            let client = DockerVolumeClient::connect(docker_config)?;
            client.ping().await?;
            run_lifecycle(Arc::new(client), harness_config).await?
        }
    };

    let output = RunOutput {
        backend: args.backend.as_str(),
        volume,
        report,
    };
    writer.render(&output)?;

    output.report.into_result()?;
    Ok(())
}

/// Merge config sections with CLI flag overrides and validate.
pub fn build_harness_config(
    config: &VolsmokeConfig,
    args: &RunArgs,
) -> Result<HarnessConfig, CliError> {
    let mut harness = HarnessConfig::from_core(&config.convergence, &config.lifecycle)?;

    if let Some(payload) = &args.payload {
        harness.payload = payload.clone();
    }
    if let Some(target) = &args.target {
        harness.target_name = target.clone();
    }
    if let Some(attempts) = args.attempts {
        harness.max_attempts = attempts;
    }
    if let Some(delay_ms) = args.delay_ms {
        harness.poll_delay_ms = delay_ms;
    }
    if args.skip_cleanup {
        harness.skip_cleanup = true;
    }

    harness.validate()?;
    Ok(harness)
}

async fn run_lifecycle<S: StorageClient>(
    client: Arc<S>,
    config: HarnessConfig,
) -> Result<LifecycleReport, CliError> {
    let harness = LifecycleHarness::builder()
        .client(client)
        .config(config)
        .build()?;
    Ok(harness.run().await)
}

fn unique_volume_name(base: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{base}-{}", &id[..8])
}

/// Rendered result of one lifecycle run.
#[derive(Serialize)]
pub struct RunOutput {
    /// Backend the run used
    pub backend: &'static str,
    /// Volume name
    pub volume: String,
    /// Lifecycle report
    #[serde(flatten)]
    pub report: LifecycleReport,
}

impl Render for RunOutput {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Volume Lifecycle (backend: {}, volume: {})",
            self.backend.bold(),
            self.volume
        )?;

        match self.report.baseline {
            Some(count) => writeln!(w, "  Baseline: {count} volume(s)")?,
            None => writeln!(w, "  Baseline: {}", "unavailable".yellow())?,
        }
        writeln!(w)?;

        for step in &self.report.completed {
            writeln!(
                w,
                "  {} {:<14} {:>6} ms",
                "✓".green(),
                step.state.as_str(),
                step.duration_ms
            )?;
        }
        if let Verdict::Aborted { at } = self.report.verdict {
            writeln!(w, "  {} {:<14}", "✗".red(), at.as_str())?;
        }
        writeln!(w)?;

        match self.report.verdict {
            Verdict::Passed => writeln!(
                w,
                "  Result: {} ({} ms)",
                "PASSED".green().bold(),
                self.report.duration_ms
            )?,
            Verdict::Aborted { at } => writeln!(
                w,
                "  Result: {} at {} ({} ms)",
                "ABORTED".red().bold(),
                at,
                self.report.duration_ms
            )?,
        }
        if let Some(failure) = &self.report.failure {
            writeln!(w, "  Failure: {}", failure.to_string().red())?;
        }

        let cleanup = &self.report.cleanup;
        if cleanup.skipped {
            writeln!(w, "  Cleanup: {}", "skipped".yellow())?;
        } else if cleanup.errors.is_empty() {
            writeln!(w, "  Cleanup: {}", "clean".green())?;
        } else {
            writeln!(
                w,
                "  Cleanup: {} error(s) ignored",
                cleanup.errors.len().to_string().yellow()
            )?;
            for err in &cleanup.errors {
                writeln!(w, "    - {err}")?;
            }
        }

        Ok(())
    }
}
