//! Provisions workload identity federation fixtures (a pool, an OIDC provider,
//! and an AWS provider) through gcloud, and grants federated principals the
//! right to impersonate a service account.
use anyhow::Context;
use std::io::Write;

pub mod commands;
pub mod config;
pub mod gcloud;
pub mod names;
pub mod provision;
pub mod suffix;
pub mod teardown;

pub use provision::{FailurePolicy, Report, Step, StepOutcome};
use suffix::{generate_suffix, validate_suffix};

#[derive(clap::Parser, Debug, serde::Serialize)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Path of the gcloud binary.
    #[clap(long = "gcloud", env = "IAMF_GCLOUD", default_value = gcloud::GCLOUD)]
    pub gcloud: String,
    /// Log gcloud commands without running them.
    #[clap(long = "dry-run", global = true)]
    pub dry_run: bool,
    /// How to format output.
    #[clap(long, short, value_enum, global = true, default_value = "text")]
    pub output: OutputType,

    #[clap(subcommand)]
    pub mode: Mode,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputType {
    /// Print labeled audience lines.
    Text,
    /// Print the run report as a JSON document.
    Json,
}

#[derive(clap::Subcommand, Debug, serde::Serialize)]
#[clap(rename_all = "kebab-case")]
pub enum Mode {
    /// Create a pool with OIDC and AWS providers, and grant impersonation to their principals.
    Provision(ProvisionArgs),
    /// Remove the bindings and pool created by a previous provision.
    Teardown(TeardownArgs),
}

#[derive(clap::Args, Debug, serde::Serialize)]
pub struct ProvisionArgs {
    /// Suffix of fixture identifiers. A random suffix is generated if not set.
    #[clap(long = "suffix")]
    pub suffix: Option<String>,
    /// Behavior when a gcloud call fails.
    #[clap(long = "on-failure", value_enum, default_value = "halt")]
    pub on_failure: FailurePolicy,
    #[clap(flatten)]
    pub project: config::Project,
}

#[derive(clap::Args, Debug, serde::Serialize)]
pub struct TeardownArgs {
    /// Suffix of the fixtures to remove, as printed by provision.
    #[clap(long = "suffix")]
    pub suffix: String,
    /// Behavior when a gcloud call fails.
    #[clap(long = "on-failure", value_enum, default_value = "continue")]
    pub on_failure: FailurePolicy,
    #[clap(flatten)]
    pub project: config::Project,
}

/// Run `mode` against `gcloud`, writing output to `out` once all steps complete.
pub async fn execute<W: Write>(
    mode: Mode,
    output: OutputType,
    gcloud: &gcloud::Gcloud,
    out: &mut W,
) -> anyhow::Result<Report> {
    let report = match mode {
        Mode::Provision(ProvisionArgs {
            suffix,
            on_failure,
            project,
        }) => {
            let suffix = match suffix {
                Some(suffix) => {
                    validate_suffix(&suffix)?;
                    suffix
                }
                None => generate_suffix(&mut rand::thread_rng()),
            };
            let fixtures = names::Fixtures::from_suffix(&suffix);

            provision::provision(gcloud, &project, fixtures, on_failure).await
        }
        Mode::Teardown(TeardownArgs {
            suffix,
            on_failure,
            project,
        }) => {
            validate_suffix(&suffix)?;
            let fixtures = names::Fixtures::from_suffix(&suffix);

            teardown::teardown(gcloud, &project, fixtures, on_failure).await
        }
    };

    match output {
        OutputType::Text => report.write_text(out).context("failed to write output")?,
        OutputType::Json => report.write_json(out).context("failed to write output")?,
    }
    out.flush().context("failed to flush output")?;
    report.log_summary();

    Ok(report)
}

/// Run the CLI, returning whether every gcloud call succeeded.
pub async fn run(cli: Cli) -> anyhow::Result<bool> {
    let args = serde_json::to_value(&cli)?;
    tracing::debug!(%args, "started");

    let run_cmd_fn = if cli.dry_run {
        gcloud::dry_run_cmd_fn()
    } else {
        gcloud::spawning_run_cmd_fn()
    };
    let gcloud = gcloud::Gcloud::new(cli.gcloud, run_cmd_fn);

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("caught shutdown signal, stopping...");
            }
            Err(err) => {
                tracing::error!(?err, "error subscribing to shutdown signal");
                std::future::pending::<()>().await;
            }
        }
    };

    let report = until_shutdown(
        execute(cli.mode, cli.output, &gcloud, &mut std::io::stdout()),
        shutdown,
    )
    .await?;

    Ok(report.succeeded())
}

/// Drive `fut` to completion unless `shutdown` resolves first. Then `fut` is
/// dropped, and a gcloud process it was awaiting is sent SIGTERM.
pub async fn until_shutdown<T, F, S>(fut: F, shutdown: S) -> anyhow::Result<T>
where
    F: std::future::Future<Output = anyhow::Result<T>>,
    S: std::future::Future<Output = ()>,
{
    tokio::select! {
        biased;
        result = fut => result,
        () = shutdown => anyhow::bail!("interrupted before all gcloud calls completed"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_until_shutdown() {
        let done = until_shutdown(async { Ok(true) }, std::future::pending()).await;
        assert!(done.unwrap());

        let err = until_shutdown(std::future::pending::<anyhow::Result<()>>(), async {})
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "interrupted before all gcloud calls completed"
        );
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_command() {
        // Sleep for six hours.
        let mut cmd = commands::Command::new("sleep");
        cmd.arg("21600");

        // The command is spawned on first poll, and dropped once shutdown
        // resolves on the next.
        let err = until_shutdown(commands::run(cmd, "create-pool"), tokio::task::yield_now())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "interrupted before all gcloud calls completed"
        );
    }
}
