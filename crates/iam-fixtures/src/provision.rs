use crate::config::Project;
use crate::gcloud::Gcloud;
use crate::names::{self, Audiences, Fixtures};
use std::io::Write;

/// An administrative call issued against the IAM control plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    SetProject,
    CreatePool,
    CreateOidcProvider,
    CreateAwsProvider,
    BindOidcSubject,
    BindAwsRole,
    UnbindOidcSubject,
    UnbindAwsRole,
    DeletePool,
}

/// Calls which provision fixtures, in the order they're issued.
pub const PROVISION_STEPS: &[Step] = &[
    Step::SetProject,
    Step::CreatePool,
    Step::CreateOidcProvider,
    Step::CreateAwsProvider,
    Step::BindOidcSubject,
    Step::BindAwsRole,
];

impl Step {
    /// Stream name under which the step's command output is logged.
    pub fn name(self) -> &'static str {
        match self {
            Step::SetProject => "set-project",
            Step::CreatePool => "create-pool",
            Step::CreateOidcProvider => "create-oidc-provider",
            Step::CreateAwsProvider => "create-aws-provider",
            Step::BindOidcSubject => "bind-oidc-subject",
            Step::BindAwsRole => "bind-aws-role",
            Step::UnbindOidcSubject => "unbind-oidc-subject",
            Step::UnbindAwsRole => "unbind-aws-role",
            Step::DeletePool => "delete-pool",
        }
    }

    async fn issue(
        self,
        gcloud: &Gcloud,
        project: &Project,
        fixtures: &Fixtures,
    ) -> anyhow::Result<()> {
        let stream = self.name();
        let oidc_principal = || {
            names::subject_principal(&project.project_number, &fixtures.pool_id, &project.subject)
        };
        let aws_principal = || {
            names::aws_role_principal_set(
                &project.project_number,
                &fixtures.pool_id,
                &project.aws_account_id,
                &project.aws_role_name,
            )
        };

        match self {
            Step::SetProject => gcloud.set_project(&project.project_id, stream).await,
            Step::CreatePool => gcloud.create_pool(&fixtures.pool_id, stream).await,
            Step::CreateOidcProvider => {
                gcloud
                    .create_oidc_provider(
                        &fixtures.pool_id,
                        &fixtures.oidc_provider_id,
                        &project.issuer_uri,
                        stream,
                    )
                    .await
            }
            Step::CreateAwsProvider => {
                gcloud
                    .create_aws_provider(
                        &fixtures.pool_id,
                        &fixtures.aws_provider_id,
                        &project.aws_account_id,
                        stream,
                    )
                    .await
            }
            Step::BindOidcSubject => {
                gcloud
                    .add_iam_policy_binding(&project.service_account, &oidc_principal(), stream)
                    .await
            }
            Step::BindAwsRole => {
                gcloud
                    .add_iam_policy_binding(&project.service_account, &aws_principal(), stream)
                    .await
            }
            Step::UnbindOidcSubject => {
                gcloud
                    .remove_iam_policy_binding(&project.service_account, &oidc_principal(), stream)
                    .await
            }
            Step::UnbindAwsRole => {
                gcloud
                    .remove_iam_policy_binding(&project.service_account, &aws_principal(), stream)
                    .await
            }
            Step::DeletePool => gcloud.delete_pool(&fixtures.pool_id, stream).await,
        }
    }
}

/// What to do with remaining steps after a step fails.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Skip all remaining steps.
    Halt,
    /// Issue all remaining steps regardless.
    Continue,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepOutcome {
    Succeeded,
    Failed { error: String },
    Skipped,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StepReport {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Report of a provision or teardown run.
#[derive(Debug, serde::Serialize)]
pub struct Report {
    #[serde(flatten)]
    pub fixtures: Fixtures,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audiences: Option<Audiences>,
    pub steps: Vec<StepReport>,
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.outcome, StepOutcome::Succeeded))
    }

    /// Build the report of a provision run. Audiences are reported only
    /// if every step was at least attempted.
    pub fn provisioned(project_number: &str, fixtures: Fixtures, steps: Vec<StepReport>) -> Self {
        let attempted = !steps
            .iter()
            .any(|s| matches!(s.outcome, StepOutcome::Skipped));
        let audiences = attempted.then(|| Audiences::new(project_number, &fixtures));

        Self {
            fixtures,
            audiences,
            steps,
        }
    }

    /// Write labeled audience lines, if there are audiences to report.
    pub fn write_text<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let Some(audiences) = &self.audiences else {
            return Ok(());
        };
        writeln!(w, "OIDC audience: {}", audiences.oidc)?;
        writeln!(w, "AWS audience: {}", audiences.aws)?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, w: &mut W) -> anyhow::Result<()> {
        serde_json::to_writer(&mut *w, self)?;
        w.write_all(b"\n")?;
        Ok(())
    }

    /// Log the outcome of each step.
    pub fn log_summary(&self) {
        for StepReport { step, outcome } in &self.steps {
            match outcome {
                StepOutcome::Succeeded => tracing::info!(step = step.name(), "succeeded"),
                StepOutcome::Failed { error } => {
                    tracing::error!(step = step.name(), %error, "failed")
                }
                StepOutcome::Skipped => tracing::warn!(step = step.name(), "skipped"),
            }
        }
        let failed = self
            .steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Failed { .. }))
            .count();
        tracing::info!(
            suffix = %self.fixtures.suffix,
            steps = self.steps.len(),
            failed,
            "run complete"
        );
    }
}

/// Issue `steps` in order, one at a time, applying `policy` on failure.
pub async fn run_steps(
    gcloud: &Gcloud,
    project: &Project,
    fixtures: &Fixtures,
    steps: &[Step],
    policy: FailurePolicy,
) -> Vec<StepReport> {
    let mut reports = Vec::with_capacity(steps.len());
    let mut halted = false;

    for &step in steps {
        let outcome = if halted {
            StepOutcome::Skipped
        } else {
            match step.issue(gcloud, project, fixtures).await {
                Ok(()) => StepOutcome::Succeeded,
                Err(err) => {
                    tracing::error!(step = step.name(), error = ?err, "step failed");
                    if policy == FailurePolicy::Halt {
                        halted = true;
                    }
                    StepOutcome::Failed {
                        error: format!("{err:#}"),
                    }
                }
            }
        };
        reports.push(StepReport { step, outcome });
    }
    reports
}

/// Provision the pool, both providers, and impersonation bindings for `fixtures`.
pub async fn provision(
    gcloud: &Gcloud,
    project: &Project,
    fixtures: Fixtures,
    policy: FailurePolicy,
) -> Report {
    tracing::info!(
        pool_id = %fixtures.pool_id,
        oidc_provider_id = %fixtures.oidc_provider_id,
        aws_provider_id = %fixtures.aws_provider_id,
        ?policy,
        "provisioning fixtures"
    );
    let steps = run_steps(gcloud, project, &fixtures, PROVISION_STEPS, policy).await;

    Report::provisioned(&project.project_number, fixtures, steps)
}
