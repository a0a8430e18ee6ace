use crate::config::Project;
use crate::gcloud::Gcloud;
use crate::names::Fixtures;
use crate::provision::{run_steps, FailurePolicy, Report, Step};

/// Calls which remove provisioned fixtures, in the order they're issued.
/// Bindings are removed before the pool, as they name principals of the pool.
pub const TEARDOWN_STEPS: &[Step] = &[
    Step::SetProject,
    Step::UnbindOidcSubject,
    Step::UnbindAwsRole,
    Step::DeletePool,
];

/// Remove the impersonation bindings and the pool (with its providers) of `fixtures`.
pub async fn teardown(
    gcloud: &Gcloud,
    project: &Project,
    fixtures: Fixtures,
    policy: FailurePolicy,
) -> Report {
    tracing::info!(pool_id = %fixtures.pool_id, ?policy, "tearing down fixtures");

    let steps = run_steps(gcloud, project, &fixtures, TEARDOWN_STEPS, policy).await;

    Report {
        fixtures,
        audiences: None,
        steps,
    }
}
