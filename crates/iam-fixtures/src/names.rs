/// Location of every pool and provider created by this tool.
pub const LOCATION: &str = "global";

/// Role granted to federated principals on the service account.
pub const WORKLOAD_IDENTITY_USER_ROLE: &str = "roles/iam.workloadIdentityUser";

/// Identifiers of the fixtures of a single run, all derived from one suffix.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Fixtures {
    pub suffix: String,
    pub pool_id: String,
    pub oidc_provider_id: String,
    pub aws_provider_id: String,
}

impl Fixtures {
    pub fn from_suffix(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            pool_id: format!("pool-{suffix}"),
            oidc_provider_id: format!("oidc-{suffix}"),
            aws_provider_id: format!("aws-{suffix}"),
        }
    }
}

/// Audiences which external tokens must assert to be exchanged
/// against the OIDC and AWS providers.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Audiences {
    pub oidc: String,
    pub aws: String,
}

impl Audiences {
    pub fn new(project_number: &str, fixtures: &Fixtures) -> Self {
        Self {
            oidc: audience(project_number, &fixtures.pool_id, &fixtures.oidc_provider_id),
            aws: audience(project_number, &fixtures.pool_id, &fixtures.aws_provider_id),
        }
    }
}

fn pool_resource(project_number: &str, pool_id: &str) -> String {
    format!(
        "//iam.googleapis.com/projects/{project_number}/locations/{LOCATION}/workloadIdentityPools/{pool_id}"
    )
}

/// Full resource name of a provider, as used for the STS audience.
pub fn audience(project_number: &str, pool_id: &str, provider_id: &str) -> String {
    format!(
        "{}/providers/{provider_id}",
        pool_resource(project_number, pool_id)
    )
}

/// Principal of a single OIDC subject within the pool.
pub fn subject_principal(project_number: &str, pool_id: &str, subject: &str) -> String {
    format!(
        "principal:{}/subject/{subject}",
        pool_resource(project_number, pool_id)
    )
}

/// Principal set of all identities which assumed the given AWS role.
pub fn aws_role_principal_set(
    project_number: &str,
    pool_id: &str,
    aws_account_id: &str,
    aws_role_name: &str,
) -> String {
    format!(
        "principalSet:{}/attribute.aws_role/arn:aws:sts::{aws_account_id}:assumed-role/{aws_role_name}",
        pool_resource(project_number, pool_id)
    )
}
