pub const DEFAULT_PROJECT_ID: &str = "stellar-day-254222";
pub const DEFAULT_PROJECT_NUMBER: &str = "79992041559";
pub const DEFAULT_AWS_ACCOUNT_ID: &str = "077071391996";
pub const DEFAULT_AWS_ROLE_NAME: &str = "ci-python-test";
pub const DEFAULT_SERVICE_ACCOUNT: &str = "kokoro@stellar-day-254222.iam.gserviceaccount.com";
pub const DEFAULT_SUBJECT: &str = "104692443208068386138";
pub const DEFAULT_ISSUER_URI: &str = "https://accounts.google.com";

/// Cloud project and external identities against which fixtures are provisioned.
#[derive(clap::Args, Clone, Debug, serde::Serialize)]
pub struct Project {
    /// Google Cloud project which owns the workload identity pool.
    #[clap(long = "project-id", env = "IAMF_PROJECT_ID", default_value = DEFAULT_PROJECT_ID)]
    pub project_id: String,
    /// Numeric identifier of the project, used in resource names and audiences.
    #[clap(
        long = "project-number",
        env = "IAMF_PROJECT_NUMBER",
        default_value = DEFAULT_PROJECT_NUMBER
    )]
    pub project_number: String,
    /// AWS account trusted by the AWS provider.
    #[clap(
        long = "aws-account-id",
        env = "IAMF_AWS_ACCOUNT_ID",
        default_value = DEFAULT_AWS_ACCOUNT_ID
    )]
    pub aws_account_id: String,
    /// AWS role whose assumed sessions may impersonate the service account.
    #[clap(
        long = "aws-role-name",
        env = "IAMF_AWS_ROLE_NAME",
        default_value = DEFAULT_AWS_ROLE_NAME
    )]
    pub aws_role_name: String,
    /// Service account which federated principals are permitted to impersonate.
    #[clap(
        long = "service-account",
        env = "IAMF_SERVICE_ACCOUNT",
        default_value = DEFAULT_SERVICE_ACCOUNT
    )]
    pub service_account: String,
    /// OIDC subject which may impersonate the service account.
    #[clap(long = "subject", env = "IAMF_SUBJECT", default_value = DEFAULT_SUBJECT)]
    pub subject: String,
    /// Issuer trusted by the OIDC provider.
    #[clap(long = "issuer-uri", env = "IAMF_ISSUER_URI", default_value = DEFAULT_ISSUER_URI)]
    pub issuer_uri: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            project_id: DEFAULT_PROJECT_ID.to_string(),
            project_number: DEFAULT_PROJECT_NUMBER.to_string(),
            aws_account_id: DEFAULT_AWS_ACCOUNT_ID.to_string(),
            aws_role_name: DEFAULT_AWS_ROLE_NAME.to_string(),
            service_account: DEFAULT_SERVICE_ACCOUNT.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
            issuer_uri: DEFAULT_ISSUER_URI.to_string(),
        }
    }
}
