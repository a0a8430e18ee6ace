use crate::commands::{self, Command};
use crate::names::{LOCATION, WORKLOAD_IDENTITY_USER_ROLE};
use futures::future::BoxFuture;
use futures::FutureExt;

/// The name of the gcloud binary, resolved from the PATH.
pub const GCLOUD: &str = "gcloud";

pub const POOL_DESCRIPTION: &str = "Test pool";
pub const POOL_DISPLAY_NAME: &str = "Test pool for Rust";
pub const OIDC_ATTRIBUTE_MAPPING: &str = "google.subject=assertion.sub";

/// Type-erased function which runs a prepared Command under a named stream.
pub type RunCmdFn =
    Box<dyn Fn(Command, &'static str) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// RunCmdFn which spawns each command.
pub fn spawning_run_cmd_fn() -> RunCmdFn {
    Box::new(|cmd, stream| commands::run(cmd, stream).boxed())
}

/// RunCmdFn which only logs each command, for --dry-run.
pub fn dry_run_cmd_fn() -> RunCmdFn {
    Box::new(|cmd, stream| commands::dry_run(cmd, stream).boxed())
}

/// Client of the IAM control plane, which issues each administrative
/// operation as an invocation of gcloud.
pub struct Gcloud {
    pub program: String,
    pub run_cmd_fn: RunCmdFn,
}

impl Gcloud {
    pub fn new(program: impl Into<String>, run_cmd_fn: RunCmdFn) -> Self {
        Self {
            program: program.into(),
            run_cmd_fn,
        }
    }

    fn command(&self) -> Command {
        Command::new(&self.program)
    }

    async fn run(&self, cmd: Command, stream: &'static str) -> anyhow::Result<()> {
        (self.run_cmd_fn)(cmd, stream).await
    }

    pub async fn set_project(&self, project_id: &str, stream: &'static str) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("config").arg("set").arg("project").arg(project_id);

        self.run(cmd, stream).await
    }

    pub async fn create_pool(&self, pool_id: &str, stream: &'static str) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("iam")
            .arg("workload-identity-pools")
            .arg("create")
            .arg(pool_id)
            .arg(format!("--location={LOCATION}"))
            .arg(format!("--description={POOL_DESCRIPTION}"))
            .arg(format!("--display-name={POOL_DISPLAY_NAME}"));

        self.run(cmd, stream).await
    }

    pub async fn create_oidc_provider(
        &self,
        pool_id: &str,
        provider_id: &str,
        issuer_uri: &str,
        stream: &'static str,
    ) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("iam")
            .arg("workload-identity-pools")
            .arg("providers")
            .arg("create-oidc")
            .arg(provider_id)
            .arg(format!("--workload-identity-pool={pool_id}"))
            .arg(format!("--issuer-uri={issuer_uri}"))
            .arg(format!("--location={LOCATION}"))
            .arg(format!("--attribute-mapping={OIDC_ATTRIBUTE_MAPPING}"));

        self.run(cmd, stream).await
    }

    pub async fn create_aws_provider(
        &self,
        pool_id: &str,
        provider_id: &str,
        aws_account_id: &str,
        stream: &'static str,
    ) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("iam")
            .arg("workload-identity-pools")
            .arg("providers")
            .arg("create-aws")
            .arg(provider_id)
            .arg(format!("--workload-identity-pool={pool_id}"))
            .arg(format!("--account-id={aws_account_id}"))
            .arg(format!("--location={LOCATION}"));

        self.run(cmd, stream).await
    }

    pub async fn add_iam_policy_binding(
        &self,
        service_account: &str,
        member: &str,
        stream: &'static str,
    ) -> anyhow::Result<()> {
        self.policy_binding("add-iam-policy-binding", service_account, member, stream)
            .await
    }

    pub async fn remove_iam_policy_binding(
        &self,
        service_account: &str,
        member: &str,
        stream: &'static str,
    ) -> anyhow::Result<()> {
        self.policy_binding("remove-iam-policy-binding", service_account, member, stream)
            .await
    }

    async fn policy_binding(
        &self,
        verb: &str,
        service_account: &str,
        member: &str,
        stream: &'static str,
    ) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("iam")
            .arg("service-accounts")
            .arg(verb)
            .arg(service_account)
            .arg(format!("--role={WORKLOAD_IDENTITY_USER_ROLE}"))
            .arg(format!("--member={member}"));

        self.run(cmd, stream).await
    }

    /// Delete the pool. Its providers are deleted along with it.
    pub async fn delete_pool(&self, pool_id: &str, stream: &'static str) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("iam")
            .arg("workload-identity-pools")
            .arg("delete")
            .arg(pool_id)
            .arg(format!("--location={LOCATION}"))
            .arg("--quiet");

        self.run(cmd, stream).await
    }
}
