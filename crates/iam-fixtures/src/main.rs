use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

fn main() -> Result<(), anyhow::Error> {
    let cli = iam_fixtures::Cli::parse();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    // Use reasonable defaults for printing structured logs to stderr.
    // Stdout is reserved for the audiences or report.
    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_ansi(!matches!(std::env::var("NO_COLOR"), Ok(v) if v == "1"))
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()?;

    let result = runtime.block_on(runtime.spawn(iam_fixtures::run(cli)));
    runtime.shutdown_timeout(std::time::Duration::from_secs(5));

    match result? {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!("one or more gcloud calls failed");
            std::process::exit(1);
        }
        Err(error) => {
            tracing::error!(error = ?error, "execution failed");
            std::process::exit(1);
        }
    }
}
