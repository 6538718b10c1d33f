use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gh_fetch_release::cli::Args;
use gh_fetch_release::config::RunConfig;
use gh_fetch_release::github::GitHubClient;
use gh_fetch_release::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = RunConfig::from_args(args);

    let client = GitHubClient::new(&config.client)?;
    let installed = Orchestrator::new(client, config.request).run().await?;

    for path in installed {
        println!("{}", path.display());
    }

    Ok(())
}
