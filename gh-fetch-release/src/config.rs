use crate::cli::Args;
use crate::github::RepoId;
use crate::resolver::GlobSpec;
use crate::retry::RetryConfig;
use crate::selector::Pattern;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the GitHub collaborator.
///
/// The token is carried here and handed to the client explicitly; nothing
/// below the CLI layer reads the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub token: Option<String>,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            user_agent: default_user_agent(),
            connect_timeout: default_connect_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("gh-fetch-release/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Everything one run needs to know about what to install and where.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub repo: RepoId,
    pub pattern: Pattern,
    pub binfiles: GlobSpec,
    pub outdir: PathBuf,
    /// Persistent download directory. `None` means a temporary one.
    pub download_dir: Option<PathBuf>,
    pub set_exec: bool,
    pub rename: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub client: ClientConfig,
    pub request: InstallRequest,
}

impl RunConfig {
    pub fn from_args(args: Args) -> Self {
        let outdir = args.outdir();
        let download_dir = args.download_dir();

        let token = args.token.filter(|t| !t.trim().is_empty());

        Self {
            client: ClientConfig {
                token,
                ..ClientConfig::default()
            },
            request: InstallRequest {
                repo: args.repo,
                pattern: args.pattern,
                binfiles: args.binfiles,
                outdir,
                download_dir,
                set_exec: args.setexec,
                rename: args.rename,
            },
        }
    }
}
