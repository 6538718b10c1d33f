use crate::github::RepoId;
use crate::resolver::GlobSpec;
use crate::selector::Pattern;
use crate::utils::expand_home;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(
    name = "gh-fetch-release",
    version,
    about = "Fetch and extract binary files from the latest GitHub release of the given repository",
    long_about = None,
    infer_long_args = true
)]
pub struct Args {
    /// GitHub repository in the form owner/repo
    #[clap(long, value_name = "OWNER/NAME")]
    pub repo: RepoId,

    /// Regex pattern to match the asset filename
    #[clap(long, value_name = "REGEX")]
    pub pattern: Pattern,

    /// Output directory to install the binary files
    #[clap(long, value_name = "PATH")]
    pub outdir: String,

    /// Glob pattern to match the binary files to install from the extracted files
    #[clap(long, value_name = "GLOB")]
    pub binfiles: GlobSpec,

    /// Download directory to keep the downloaded asset in
    /// (if not given, a temporary directory is created and deleted)
    #[clap(long, value_name = "PATH")]
    pub downloaddir: Option<String>,

    /// Set executable permission on the installed binary files
    #[clap(long)]
    pub setexec: bool,

    /// Name of the installed binary file (only if a single file is matched by --binfiles)
    #[clap(long, value_name = "NAME")]
    pub rename: Option<String>,

    /// GitHub token used for API requests and downloads
    #[clap(long, value_name = "TOKEN", env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl Args {
    /// Installation directory, with a leading ~ expanded
    pub fn outdir(&self) -> PathBuf {
        expand_home(&self.outdir)
    }

    /// Persistent download directory, if one was given
    pub fn download_dir(&self) -> Option<PathBuf> {
        self.downloaddir.as_deref().map(expand_home)
    }
}
