use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitHub API error: {0}")]
    GitHubApi(Box<octocrab::Error>),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository format '{input}'. Expected format: owner/repo (e.g., BurntSushi/ripgrep)")]
    InvalidRepo { input: String },

    #[error("Invalid asset pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid --binfiles glob '{glob}': {source}")]
    InvalidGlob {
        glob: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Not found on GitHub: {resource}. {message}")]
    NotFound { resource: String, message: String },

    #[error("GitHub rejected the credentials for {resource}: {message}")]
    Auth { resource: String, message: String },

    #[error("No asset matches pattern '{pattern}'. Available assets: {available}")]
    NoMatch { pattern: String, available: String },

    #[error("Pattern '{pattern}' is ambiguous, it matches {count} assets: {matches}")]
    AmbiguousMatch {
        pattern: String,
        count: usize,
        matches: String,
    },

    #[error("Failed to download {asset} from {url}: HTTP {status} - {message}")]
    DownloadFailed {
        asset: String,
        url: String,
        status: u16,
        message: String,
    },

    #[error("Cannot extract {archive}: '{tool}' is required for {extension} files but was not found on PATH")]
    UnsupportedFormat {
        archive: String,
        tool: String,
        extension: String,
    },

    #[error("Archive extraction failed for {archive}: {tool} {reason}")]
    Extraction {
        archive: String,
        tool: String,
        reason: String,
    },

    #[error("No files match '{glob}' in {root}. Top-level entries: {entries}")]
    NoFilesFound {
        glob: String,
        root: String,
        entries: String,
    },

    #[error("--rename {name} needs exactly one file, but {count} matched: {files}")]
    InvalidRename {
        name: String,
        count: usize,
        files: String,
    },

    #[error("Installation failed: {message}. Path: {path}{}", installed_note(.installed))]
    Install {
        message: String,
        path: String,
        installed: Vec<String>,
    },
}

fn installed_note(installed: &[String]) -> String {
    if installed.is_empty() {
        String::new()
    } else {
        format!(". Already installed: {}", installed.join(", "))
    }
}

impl FetchError {
    /// Whether a network operation failing with this error is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err
                        .status()
                        .map(|s| s.is_server_error() || s.as_u16() == 429)
                        .unwrap_or(true)
            }
            FetchError::DownloadFailed { status, .. } => *status >= 500 || *status == 429,
            FetchError::GitHubApi(err) => !matches!(**err, octocrab::Error::GitHub { .. }),
            FetchError::Io(err) => {
                use std::io::ErrorKind;
                matches!(
                    err.kind(),
                    ErrorKind::ConnectionAborted
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionRefused
                        | ErrorKind::TimedOut
                        | ErrorKind::Interrupted
                        | ErrorKind::UnexpectedEof
                )
            }
            _ => false,
        }
    }
}

impl From<octocrab::Error> for FetchError {
    fn from(err: octocrab::Error) -> Self {
        FetchError::GitHubApi(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Pipeline step in which a run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchMetadata,
    SelectAsset,
    Download,
    Extract,
    ResolveFiles,
    Install,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchMetadata => "fetch-metadata",
            Stage::SelectAsset => "select-asset",
            Stage::Download => "download",
            Stage::Extract => "extract",
            Stage::ResolveFiles => "resolve-files",
            Stage::Install => "install",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{stage} step failed")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub error: FetchError,
}

impl RunError {
    /// Adapter for `map_err` that tags an error with the step it came from.
    pub fn at(stage: Stage) -> impl FnOnce(FetchError) -> RunError {
        move |error| RunError { stage, error }
    }
}
