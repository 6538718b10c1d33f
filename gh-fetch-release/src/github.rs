use crate::config::ClientConfig;
use crate::error::{FetchError, Result};
use crate::retry::{with_retry, RetryConfig};
use octocrab::Octocrab;
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Repository identifier in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl FromStr for RepoId {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FetchError::InvalidRepo {
            input: s.to_string(),
        };

        let (owner, name) = s.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(RepoId {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub download_url: String,
}

#[derive(Debug, Clone)]
pub struct Release {
    pub tag: String,
    pub assets: Vec<ReleaseAsset>,
}

/// Where releases come from.
///
/// [`GitHubClient`] is the production implementation; the orchestrator only
/// depends on this trait.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Fetch metadata of the latest release of `repo`.
    async fn latest_release(&self, repo: &RepoId) -> Result<Release>;

    /// Write the bytes of `asset` to `dest`.
    async fn download(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()>;
}

pub struct GitHubClient {
    octocrab: Octocrab,
    http_client: Client,
    token: Option<String>,
    retry_config: RetryConfig,
}

impl GitHubClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let octocrab = match &config.token {
            Some(token) => Octocrab::builder().personal_token(token.clone()).build()?,
            None => Octocrab::builder().build()?,
        };

        let http_client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            octocrab,
            http_client,
            token: config.token.clone(),
            retry_config: config.retry.clone(),
        })
    }

    async fn fetch_to(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()> {
        let mut request = self
            .http_client
            .get(&asset.download_url)
            .header(ACCEPT, "application/octet-stream");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            if matches!(status.as_u16(), 401 | 403) {
                return Err(FetchError::Auth {
                    resource: asset.download_url.clone(),
                    message: format!("HTTP {status}"),
                });
            }
            return Err(FetchError::DownloadFailed {
                asset: asset.name.clone(),
                url: asset.download_url.clone(),
                status: status.as_u16(),
                message,
            });
        }

        use futures_util::StreamExt;
        use std::io::Write;

        let mut file = std::fs::File::create(dest)?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?)?;
        }
        file.flush()?;

        Ok(())
    }
}

impl ReleaseSource for GitHubClient {
    async fn latest_release(&self, repo: &RepoId) -> Result<Release> {
        let operation_name = format!("Fetching latest release for {repo}");
        tracing::info!("{}", operation_name);

        let release = with_retry(&operation_name, &self.retry_config, || {
            let octocrab = self.octocrab.clone();
            async move {
                octocrab
                    .repos(&repo.owner, &repo.name)
                    .releases()
                    .get_latest()
                    .await
                    .map_err(|e| classify(repo, e))
            }
        })
        .await?;

        tracing::info!(
            "Latest release of {} is {} with {} assets",
            repo,
            release.tag_name,
            release.assets.len()
        );

        Ok(Release {
            tag: release.tag_name,
            assets: release
                .assets
                .into_iter()
                .map(|asset| ReleaseAsset {
                    name: asset.name,
                    download_url: asset.browser_download_url.to_string(),
                })
                .collect(),
        })
    }

    async fn download(&self, asset: &ReleaseAsset, dest: &Path) -> Result<()> {
        tracing::info!("Downloading {} to {}", asset.download_url, dest.display());

        let operation_name = format!("Downloading {}", asset.name);
        with_retry(&operation_name, &self.retry_config, || {
            self.fetch_to(asset, dest)
        })
        .await
    }
}

/// Map GitHub API status failures onto the collaborator error kinds.
fn classify(repo: &RepoId, err: octocrab::Error) -> FetchError {
    if let octocrab::Error::GitHub { source, .. } = &err {
        let message = source.message.clone();
        match source.status_code.as_u16() {
            401 | 403 => {
                return FetchError::Auth {
                    resource: repo.to_string(),
                    message,
                }
            }
            404 => {
                return FetchError::NotFound {
                    resource: format!("latest release of {repo}"),
                    message,
                }
            }
            _ => {}
        }
    }
    err.into()
}
