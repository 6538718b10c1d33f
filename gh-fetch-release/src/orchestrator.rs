use crate::config::InstallRequest;
use crate::error::{FetchError, Result, RunError, Stage};
use crate::extract::Extractor;
use crate::github::{ReleaseAsset, ReleaseSource};
use crate::installer;
use crate::resolver;
use crate::selector;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs one installation: fetch metadata, select, download, extract,
/// resolve, install, clean up.
pub struct Orchestrator<S> {
    source: S,
    extractor: Extractor,
    request: InstallRequest,
}

impl<S: ReleaseSource> Orchestrator<S> {
    pub fn new(source: S, request: InstallRequest) -> Self {
        Self {
            source,
            extractor: Extractor::new(),
            request,
        }
    }

    /// Use `extractor` instead of one that searches `PATH`.
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run the pipeline and return the installed paths.
    pub async fn run(&self) -> std::result::Result<Vec<PathBuf>, RunError> {
        let repo = &self.request.repo;

        let release = self
            .source
            .latest_release(repo)
            .await
            .map_err(RunError::at(Stage::FetchMetadata))?;

        let asset = selector::select(&release.assets, &self.request.pattern)
            .map_err(RunError::at(Stage::SelectAsset))?;
        tracing::info!("Selected asset {} from release {}", asset.name, release.tag);

        let workspace = Workspace::prepare(self.request.download_dir.as_deref())
            .map_err(RunError::at(Stage::Download))?;

        let result = self.process(asset, &workspace).await;
        workspace.cleanup();
        result
    }

    async fn process(
        &self,
        asset: &ReleaseAsset,
        workspace: &Workspace,
    ) -> std::result::Result<Vec<PathBuf>, RunError> {
        let archive = workspace
            .download_path(asset)
            .map_err(RunError::at(Stage::Download))?;
        self.source
            .download(asset, &archive)
            .await
            .map_err(RunError::at(Stage::Download))?;

        let extract_root = workspace.extract_dir();
        self.extractor
            .extract(&archive, extract_root)
            .map_err(RunError::at(Stage::Extract))?;

        let files = resolver::resolve(extract_root, &self.request.binfiles)
            .map_err(RunError::at(Stage::ResolveFiles))?;

        installer::install(
            &files,
            &self.request.outdir,
            self.request.rename.as_deref(),
            self.request.set_exec,
        )
        .map_err(RunError::at(Stage::Install))
    }
}

/// Directories used by one run.
///
/// The extraction directory is always temporary. The download directory is
/// temporary unless the caller supplied one.
struct Workspace {
    extract: TempDir,
    download: DownloadDir,
}

enum DownloadDir {
    Temporary(TempDir),
    Persistent(PathBuf),
}

impl Workspace {
    fn prepare(download_dir: Option<&Path>) -> Result<Self> {
        let download = match download_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                DownloadDir::Persistent(dir.to_path_buf())
            }
            None => DownloadDir::Temporary(
                tempfile::Builder::new()
                    .prefix("gh-fetch-release-download-")
                    .tempdir()?,
            ),
        };
        let extract = tempfile::Builder::new()
            .prefix("gh-fetch-release-extract-")
            .tempdir()?;

        Ok(Self { extract, download })
    }

    fn download_dir(&self) -> &Path {
        match &self.download {
            DownloadDir::Temporary(dir) => dir.path(),
            DownloadDir::Persistent(dir) => dir,
        }
    }

    fn extract_dir(&self) -> &Path {
        self.extract.path()
    }

    /// Where `asset` is saved. Asset names must be plain file names.
    fn download_path(&self, asset: &ReleaseAsset) -> Result<PathBuf> {
        let name = Path::new(&asset.name);
        match name.file_name() {
            Some(file_name) if file_name == name.as_os_str() => {
                Ok(self.download_dir().join(file_name))
            }
            _ => Err(FetchError::DownloadFailed {
                asset: asset.name.clone(),
                url: asset.download_url.clone(),
                status: 0,
                message: "asset name is not a plain file name".to_string(),
            }),
        }
    }

    /// Best-effort removal of the temporary directories.
    fn cleanup(self) {
        let extract_path = self.extract.path().to_path_buf();
        match self.extract.close() {
            Ok(()) => tracing::debug!("Removed {}", extract_path.display()),
            Err(e) => tracing::warn!("Failed to remove {}: {}", extract_path.display(), e),
        }

        match self.download {
            DownloadDir::Temporary(dir) => {
                let path = dir.path().to_path_buf();
                match dir.close() {
                    Ok(()) => tracing::debug!("Removed {}", path.display()),
                    Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
                }
            }
            DownloadDir::Persistent(dir) => {
                tracing::info!("Keeping downloaded asset in {}", dir.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            download_url: format!("https://example.com/{name}"),
        }
    }

    #[test]
    fn test_temporary_workspace_is_removed() {
        let workspace = Workspace::prepare(None).unwrap();
        let download = workspace.download_dir().to_path_buf();
        let extract = workspace.extract_dir().to_path_buf();
        assert!(download.is_dir());
        assert!(extract.is_dir());

        workspace.cleanup();

        assert!(!download.exists());
        assert!(!extract.exists());
    }

    #[test]
    fn test_persistent_download_dir_survives_cleanup() {
        let base = tempfile::tempdir().unwrap();
        let downloads = base.path().join("cache/downloads");

        let workspace = Workspace::prepare(Some(&downloads)).unwrap();
        let archive = workspace.download_path(&asset("tool.tar.gz")).unwrap();
        fs::write(&archive, b"archive").unwrap();
        let extract = workspace.extract_dir().to_path_buf();

        workspace.cleanup();

        assert!(archive.exists());
        assert!(!extract.exists());
    }

    #[test]
    fn test_download_path_rejects_nested_names() {
        let workspace = Workspace::prepare(None).unwrap();
        assert!(workspace.download_path(&asset("../tool.tar.gz")).is_err());
        assert!(workspace.download_path(&asset("dir/tool.tar.gz")).is_err());
        assert!(workspace
            .download_path(&asset("tool.tar.gz"))
            .unwrap()
            .ends_with("tool.tar.gz"));
        workspace.cleanup();
    }
}
