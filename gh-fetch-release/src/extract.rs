//! Archive extraction through the host's archive tools.
//!
//! The format is picked from the file name using an ordered suffix table, the
//! tools it needs are looked up before anything runs, and then `tar`, `unzip`
//! or a single-file decompressor is invoked as a child process.

use crate::error::{FetchError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    Zip,
    Gz,
    Bz2,
    Xz,
    Zst,
    /// Not an archive: the asset is the file itself.
    Raw,
}

/// Suffixes checked in order, compound suffixes before the bare ones they end with.
const SUFFIXES: &[(&str, ArchiveFormat)] = &[
    (".tar.gz", ArchiveFormat::TarGz),
    (".tgz", ArchiveFormat::TarGz),
    (".tar.bz2", ArchiveFormat::TarBz2),
    (".tbz2", ArchiveFormat::TarBz2),
    (".tbz", ArchiveFormat::TarBz2),
    (".tar.xz", ArchiveFormat::TarXz),
    (".txz", ArchiveFormat::TarXz),
    (".tar.zst", ArchiveFormat::TarZst),
    (".tzst", ArchiveFormat::TarZst),
    (".tar", ArchiveFormat::Tar),
    (".zip", ArchiveFormat::Zip),
    (".gz", ArchiveFormat::Gz),
    (".bz2", ArchiveFormat::Bz2),
    (".xz", ArchiveFormat::Xz),
    (".zst", ArchiveFormat::Zst),
];

impl ArchiveFormat {
    /// Detect the format of `file_name`, along with the suffix that decided it.
    pub fn detect(file_name: &str) -> (ArchiveFormat, &'static str) {
        let lower = file_name.to_ascii_lowercase();
        SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|&(suffix, format)| (format, suffix))
            .unwrap_or((ArchiveFormat::Raw, ""))
    }

    /// External programs needed for this format, in invocation order.
    pub fn required_tools(self) -> &'static [&'static str] {
        match self {
            // tar runs these itself for -z, -j and -J
            ArchiveFormat::Tar => &["tar"],
            ArchiveFormat::TarGz => &["tar", "gzip"],
            ArchiveFormat::TarBz2 => &["tar", "bzip2"],
            ArchiveFormat::TarXz => &["tar", "xz"],
            ArchiveFormat::TarZst => &["zstd", "tar"],
            ArchiveFormat::Zip => &["unzip"],
            ArchiveFormat::Gz => &["gzip"],
            ArchiveFormat::Bz2 => &["bzip2"],
            ArchiveFormat::Xz => &["xz"],
            ArchiveFormat::Zst => &["zstd"],
            ArchiveFormat::Raw => &[],
        }
    }

    fn tar_flag(self) -> Option<&'static str> {
        match self {
            ArchiveFormat::TarGz => Some("-z"),
            ArchiveFormat::TarBz2 => Some("-j"),
            ArchiveFormat::TarXz => Some("-J"),
            _ => None,
        }
    }
}

/// Runs the host's archive tools.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    /// Directories searched for tools instead of `PATH`.
    search_path: Option<OsString>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up tools in `search_path` (a `PATH`-style list) instead of `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    /// Whether `tool` can be found by this extractor.
    pub fn has_tool(&self, tool: &str) -> bool {
        self.lookup(tool).is_some()
    }

    fn lookup(&self, tool: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(tool, Some(paths), cwd).ok()
            }
            None => which::which(tool).ok(),
        }
    }

    /// Extract `archive` into `dest`, creating `dest` if needed.
    ///
    /// Any error leaves `dest` in an unspecified state.
    pub fn extract(&self, archive: &Path, dest: &Path) -> Result<ArchiveFormat> {
        let file_name = archive
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FetchError::Extraction {
                archive: archive.display().to_string(),
                tool: "extractor".to_string(),
                reason: "cannot determine the archive file name".to_string(),
            })?;
        let (format, suffix) = ArchiveFormat::detect(file_name);

        // probe everything first so a missing tool never leaves half an extraction
        let tools = format
            .required_tools()
            .iter()
            .map(|&tool| {
                self.lookup(tool).ok_or_else(|| FetchError::UnsupportedFormat {
                    archive: archive.display().to_string(),
                    tool: tool.to_string(),
                    extension: suffix.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        fs::create_dir_all(dest)?;
        tracing::info!("Extracting {} ({:?}) to {}", file_name, format, dest.display());

        match format {
            ArchiveFormat::Tar
            | ArchiveFormat::TarGz
            | ArchiveFormat::TarBz2
            | ArchiveFormat::TarXz => self.untar(&tools[0], format, archive, dest)?,
            ArchiveFormat::TarZst => self.untar_zst(&tools[0], &tools[1], archive, dest)?,
            ArchiveFormat::Zip => self.unzip(&tools[0], archive, dest)?,
            ArchiveFormat::Gz
            | ArchiveFormat::Bz2
            | ArchiveFormat::Xz
            | ArchiveFormat::Zst => {
                let output = dest.join(strip_suffix(file_name, suffix, archive)?);
                self.decompress(&tools[0], archive, &output)?;
            }
            ArchiveFormat::Raw => {
                tracing::debug!("{} is not an archive, using it as is", file_name);
                fs::copy(archive, dest.join(file_name))?;
            }
        }

        Ok(format)
    }

    fn untar(&self, tar: &Path, format: ArchiveFormat, archive: &Path, dest: &Path) -> Result<()> {
        let mut cmd = Command::new(tar);
        cmd.arg("-x");
        if let Some(flag) = format.tar_flag() {
            cmd.arg(flag);
        }
        cmd.arg("-f").arg(archive).arg("-C").arg(dest);

        let output = run(&mut cmd, archive, "tar")?;
        check(&output, archive, "tar")
    }

    /// `zstd -dc archive | tar -xf - -C dest`
    fn untar_zst(&self, zstd: &Path, tar: &Path, archive: &Path, dest: &Path) -> Result<()> {
        let mut decompressor = Command::new(zstd)
            .arg("-dc")
            .arg(archive)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_failed(archive, "zstd", e))?;

        let stream = decompressor
            .stdout
            .take()
            .ok_or_else(|| FetchError::Extraction {
                archive: archive.display().to_string(),
                tool: "zstd".to_string(),
                reason: "produced no output stream".to_string(),
            })?;

        // the parent must not keep a read end of the pipe, or zstd blocks
        // forever once tar stops reading
        let spawned = Command::new(tar)
            .arg("-x")
            .arg("-f")
            .arg("-")
            .arg("-C")
            .arg(dest)
            .stdin(Stdio::from(stream))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let untar = match spawned.and_then(|child| child.wait_with_output()) {
            Ok(output) => output,
            Err(e) => {
                let _ = decompressor.kill();
                let _ = decompressor.wait();
                return Err(spawn_failed(archive, "tar", e));
            }
        };

        let unzstd = decompressor
            .wait_with_output()
            .map_err(|e| spawn_failed(archive, "zstd", e))?;

        // tar may stop reading before the end of the stream, e.g. on padding
        // after the end-of-archive marker
        let zstd_failure = if untar.status.success() && killed_by_sigpipe(&unzstd) {
            tracing::debug!("zstd stopped by SIGPIPE after tar finished");
            None
        } else {
            failure(&unzstd)
        };

        match (zstd_failure, failure(&untar)) {
            (None, None) => Ok(()),
            (Some(reason), None) => Err(FetchError::Extraction {
                archive: archive.display().to_string(),
                tool: "zstd".to_string(),
                reason,
            }),
            (None, Some(reason)) => Err(FetchError::Extraction {
                archive: archive.display().to_string(),
                tool: "tar".to_string(),
                reason,
            }),
            (Some(zstd_reason), Some(tar_reason)) => Err(FetchError::Extraction {
                archive: archive.display().to_string(),
                tool: "zstd | tar".to_string(),
                reason: format!("zstd {zstd_reason}; tar {tar_reason}"),
            }),
        }
    }

    fn unzip(&self, unzip: &Path, archive: &Path, dest: &Path) -> Result<()> {
        let mut cmd = Command::new(unzip);
        cmd.arg("-o").arg("-q").arg(archive).arg("-d").arg(dest);

        let output = run(&mut cmd, archive, "unzip")?;
        check(&output, archive, "unzip")
    }

    /// Single-file decompression: `<tool> -dc archive > output`
    fn decompress(&self, tool: &Path, archive: &Path, output: &Path) -> Result<()> {
        let name = tool_name(tool);
        let sink = File::create(output)?;

        let mut cmd = Command::new(tool);
        cmd.arg("-dc").arg(archive).stdout(sink);

        let result = run(&mut cmd, archive, &name).and_then(|out| check(&out, archive, &name));
        if result.is_err() {
            let _ = fs::remove_file(output);
        }
        result
    }
}

fn strip_suffix<'a>(file_name: &'a str, suffix: &str, archive: &Path) -> Result<&'a str> {
    let stem = &file_name[..file_name.len() - suffix.len()];
    if stem.is_empty() {
        return Err(FetchError::Extraction {
            archive: archive.display().to_string(),
            tool: "extractor".to_string(),
            reason: format!("cannot name the file decompressed from '{file_name}'"),
        });
    }
    Ok(stem)
}

fn tool_name(tool: &Path) -> String {
    tool.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| tool.display().to_string())
}

fn run(cmd: &mut Command, archive: &Path, tool: &str) -> Result<Output> {
    tracing::debug!("Running {:?}", cmd);
    cmd.output().map_err(|e| spawn_failed(archive, tool, e))
}

#[cfg(unix)]
fn killed_by_sigpipe(output: &Output) -> bool {
    use std::os::unix::process::ExitStatusExt;
    const SIGPIPE: i32 = 13;
    output.status.signal() == Some(SIGPIPE)
}

#[cfg(not(unix))]
fn killed_by_sigpipe(_output: &Output) -> bool {
    false
}

fn failure(output: &Output) -> Option<String> {
    if output.status.success() {
        return None;
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Some(format!("exited with {}: {}", output.status, stderr.trim()))
}

fn check(output: &Output, archive: &Path, tool: &str) -> Result<()> {
    match failure(output) {
        None => Ok(()),
        Some(reason) => Err(FetchError::Extraction {
            archive: archive.display().to_string(),
            tool: tool.to_string(),
            reason,
        }),
    }
}

fn spawn_failed(archive: &Path, tool: &str, err: std::io::Error) -> FetchError {
    FetchError::Extraction {
        archive: archive.display().to_string(),
        tool: tool.to_string(),
        reason: format!("could not be run: {err}"),
    }
}
