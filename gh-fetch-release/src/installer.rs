use crate::error::{FetchError, Result};
use crate::resolver::ResolvedFile;
use crate::utils;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Copy `files` into `outdir` and return the absolute installed paths.
///
/// Everything that can be checked up front is checked before the first
/// write. A failure part way through leaves earlier files installed and
/// lists them in the error.
pub fn install(
    files: &[ResolvedFile],
    outdir: &Path,
    rename: Option<&str>,
    set_exec: bool,
) -> Result<Vec<PathBuf>> {
    let plan = plan(files, rename)?;

    fs::create_dir_all(outdir).map_err(|e| install_error(outdir, e, &[]))?;
    let outdir = fs::canonicalize(outdir).map_err(|e| install_error(outdir, e, &[]))?;

    let mut installed: Vec<PathBuf> = Vec::with_capacity(plan.len());
    for (file, name) in plan {
        let dest = outdir.join(name);
        install_one(&file.absolute_path, &dest, set_exec)
            .map_err(|e| install_error(&dest, e, &installed))?;

        tracing::info!(
            "Installed {} as {}",
            file.relative_path.display(),
            dest.display()
        );
        installed.push(dest);
    }

    Ok(installed)
}

/// Pair each file with its destination name, validating names and rename cardinality.
fn plan<'a>(
    files: &'a [ResolvedFile],
    rename: Option<&'a str>,
) -> Result<Vec<(&'a ResolvedFile, &'a str)>> {
    if let Some(name) = rename {
        if files.len() != 1 {
            return Err(FetchError::InvalidRename {
                name: name.to_string(),
                count: files.len(),
                files: files
                    .iter()
                    .map(|f| f.relative_path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    }

    let mut seen = HashSet::new();
    let mut plan = Vec::with_capacity(files.len());
    for file in files {
        let name = match rename {
            Some(name) => name,
            None => file.file_name().ok_or_else(|| FetchError::Install {
                message: "cannot determine the file name".to_string(),
                path: file.relative_path.display().to_string(),
                installed: Vec::new(),
            })?,
        };
        validate_name(name)?;

        if !seen.insert(name) {
            tracing::warn!(
                "More than one matched file is named {}; {} will overwrite the earlier one",
                name,
                file.relative_path.display()
            );
        }
        plan.push((file, name));
    }
    Ok(plan)
}

/// Destination names must stay inside the output directory.
fn validate_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(FetchError::Install {
            message: "destination name must be a plain file name without directories".to_string(),
            path: name.to_string(),
            installed: Vec::new(),
        }),
    }
}

/// Write through a temporary file in the destination directory and rename it
/// over `dest`, so a binary that is currently running can still be replaced.
fn install_one(source: &Path, dest: &Path, set_exec: bool) -> std::io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".gh-fetch-release-")
        .tempfile_in(dir)?;

    let mut reader = fs::File::open(source)?;
    std::io::copy(&mut reader, staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    fs::set_permissions(staged.path(), fs::metadata(source)?.permissions())?;
    if set_exec {
        utils::make_executable(staged.path())?;
    }

    staged.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

fn install_error(path: &Path, err: std::io::Error, installed: &[PathBuf]) -> FetchError {
    FetchError::Install {
        message: err.to_string(),
        path: path.display().to_string(),
        installed: installed.iter().map(|p| p.display().to_string()).collect(),
    }
}
