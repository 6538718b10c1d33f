//! Selection of files from an extracted release by shell-style glob.
//!
//! Globs are matched one path component at a time: a pattern with `n`
//! segments only matches entries exactly `n` levels below the root, and each
//! segment is matched against the corresponding component on its own. This
//! is what lets `tool-*/tool` find `root/tool-1.2.3/tool`.

use crate::error::{FetchError, Result};
use glob::{MatchOptions, Pattern};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

const SEGMENT_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// A glob such as `tool-*/bin/tool`, relative to the extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobSpec {
    raw: String,
    segments: Vec<Pattern>,
}

impl GlobSpec {
    /// Split `raw` on `/` and compile each segment. Empty and `.` segments
    /// are dropped.
    pub fn new(raw: &str) -> Result<Self> {
        let segments = raw
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(|segment| {
                Pattern::new(segment).map_err(|source| FetchError::InvalidGlob {
                    glob: raw.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Pattern] {
        &self.segments
    }
}

impl FromStr for GlobSpec {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        GlobSpec::new(s)
    }
}

impl fmt::Display for GlobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub absolute_path: PathBuf,
    pub relative_path: PathBuf,
}

impl ResolvedFile {
    /// Last component of the relative path.
    pub fn file_name(&self) -> Option<&str> {
        self.relative_path.file_name().and_then(|n| n.to_str())
    }
}

/// Find the regular files under `root` that match `glob`, sorted by relative path.
pub fn resolve(root: &Path, glob: &GlobSpec) -> Result<Vec<ResolvedFile>> {
    let segments = glob.segments();
    let depth = segments.len();
    if depth == 0 {
        return Err(no_files_found(root, glob));
    }

    let canonical_root = fs::canonicalize(root)?;
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || entry
                    .file_name()
                    .to_str()
                    .map(|name| segment_matches(&segments[entry.depth() - 1], name))
                    .unwrap_or(false)
        });

    for entry in walker {
        let entry = entry.map_err(|e| FetchError::Io(e.into()))?;
        if entry.depth() != depth {
            continue;
        }
        let path = entry.path();
        let relative_path = match path.strip_prefix(root) {
            Ok(relative) if path_matches(segments, relative) => relative.to_path_buf(),
            _ => continue,
        };

        // follows symlinks, unlike entry.file_type()
        if !path.is_file() {
            tracing::debug!("Skipping non-file match {}", path.display());
            continue;
        }

        let real = fs::canonicalize(path)?;
        if !real.starts_with(&canonical_root) {
            tracing::warn!(
                "Skipping {}: it points outside the extracted files ({})",
                path.display(),
                real.display()
            );
            continue;
        }

        files.push(ResolvedFile {
            absolute_path: canonical_root.join(&relative_path),
            relative_path,
        });
    }

    if files.is_empty() {
        return Err(no_files_found(root, glob));
    }

    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::debug!(
        "Glob {} matched {} file(s) in {}",
        glob,
        files.len(),
        root.display()
    );
    Ok(files)
}

fn no_files_found(root: &Path, glob: &GlobSpec) -> FetchError {
    let entries = match fs::read_dir(root) {
        Ok(read_dir) => {
            let mut names = read_dir
                .filter_map(|e| e.ok())
                .map(|e| {
                    let name = e.file_name().to_string_lossy().into_owned();
                    if e.path().is_dir() {
                        format!("{name}/")
                    } else {
                        name
                    }
                })
                .collect::<Vec<_>>();
            names.sort();
            if names.is_empty() {
                "(empty)".to_string()
            } else {
                names.join(", ")
            }
        }
        Err(e) => format!("(unreadable: {e})"),
    };

    FetchError::NoFilesFound {
        glob: glob.to_string(),
        root: root.display().to_string(),
        entries,
    }
}

fn path_matches(segments: &[Pattern], relative: &Path) -> bool {
    let components = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>();
    match components {
        Some(components) => {
            components.len() == segments.len()
                && segments
                    .iter()
                    .zip(components)
                    .all(|(segment, name)| segment_matches(segment, name))
        }
        None => false,
    }
}

/// Match one path component against one glob segment.
///
/// Wildcards never match a leading `.` unless the segment starts with one.
fn segment_matches(pattern: &Pattern, name: &str) -> bool {
    pattern.matches_with(name, SEGMENT_OPTIONS)
}
