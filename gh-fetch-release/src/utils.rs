use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
        {
            let rest = path.strip_prefix('~').unwrap_or(path);
            let rest = rest.strip_prefix('/').unwrap_or(rest);
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Add execute permission for owner, group and others, keeping all other bits
#[cfg(unix)]
pub fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    fs::set_permissions(path, permissions)
}

#[cfg(windows)]
pub fn make_executable(_path: &Path) -> io::Result<()> {
    // No-op on Windows
    Ok(())
}
