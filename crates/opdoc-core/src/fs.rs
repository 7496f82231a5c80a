use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::Builder;

/// Replace `path` with `contents` via a temporary file in the same directory,
/// keeping the permissions of any file being replaced.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let mut tmp = Builder::new().prefix(".opdoc").tempfile_in(parent)?;
    tmp.as_file_mut().write_all(contents.as_bytes())?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            let mode = metadata.permissions().mode();
            let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode));
        }
    }

    tmp.persist(path).map(|_| ()).map_err(|err| err.error)
}
