//! Directory tree helpers shared by the cache and the runtime provisioner

use crate::error::{RubypackError, RubypackResult};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Copy `src` into `dest`, preserving file modes and symlinks.
///
/// `dest` is created if needed; existing files in it are overwritten.
pub fn copy_tree(src: &Path, dest: &Path) -> RubypackResult<u64> {
    let mut copied = 0;

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let reason = e.to_string();
            RubypackError::io(
                format!("walking {}", src.display()),
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(reason)),
            )
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| RubypackError::io("computing relative path", std::io::Error::other(e)))?;
        let target = dest.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| RubypackError::io(format!("creating {}", target.display()), e))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(|e| {
                RubypackError::io(format!("reading link {}", entry.path().display()), e)
            })?;
            remove_path(&target)?;
            symlink(&link, &target)?;
            copied += 1;
        } else {
            if target.is_dir() {
                remove_path(&target)?;
            }
            fs::copy(entry.path(), &target).map_err(|e| {
                RubypackError::io(
                    format!("copying {} to {}", entry.path().display(), target.display()),
                    e,
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Remove a file, symlink or directory tree; missing paths are fine
pub fn remove_path(path: &Path) -> RubypackResult<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RubypackError::io(format!("inspecting {}", path.display()), e)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| RubypackError::io(format!("removing {}", path.display()), e))
}

/// Create a symlink at `link` pointing to `target`
pub fn symlink(target: &Path, link: &Path) -> RubypackResult<()> {
    #[cfg(unix)]
    let result = std::os::unix::fs::symlink(target, link);
    #[cfg(not(unix))]
    let result = std::os::windows::fs::symlink_file(target, link);

    result.map_err(|e| {
        RubypackError::io(
            format!("linking {} -> {}", link.display(), target.display()),
            e,
        )
    })
}
