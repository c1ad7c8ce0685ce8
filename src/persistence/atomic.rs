//! Crash-safe file replacement.
//!
//! Files are replaced with the write-to-temp-then-rename pattern:
//! 1. Write to `<path>.tmp`
//! 2. fsync the temp file
//! 3. Rename over `<path>`
//! 4. fsync the parent directory
//!
//! Readers therefore always see either the old or the new contents. The
//! directory fsync is what makes the rename itself survive a power loss.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Replaces the file at `path` with `bytes`, atomically and durably.
///
/// Creates the parent directory if it does not exist.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        fsync_file(&file)?;
    }

    std::fs::rename(&tmp_path, path)?;

    match parent {
        Some(parent) => fsync_dir(parent),
        None => fsync_dir(Path::new(".")),
    }
}

/// Returns the sibling temp path used while replacing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn fsync_file(file: &File) -> io::Result<()> {
    file.sync_all()
}

fn fsync_dir(dir_path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(dir_path)?;
    dir.sync_all()
}
