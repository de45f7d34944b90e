use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// Reserve a uniquely named, empty file in `dir` with the given extension.
///
/// The file is left on disk; whoever receives the path owns deleting it.
pub fn scratch_path(dir: &Path, extension: &str) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("splitcap-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;
    let path = file.into_temp_path().keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Delete `path` if it still exists. Failures are logged, never raised.
pub fn remove_if_exists(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Move a file, falling back to copy + delete when a rename is not possible
/// (e.g. across filesystems).
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Err(rename_err) = fs::rename(from, to) {
        debug!(
            "Rename {} -> {} failed ({}), copying instead",
            from.display(),
            to.display(),
            rename_err
        );
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

/// List regular, non-hidden files in `dir`, sorted by name.
pub fn list_media_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if entry.file_type()?.is_file() && !hidden {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Current Unix time in whole seconds, used to name outputs.
pub fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// First path of the form `<dir>/<stem>.<ext>`, `<dir>/<stem>-1.<ext>`, ...
/// that does not exist yet.
pub fn unique_path(dir: &Path, stem: &str, extension: &str) -> io::Result<PathBuf> {
    let candidate = dir.join(format!("{stem}.{extension}"));
    if !candidate.exists() {
        return Ok(candidate);
    }
    for n in 1..10_000 {
        let candidate = dir.join(format!("{stem}-{n}.{extension}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("No free output name for {stem} in {}", dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_path_is_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = scratch_path(dir.path(), "mp4").unwrap();
        let b = scratch_path(dir.path(), "mp4").unwrap();

        assert_ne!(a, b);
        assert!(a.exists());
        assert_eq!(a.extension().unwrap(), "mp4");
        assert!(a.starts_with(dir.path()));
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.mp3");
        fs::write(&path, b"x").unwrap();

        assert!(remove_if_exists(&path));
        assert!(!path.exists());
        assert!(!remove_if_exists(&path));
    }

    #[test]
    fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("from.mp4");
        let to = dir.path().join("to.mp4");
        fs::write(&from, b"video").unwrap();

        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"video");
    }

    #[test]
    fn test_list_media_files_skips_hidden_and_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mp4"), b"").unwrap();
        fs::write(dir.path().join("a.mp4"), b"").unwrap();
        fs::write(dir.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_media_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_unique_path() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_path(dir.path(), "1700000000", "mp4").unwrap();
        assert_eq!(first, dir.path().join("1700000000.mp4"));

        fs::write(&first, b"").unwrap();
        let second = unique_path(dir.path(), "1700000000", "mp4").unwrap();
        assert_eq!(second, dir.path().join("1700000000-1.mp4"));
    }
}
