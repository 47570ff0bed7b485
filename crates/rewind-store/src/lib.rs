use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Hidden directory inside an assignment folder holding run metadata.
pub const META_DIR: &str = ".rewind";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("assignment directory {} already exists and could not be cleared: {source}", path.display())]
    CannotClear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("creating directory {}: {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("another rewind run holds {}", path.display())]
    Busy { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `<output_dir>/<assignment>`
pub fn assignment_dir(output_dir: &Path, assignment: &str) -> PathBuf {
    output_dir.join(assignment)
}

/// `<assignment_dir>/.rewind/events.jsonl`
pub fn events_path(assignment_dir: &Path) -> PathBuf {
    assignment_dir.join(META_DIR).join("events.jsonl")
}

/// Lock file kept beside (not inside) the assignment directory, so clearing the
/// directory never removes a lock held by the current run.
pub fn run_lock_path(assignment_dir: &Path) -> PathBuf {
    let name = assignment_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "assignment".into());
    assignment_dir.with_file_name(format!(".{name}.rewind.lock"))
}

/// Start a fresh assignment directory: remove any previous contents, then create it.
pub fn prepare_assignment_dir(path: &Path) -> Result<(), StoreError> {
    if path.exists() {
        let cleared = if path.is_dir() {
            fs::remove_dir_all(path)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ))
        };
        cleared.map_err(|source| StoreError::CannotClear {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::create_dir_all(path).map_err(|source| StoreError::Create {
        path: path.to_path_buf(),
        source,
    })
}

/// Repository checkouts directly under an assignment directory, sorted by name.
/// Hidden entries (including the metadata dir) are not repositories.
pub fn list_repo_dirs(assignment_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let io_err = |source| StoreError::Io {
        path: assignment_dir.to_path_buf(),
        source,
    };
    let mut dirs = Vec::new();
    for entry in fs::read_dir(assignment_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        dirs.push(entry.path());
    }
    dirs.sort();
    Ok(dirs)
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// File-based exclusive lock guard. Released on drop.
#[derive(Debug)]
pub struct LockGuard {
    _file: fs::File,
}

/// Take the run lock without waiting; a held lock is reported as [`StoreError::Busy`].
pub fn try_lock_run(path: &Path) -> Result<LockGuard, StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StoreError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    file.try_lock_exclusive().map_err(|_| StoreError::Busy {
        path: path.to_path_buf(),
    })?;
    Ok(LockGuard { _file: file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = assignment_dir(tmp.path(), "hw1");
        prepare_assignment_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn prepare_clears_previous_run() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = assignment_dir(tmp.path(), "hw1");
        fs::create_dir_all(dir.join("hw1-alice").join("src")).unwrap();
        fs::write(dir.join("avgLinesInserted.txt"), "old").unwrap();

        prepare_assignment_dir(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 0);
    }

    #[test]
    fn prepare_refuses_plain_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("hw1");
        fs::write(&dir, "not a dir").unwrap();
        let err = prepare_assignment_dir(&dir).unwrap_err();
        assert!(matches!(err, StoreError::CannotClear { .. }));
        assert!(err.to_string().contains("could not be cleared"));
    }

    #[test]
    fn list_repo_dirs_skips_hidden_and_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("hw1-bob")).unwrap();
        fs::create_dir_all(tmp.path().join("hw1-alice")).unwrap();
        fs::create_dir_all(tmp.path().join(META_DIR)).unwrap();
        fs::write(tmp.path().join("avgLinesInserted.txt"), "x").unwrap();

        let dirs = list_repo_dirs(tmp.path()).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["hw1-alice", "hw1-bob"]);
    }

    #[test]
    fn lock_path_sits_beside_assignment() {
        let p = run_lock_path(Path::new("/out/hw1"));
        assert_eq!(p, PathBuf::from("/out/.hw1.rewind.lock"));
    }

    #[test]
    fn second_lock_is_busy() {
        let tmp = tempfile::tempdir().unwrap();
        let lock_path = tmp.path().join("run.lock");
        let guard = try_lock_run(&lock_path).unwrap();
        assert!(matches!(
            try_lock_run(&lock_path),
            Err(StoreError::Busy { .. })
        ));
        drop(guard);
        assert!(try_lock_run(&lock_path).is_ok());
    }

    #[test]
    fn write_atomic_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("report.txt");
        write_atomic(&path, b"hello world").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world");
    }
}
