use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("output path {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("could not write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes `content` to `dir/filename`, creating `dir` if needed.
///
/// The bytes go to a temp file in `dir` that is then renamed over the target,
/// so an earlier export of the same name stays intact until the new one is
/// complete.
pub fn write_atomically(dir: &Path, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
    if dir.exists() && !dir.is_dir() {
        return Err(PersistError::NotADirectory(dir.to_path_buf()));
    }
    let in_dir = |source: io::Error| PersistError::Io {
        path: dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(in_dir)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(in_dir)?;
    tmp.write_all(content).map_err(in_dir)?;
    tmp.as_file().sync_all().map_err(in_dir)?;

    let target = dir.join(filename);
    tmp.persist(&target).map_err(|err| PersistError::Io {
        path: target.clone(),
        source: err.error,
    })?;
    Ok(target)
}
