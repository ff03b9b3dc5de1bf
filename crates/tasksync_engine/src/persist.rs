use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure the directory exists; create it if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Temp file in the target directory; only becomes visible under its final name on `commit`.
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn create(dir: &Path, filename: &str) -> Result<Self, PersistError> {
        ensure_output_dir(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            tmp,
            target: dir.join(filename),
        })
    }

    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), PersistError> {
        self.tmp.write_all(chunk)?;
        Ok(())
    }

    /// Flushes and renames over any existing file of the same name.
    pub fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;
        if self.target.exists() {
            fs::remove_file(&self.target)?;
        }
        self.tmp
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}

/// Atomically write `content` to `path`.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<PathBuf, PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| PersistError::OutputDir(format!("{} has no file name", path.display())))?;
    let mut staged = StagedFile::create(dir, filename)?;
    staged.write_chunk(content)?;
    staged.commit()
}
