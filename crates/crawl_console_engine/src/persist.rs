use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
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

/// Writes files under one directory through a temp file plus rename, so a
/// reader never sees a partially written file.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut pending = self.begin(filename)?;
        pending.write_chunk(content)?;
        pending.commit()
    }

    /// Starts an incremental write; nothing appears at the target until
    /// [`PendingFile::commit`]. Dropping the pending file discards it.
    pub fn begin(&self, filename: &str) -> Result<PendingFile, PersistError> {
        ensure_output_dir(&self.dir)?;
        let tmp = NamedTempFile::new_in(&self.dir)?;
        Ok(PendingFile {
            tmp,
            target: self.dir.join(filename),
            written: 0,
        })
    }
}

pub struct PendingFile {
    tmp: NamedTempFile,
    target: PathBuf,
    written: u64,
}

impl PendingFile {
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), PersistError> {
        self.tmp.write_all(chunk)?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn commit(mut self) -> Result<PathBuf, PersistError> {
        self.tmp.flush()?;
        self.tmp.as_file_mut().sync_all()?;

        // Replace existing file if present.
        if self.target.exists() {
            fs::remove_file(&self.target)?;
        }
        self.tmp
            .persist(&self.target)
            .map_err(|e| PersistError::Io(e.error))?;
        Ok(self.target)
    }
}
