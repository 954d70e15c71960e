//! Struct archiving functionality
//!
//! Records are written as rows of a CSV file inside the session's archive
//! directory. Record types must only contain primitive fields (numbers,
//! strings, booleans) as CSV has no notion of nesting.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use std::path::{Path, PathBuf};
use std::fs::{File, OpenOptions};
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    path: PathBuf,
    writer: Writer<File>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot open the archive file {0:?}: {1}")]
    OpenError(PathBuf, std::io::Error),

    #[error("Cannot write a record to {0:?}: {1}")]
    WriteError(PathBuf, csv::Error),

    #[error("Cannot flush the archive {0:?}: {1}")]
    FlushError(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path))
    }

    /// Create a new archiver writing to an absolute path, truncating any
    /// existing file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| ArchiveError::OpenError(path.clone(), e))?;

        let writer = WriterBuilder::new()
            .has_headers(true)
            .from_writer(file);

        Ok(Self { path, writer })
    }

    /// Serialise a record into the archive.
    ///
    /// The record is flushed to disk immediately.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer.serialize(record)
            .map_err(|e| ArchiveError::WriteError(self.path.clone(), e))?;
        self.writer.flush()
            .map_err(|e| ArchiveError::FlushError(self.path.clone(), e))
    }

    /// Path of the archive file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct CaptureRow {
        run: u64,
        height_mm: f64,
        file: String,
    }

    #[test]
    fn test_archive_rows() {
        let path = std::env::temp_dir().join(format!("archive_test_{}.csv", std::process::id()));

        {
            let mut arch = Archiver::create(&path).unwrap();
            arch.serialise(CaptureRow { run: 0, height_mm: 75.0, file: "run0-75mm.png".into() })
                .unwrap();
            arch.serialise(CaptureRow { run: 0, height_mm: 100.5, file: "run0-100mm.png".into() })
                .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec![
            "run,height_mm,file",
            "0,75.0,run0-75mm.png",
            "0,100.5,run0-100mm.png",
        ]);

        std::fs::remove_file(&path).ok();
    }
}
