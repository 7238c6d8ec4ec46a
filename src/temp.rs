//! Temporary file management module
//!
//! Every episode is processed under a fresh [`RunToken`] that is embedded in
//! the names of its downloaded files. [`RunFiles`] keeps track of those files
//! so they can be removed once the episode has been muxed.

use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Unique token namespacing the temporary files of one episode run
///
/// Tokens are ULIDs (monotonic, sortable unique identifiers), so two runs
/// never produce the same file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunToken(ulid::Ulid);

impl RunToken {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for RunToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The temporary files written during one episode run
///
/// Files are only removed by an explicit [`RunFiles::cleanup`]. When a run
/// fails the files stay on disk so they can be inspected or reused.
#[derive(Debug)]
pub(crate) struct RunFiles {
    token: RunToken,
    paths: Vec<PathBuf>,
}

impl RunFiles {
    pub fn new(token: RunToken) -> Self {
        Self {
            token,
            paths: Vec::new(),
        }
    }

    pub fn token(&self) -> RunToken {
        self.token
    }

    /// Registers a file produced for this run
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Deletes every tracked file that exists and returns the removed paths
    pub fn cleanup(self) -> io::Result<Vec<PathBuf>> {
        let mut removed = Vec::new();

        for path in self.paths {
            match fs::remove_file(&path) {
                Ok(()) => removed.push(path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}

/// Analyzes a file to determine if it's a video file
///
/// Only reads the first 8KB of the file for efficiency.
pub(crate) fn is_video_file(file_path: &Path) -> bool {
    const BUFFER_SIZE: usize = 8192;

    let mut file = match fs::File::open(file_path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let bytes_read = match file.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return false,
    };

    buffer.truncate(bytes_read);

    infer::is_video(&buffer)
}
