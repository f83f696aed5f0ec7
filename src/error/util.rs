//! Utility functions for error handling around the filesystem

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Result, UdiError};

/// Open an input file, turning the common failure modes into readable errors
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(UdiError::io(
            path,
            io::Error::new(io::ErrorKind::NotFound, format!("file not found (needed for {purpose})")),
        ));
    }

    if !path.is_file() {
        return Err(UdiError::io(
            path,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not a file (expected a file for {purpose})"),
            ),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let message = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                format!("permission denied opening {purpose} - check file permissions")
            }
            _ => format!("failed to open file for {purpose}: {e}"),
        };
        UdiError::io(path, io::Error::new(e.kind(), message))
    })
}

/// Check that a directory exists and is readable
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.is_dir() {
        return Err(UdiError::io(
            path,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found (needed for {purpose})"),
            ),
        ));
    }

    fs::read_dir(path)
        .map(|_| ())
        .map_err(|e| UdiError::io(path, e))
}
