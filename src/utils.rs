// ABOUTME: Utility functions for the html2pptx application
// ABOUTME: Directory validation and creation, absolute paths and file URLs

use crate::errors::{ConvertError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Validate that a directory exists
pub fn validate_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ConvertError::InputNotFound(path.to_path_buf()));
    }
    if !path.is_dir() {
        return Err(ConvertError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(ConvertError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent_directory_exists(file_path: &Path) -> Result<()> {
    match file_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_directory_exists(parent),
        _ => Ok(()),
    }
}

/// Get the absolute path
pub fn get_absolute_path(path: &Path) -> std::io::Result<PathBuf> {
    std::fs::canonicalize(path)
}

/// Build the `file://` URL a browser should load for a local document
pub fn file_url(path: &Path) -> std::io::Result<String> {
    let absolute = get_absolute_path(path)?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Cannot express {:?} as a file URL", absolute),
            )
        })
}
