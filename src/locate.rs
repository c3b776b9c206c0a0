// ABOUTME: Document discovery for the html2pptx application
// ABOUTME: Lists input documents and orders them by the number embedded in each file name

use crate::errors::Result;
use crate::utils;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// A document to render, in deck order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    pub path: PathBuf,
    /// Sort key taken from the file name; never persisted.
    pub ordinal: u64,
}

impl DocumentRef {
    pub fn new(path: PathBuf) -> Self {
        let ordinal = extract_ordinal(&file_name_of(&path));
        Self { path, ordinal }
    }

    /// File name used in logs and slide titles
    pub fn name(&self) -> String {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Value of the first run of ASCII digits in `name`, or 0 when there is none.
///
/// Runs too long for a `u64` saturate to `u64::MAX`.
pub fn extract_ordinal(name: &str) -> u64 {
    name.split(|c: char| !c.is_ascii_digit())
        .find(|run| !run.is_empty())
        .map(|digits| digits.parse::<u64>().unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Order documents by ordinal, keeping listing order for equal ordinals.
pub fn sort_documents(documents: &mut [DocumentRef]) {
    // sort_by_key is stable
    documents.sort_by_key(|document| document.ordinal);
}

/// List the documents in `dir` whose extension is `extension`, in deck order.
///
/// A missing directory is an error; a directory without matches is not.
pub fn locate_documents(dir: &Path, extension: &str) -> Result<Vec<DocumentRef>> {
    utils::validate_directory_exists(dir)?;
    let extension = extension.trim_start_matches('.');

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            debug!("Skipping {:?}: not a .{} document", path, extension);
            continue;
        }
        documents.push(DocumentRef::new(path));
    }

    sort_documents(&mut documents);
    info!("Found {} .{} documents in {:?}", documents.len(), extension, dir);
    Ok(documents)
}
