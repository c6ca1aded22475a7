// Loader module
// Reads PDF and plain-text files from disk into documents

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::splitter::{Document, Metadata};
use crate::{RagError, Result};

pub const FILE_NAME_KEY: &str = "file_name";
pub const DIRECTORY_KEY: &str = "absolute_directory_path";

/// Supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    /// Detect the format from the file extension, ignoring case
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Files that failed to load, alongside the documents that did
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<(PathBuf, RagError)>,
}

/// Load one file, attaching its name and absolute directory as metadata
#[inline]
pub fn load_document(path: &Path) -> Result<Document> {
    let kind = DocumentKind::from_path(path).ok_or_else(|| {
        RagError::Document(format!("Unsupported file type: {}", path.display()))
    })?;

    let absolute = path.canonicalize()?;
    let text = match kind {
        DocumentKind::Pdf => extract_pdf_text(&absolute)?,
        DocumentKind::Text => fs::read_to_string(&absolute)?,
    };

    let mut metadata = Metadata::new();
    if let Some(name) = absolute.file_name() {
        metadata.insert(FILE_NAME_KEY.to_string(), name.to_string_lossy().into_owned());
    }
    if let Some(parent) = absolute.parent() {
        metadata.insert(DIRECTORY_KEY.to_string(), parent.to_string_lossy().into_owned());
    }

    debug!(
        "Loaded {} ({} chars, {:?})",
        absolute.display(),
        text.chars().count(),
        kind
    );

    Ok(Document::with_metadata(text, metadata))
}

/// Expand `paths` into supported files, descending into directories.
/// Explicitly named files are kept even when their extension is unknown so
/// that loading reports them.
#[inline]
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_directory(path, &mut files)?;
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn collect_directory(directory: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(directory)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for entry in entries {
        // Symlinked directories can form cycles
        if entry.is_symlink() && entry.is_dir() {
            debug!("Skipping symlinked directory {}", entry.display());
        } else if entry.is_dir() {
            collect_directory(&entry, files)?;
        } else if DocumentKind::from_path(&entry).is_some() {
            files.push(entry);
        } else {
            debug!("Skipping unsupported file {}", entry.display());
        }
    }
    Ok(())
}

/// Load every supported file under `paths`. Unreadable files are reported,
/// not fatal.
#[inline]
pub fn load_paths(paths: &[PathBuf]) -> Result<LoadReport> {
    let mut report = LoadReport::default();
    for file in collect_files(paths)? {
        match load_document(&file) {
            Ok(document) => report.documents.push(document),
            Err(error) => {
                warn!("Failed to load {}: {}", file.display(), error);
                report.failures.push((file, error));
            }
        }
    }
    Ok(report)
}

fn extract_pdf_text(path: &Path) -> Result<String> {
    let pdf = lopdf::Document::load(path)
        .map_err(|e| RagError::Document(format!("Failed to open {}: {}", path.display(), e)))?;

    let page_numbers: Vec<u32> = pdf.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Ok(String::new());
    }

    pdf.extract_text(&page_numbers).map_err(|e| {
        RagError::Document(format!(
            "Failed to extract text from {}: {}",
            path.display(),
            e
        ))
    })
}
