//! Document discovery: walk a data directory and load supported text files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::RagError;
use crate::record::title_from_source;

/// Default file-name prefix of documents that are never indexed.
pub const DEFAULT_SKIP_PREFIX: &str = "Discord RAG FAQ Chatbot";

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];
const BINARY_EXTENSIONS: &[&str] = &["pdf", "docx"];

/// A loaded source document.
#[derive(Clone, Debug)]
pub struct SourceDoc {
    pub path: PathBuf,
    /// Path as stored in payloads (`/` separated, relative to the walk root's parent).
    pub source: String,
    pub title: String,
    pub text: String,
}

/// What the walk found besides documents.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryReport {
    pub docs: Vec<SourceDoc>,
    /// Skipped by name prefix.
    pub skipped_prefix: usize,
    /// Known but unsupported formats (PDF/DOCX).
    pub skipped_unsupported: Vec<PathBuf>,
    /// Supported files without any non-whitespace text.
    pub skipped_empty: usize,
}

/// Walks `root` recursively (sorted by file name) and loads `.txt`, `.md`
/// and `.markdown` files. Files whose name starts with `skip_prefix` are ignored.
pub fn discover_documents(
    root: impl AsRef<Path>,
    skip_prefix: Option<&str>,
) -> Result<DiscoveryReport, RagError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(RagError::Config(format!(
            "data directory {} does not exist",
            root.display()
        )));
    }
    let base = root.parent().unwrap_or(root);

    let mut report = DiscoveryReport::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let supported = TEXT_EXTENSIONS.contains(&ext.as_str());
        let binary = BINARY_EXTENSIONS.contains(&ext.as_str());
        if !supported && !binary {
            continue;
        }
        if skip_prefix.is_some_and(|p| !p.is_empty() && name.starts_with(p)) {
            debug!(path = %path.display(), "skipping by prefix");
            report.skipped_prefix += 1;
            continue;
        }
        if binary {
            warn!(path = %path.display(), "PDF/DOCX extraction is not supported; convert to .txt or .md");
            report.skipped_unsupported.push(path.to_path_buf());
            continue;
        }

        let bytes = fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.trim().is_empty() {
            report.skipped_empty += 1;
            continue;
        }

        let source = path
            .strip_prefix(base)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        report.docs.push(SourceDoc {
            path: path.to_path_buf(),
            title: title_from_source(&source),
            source,
            text,
        });
    }

    debug!(docs = report.docs.len(), "discovery finished");
    Ok(report)
}
