//! Combined document assembler.
//!
//! Reads the manifest's source documents in order, preprocesses and relinks
//! them, and writes one combined Markdown document for the converter.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use docpress_markdown::{AnchorMap, anchor_target, part_break, preprocess};
use docpress_shared::{DocpressError, Result, SourceDocument};

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    /// Where the combined document was written.
    pub path: PathBuf,
    /// Number of source documents combined.
    pub document_count: usize,
    /// Length of the combined document in bytes.
    pub bytes: usize,
    /// SHA-256 of the combined document (hex).
    pub sha256: String,
}

/// Check that the source root and every manifest entry exist.
///
/// Runs before anything is read or written, so a bad manifest never leaves a
/// partial artifact behind.
pub fn check_sources(root: &Path, docs: &[SourceDocument]) -> Result<()> {
    if !root.is_dir() {
        return Err(DocpressError::not_found("source root", root));
    }

    for doc in docs {
        let path = root.join(&doc.path);
        if !path.is_file() {
            return Err(DocpressError::not_found("source document", path));
        }
    }

    Ok(())
}

/// Build the combined document text in memory.
///
/// Layout per document, in manifest order:
/// ```text
/// \part{Title}          (first document of a titled part only)
///
/// []{#doc-<slug>}       (anchor target for rewritten links)
///
/// <preprocessed body>
/// ```
/// Consecutive documents are separated by a blank line. An empty manifest
/// yields an empty string.
#[instrument(skip_all, fields(root = %root.display(), documents = docs.len()))]
pub fn combine(root: &Path, docs: &[SourceDocument]) -> Result<String> {
    check_sources(root, docs)?;

    let anchors = AnchorMap::from_paths(docs.iter().map(|d| d.path.as_str()));
    let mut combined = String::new();

    for doc in docs {
        let path = root.join(&doc.path);
        let bytes = std::fs::read(&path).map_err(|e| DocpressError::io(&path, e))?;
        let text = String::from_utf8(bytes).map_err(|source| DocpressError::Decode {
            path: path.clone(),
            source,
        })?;

        if doc.position > 0 {
            combined.push('\n');
        }
        if let Some(title) = &doc.part_break {
            combined.push_str(&part_break(title));
            combined.push('\n');
        }
        if let Some(anchor) = anchors.get(&doc.path) {
            combined.push_str(&anchor_target(anchor));
            combined.push('\n');
        }
        combined.push_str(&preprocess(&text, &doc.path, &anchors));

        debug!(path = %doc.path, position = doc.position, "document combined");
    }

    Ok(combined)
}

/// Assemble the manifest into `dest`.
///
/// The whole document is built in memory and then written atomically
/// (temp file + rename), so `dest` is either the previous version or the
/// complete new one. The parent directory must already exist.
#[instrument(skip_all, fields(dest = %dest.display(), documents = docs.len()))]
pub fn assemble(root: &Path, docs: &[SourceDocument], dest: &Path) -> Result<AssembleResult> {
    let combined = combine(root, docs)?;
    write_atomic(dest, &combined)?;

    let mut hasher = Sha256::new();
    hasher.update(combined.as_bytes());
    let sha256 = format!("{:x}", hasher.finalize());

    info!(
        documents = docs.len(),
        bytes = combined.len(),
        path = %dest.display(),
        "combined document written"
    );

    Ok(AssembleResult {
        path: dest.to_path_buf(),
        document_count: docs.len(),
        bytes: combined.len(),
        sha256,
    })
}

/// Write to a hidden sibling temp file, then rename over `dest`.
fn write_atomic(dest: &Path, content: &str) -> Result<()> {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "combined".to_string());
    let temp = dest.with_file_name(format!(".{file_name}.tmp"));

    if let Err(e) = std::fs::write(&temp, content) {
        let _ = std::fs::remove_file(&temp);
        return Err(DocpressError::io(&temp, e));
    }

    std::fs::rename(&temp, dest).map_err(|e| {
        let _ = std::fs::remove_file(&temp);
        DocpressError::io(dest, e)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
