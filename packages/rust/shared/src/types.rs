//! Core domain types for docpress builds.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// A titled group of documents. The title becomes a part break in the
/// combined document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPart {
    /// Part title (e.g. "Foundation"). Untitled parts get no part break.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document paths relative to the source root, in reading order.
    #[serde(default)]
    pub files: Vec<String>,
}

impl ManifestPart {
    /// Build a titled part from string slices.
    pub fn new(title: &str, files: &[&str]) -> Self {
        Self {
            title: Some(title.to_string()),
            files: files.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

/// The ordered document manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub parts: Vec<ManifestPart>,
}

impl Manifest {
    /// Total number of document entries across all parts.
    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One manifest entry, positioned in the flattened reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    /// Zero-based position in manifest order.
    pub position: usize,
    /// Normalised path relative to the source root (`/`-separated).
    pub path: String,
    /// Set on the first document of a titled part.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_break: Option<String>,
}

// ---------------------------------------------------------------------------
// Language guide registry
// ---------------------------------------------------------------------------

/// Registry entry for one language guide under `languages/<id>/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageGuide {
    /// Directory name under `languages/`.
    pub id: String,
    /// Files that must exist, relative to the language directory.
    #[serde(default)]
    pub required: Vec<String>,
    /// Files that may be missing; absence only produces a warning.
    #[serde(default)]
    pub optional: Vec<String>,
}

impl LanguageGuide {
    pub fn new(id: &str, required: &[&str], optional: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            required: required.iter().map(|f| (*f).to_string()).collect(),
            optional: optional.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Build state
// ---------------------------------------------------------------------------

/// Orchestrator state. Progress only moves forward; `Failed` absorbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Init,
    DirReady,
    Assembled,
    Converted,
    Verified,
    CleanedUp,
    Done,
    Failed,
}

impl BuildStage {
    /// Whether the orchestrator may move from `self` to `next`.
    ///
    /// Each stage advances to its successor, `Verified` may skip cleanup and
    /// go straight to `Done`, and any live stage may fail.
    pub fn can_advance_to(self, next: BuildStage) -> bool {
        use BuildStage::*;
        match (self, next) {
            (Failed, _) | (Done, _) => false,
            (_, Failed) => true,
            (Init, DirReady)
            | (DirReady, Assembled)
            | (Assembled, Converted)
            | (Converted, Verified)
            | (Verified, CleanedUp)
            | (Verified, Done)
            | (CleanedUp, Done) => true,
            _ => false,
        }
    }

    /// Human-readable label for status lines.
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::DirReady => "output directory ready",
            Self::Assembled => "documents assembled",
            Self::Converted => "converter finished",
            Self::Verified => "artifact verified",
            Self::CleanedUp => "intermediate removed",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Build report
// ---------------------------------------------------------------------------

/// What happened to the intermediate document at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CleanupOutcome {
    /// Cleanup was not requested; the intermediate file is retained.
    Retained,
    Removed,
    /// Deletion failed; the run still succeeded.
    Failed(String),
}

/// The final rendered file and what we know about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// `None` when no page-counting utility is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

/// `build-report.json`: summary of one successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of source documents assembled.
    pub document_count: usize,
    /// SHA-256 of the combined document (hex).
    pub combined_sha256: String,
    pub combined_bytes: usize,
    pub intermediate: PathBuf,
    pub artifact: BuildArtifact,
    pub cleanup: CleanupOutcome,
}
