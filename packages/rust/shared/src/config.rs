//! Build configuration for docpress.
//!
//! An optional `docpress.toml` lives in the build directory. Every field has a
//! default, and the defaults describe the Clean Architecture guide layout, so
//! a build directory without a config file still builds.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocpressError, Result};
use crate::types::{LanguageGuide, Manifest, ManifestPart};

/// Default configuration file name, looked up in the build directory.
pub const CONFIG_FILE_NAME: &str = "docpress.toml";

/// File name of the JSON run summary written next to the artifact.
const REPORT_FILE_NAME: &str = "build-report.json";

// ---------------------------------------------------------------------------
// Config structs (matching docpress.toml schema)
// ---------------------------------------------------------------------------

/// Top-level build config, deserialized from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Fixed filesystem layout.
    #[serde(default)]
    pub paths: PathsConfig,

    /// External programs.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Document manifest, in reading order.
    #[serde(default = "default_parts")]
    pub parts: Vec<ManifestPart>,

    /// Language guide registry.
    #[serde(default = "default_languages")]
    pub languages: Vec<LanguageGuide>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            tools: ToolsConfig::default(),
            parts: default_parts(),
            languages: default_languages(),
        }
    }
}

impl BuildConfig {
    /// The document manifest described by `[[parts]]`.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            parts: self.parts.clone(),
        }
    }

    /// Resolve every configured path against the build directory.
    pub fn layout(&self, build_dir: &Path) -> BuildLayout {
        let p = &self.paths;
        let output_dir = build_dir.join(&p.output_dir);
        let staging = output_dir.join(format!(".partial-{}", p.artifact));

        BuildLayout {
            build_dir: build_dir.to_path_buf(),
            source_root: build_dir.join(&p.source_root),
            intermediate: output_dir.join(&p.intermediate),
            artifact: output_dir.join(&p.artifact),
            staging,
            report: output_dir.join(REPORT_FILE_NAME),
            metadata: build_dir.join(&p.metadata),
            styling: build_dir.join(&p.styling),
            output_dir,
        }
    }
}

/// `[paths]` section. Relative paths resolve against the build directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the documentation tree the manifest is relative to.
    #[serde(default = "default_source_root")]
    pub source_root: String,

    /// Directory for the intermediate and final artifacts.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File name of the combined Markdown document.
    #[serde(default = "default_intermediate")]
    pub intermediate: String,

    /// File name of the rendered artifact.
    #[serde(default = "default_artifact")]
    pub artifact: String,

    /// Metadata descriptor handed to the converter untouched.
    #[serde(default = "default_metadata")]
    pub metadata: String,

    /// Styling descriptor handed to the converter untouched.
    #[serde(default = "default_styling")]
    pub styling: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            output_dir: default_output_dir(),
            intermediate: default_intermediate(),
            artifact: default_artifact(),
            metadata: default_metadata(),
            styling: default_styling(),
        }
    }
}

fn default_source_root() -> String {
    "..".into()
}
fn default_output_dir() -> String {
    "output".into()
}
fn default_intermediate() -> String {
    "combined.md".into()
}
fn default_artifact() -> String {
    "clean-architecture.pdf".into()
}
fn default_metadata() -> String {
    "metadata.yaml".into()
}
fn default_styling() -> String {
    "header.tex".into()
}

/// `[tools]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Converter executable.
    #[serde(default = "default_converter")]
    pub converter: String,

    /// Page-counting executable. Its absence is not an error.
    #[serde(default = "default_page_counter")]
    pub page_counter: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            converter: default_converter(),
            page_counter: default_page_counter(),
        }
    }
}

fn default_converter() -> String {
    "pandoc".into()
}
fn default_page_counter() -> String {
    "pdfinfo".into()
}

fn default_parts() -> Vec<ManifestPart> {
    vec![
        ManifestPart::new(
            "Foundation",
            &[
                "SKILL.md",
                "references/primer.md",
                "references/core-concepts.md",
            ],
        ),
        ManifestPart::new(
            "Layer Patterns",
            &[
                "references/layer-patterns.md",
                "references/vertical-slicing.md",
                "references/implementation-strategy.md",
            ],
        ),
        ManifestPart::new(
            "Language Guides",
            &[
                "languages/python/guide.md",
                "languages/python/examples.md",
                "languages/typescript/guide.md",
                "languages/csharp/guide.md",
            ],
        ),
        ManifestPart::new(
            "Practical Application",
            &[
                "templates/decision-tree.md",
                "templates/user-story-checklist.md",
                "templates/architecture-review.md",
            ],
        ),
        ManifestPart::new(
            "Complete Example",
            &[
                "example-task-manager/README.md",
                "example-task-manager/domain.md",
                "example-task-manager/application.md",
                "example-task-manager/infrastructure.md",
                "example-task-manager/frameworks.md",
            ],
        ),
        ManifestPart::new("Resources", &["references/external-resources.md"]),
    ]
}

fn default_languages() -> Vec<LanguageGuide> {
    vec![
        LanguageGuide::new("python", &["guide.md"], &["examples.md"]),
        LanguageGuide::new("typescript", &["guide.md"], &[]),
        LanguageGuide::new("csharp", &["guide.md"], &[]),
    ]
}

// ---------------------------------------------------------------------------
// Resolved layout
// ---------------------------------------------------------------------------

/// Every path a build touches, resolved against the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    pub build_dir: PathBuf,
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    pub intermediate: PathBuf,
    pub artifact: PathBuf,
    /// Where the converter writes before verification promotes the file.
    pub staging: PathBuf,
    pub report: PathBuf,
    pub metadata: PathBuf,
    pub styling: PathBuf,
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the config file for a build directory.
pub fn config_file_path(build_dir: &Path) -> PathBuf {
    build_dir.join(CONFIG_FILE_NAME)
}

/// Load the config for a build directory.
///
/// An explicit path must exist. Without one, `docpress.toml` in the build
/// directory is used when present and defaults otherwise.
pub fn load_config(build_dir: &Path, explicit: Option<&Path>) -> Result<BuildConfig> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(DocpressError::not_found("config file", path));
        }
        return load_config_from(path);
    }

    let path = config_file_path(build_dir);
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(BuildConfig::default());
    }

    load_config_from(&path)
}

/// Load the build config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<BuildConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocpressError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocpressError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Write a default config file into the build directory.
///
/// Refuses to overwrite an existing file. Returns the path written.
pub fn init_config(build_dir: &Path) -> Result<PathBuf> {
    let path = config_file_path(build_dir);
    if path.exists() {
        return Err(DocpressError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&BuildConfig::default())
        .map_err(|e| DocpressError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocpressError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
