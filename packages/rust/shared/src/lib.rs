//! Shared types, error model, and configuration for docpress.
//!
//! This crate is the foundation depended on by all other docpress crates.
//! It provides:
//! - [`DocpressError`], the unified error type
//! - Domain types ([`Manifest`], [`SourceDocument`], [`BuildStage`], [`BuildReport`])
//! - Configuration ([`BuildConfig`], [`BuildLayout`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    BuildConfig, BuildLayout, CONFIG_FILE_NAME, PathsConfig, ToolsConfig, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{DocpressError, ErrorCategory, Result};
pub use types::{
    BuildArtifact, BuildReport, BuildStage, CleanupOutcome, LanguageGuide, Manifest,
    ManifestPart, SourceDocument,
};
