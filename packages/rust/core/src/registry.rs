//! Language guide registry validation.
//!
//! Each language guide lives under `languages/<id>/`. The registry says which
//! files a guide must ship and which it may omit; it is checked against the
//! source tree before anything is written.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use docpress_shared::{DocpressError, LanguageGuide, Result};

/// Directory under the source root holding one subdirectory per language.
const LANGUAGES_DIR: &str = "languages";

/// Outcome of a successful registry check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCheck {
    /// Number of guides checked.
    pub guides: usize,
    /// Optional files that are absent.
    pub missing_optional: Vec<PathBuf>,
}

/// Check every registered guide against the source tree.
///
/// A missing required file fails the build; a missing optional file is
/// logged and reported.
pub fn validate_languages(source_root: &Path, guides: &[LanguageGuide]) -> Result<RegistryCheck> {
    let mut check = RegistryCheck {
        guides: guides.len(),
        ..RegistryCheck::default()
    };

    for guide in guides {
        let dir = source_root.join(LANGUAGES_DIR).join(&guide.id);

        for file in &guide.required {
            let path = dir.join(file);
            if !path.is_file() {
                return Err(DocpressError::not_found(
                    "required language guide file",
                    path,
                ));
            }
        }

        for file in &guide.optional {
            let path = dir.join(file);
            if !path.is_file() {
                warn!(language = %guide.id, path = %path.display(), "optional guide file missing");
                check.missing_optional.push(path);
            }
        }

        debug!(language = %guide.id, "language guide present");
    }

    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "# Guide\n").unwrap();
    }

    #[test]
    fn complete_registry_passes() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "languages/python/guide.md");
        write(tmp.path(), "languages/python/examples.md");

        let guides = [LanguageGuide::new("python", &["guide.md"], &["examples.md"])];
        let check = validate_languages(tmp.path(), &guides).unwrap();
        assert_eq!(check.guides, 1);
        assert!(check.missing_optional.is_empty());
    }

    #[test]
    fn missing_optional_is_reported_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "languages/python/guide.md");

        let guides = [LanguageGuide::new("python", &["guide.md"], &["examples.md"])];
        let check = validate_languages(tmp.path(), &guides).unwrap();
        assert_eq!(
            check.missing_optional,
            vec![tmp.path().join("languages/python/examples.md")]
        );
    }

    #[test]
    fn missing_required_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        let guides = [LanguageGuide::new("csharp", &["guide.md"], &[])];

        let err = validate_languages(tmp.path(), &guides).unwrap_err();
        assert_eq!(err.category(), docpress_shared::ErrorCategory::Configuration);
        assert!(err.to_string().contains("csharp"));
    }

    #[test]
    fn empty_registry_passes() {
        let tmp = tempfile::tempdir().unwrap();
        let check = validate_languages(tmp.path(), &[]).unwrap();
        assert_eq!(check, RegistryCheck::default());
    }
}
