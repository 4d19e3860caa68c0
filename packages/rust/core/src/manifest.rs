//! Manifest resolution: flatten parts into positioned source documents.

use std::collections::HashSet;

use tracing::{debug, instrument};

use docpress_markdown::normalize_path;
use docpress_shared::{DocpressError, Manifest, Result, SourceDocument};

/// Flatten the manifest into reading order.
///
/// Paths are normalised (`./a.md` and `a.md` are the same entry). Absolute
/// paths, paths escaping the source root, and duplicate entries are rejected.
#[instrument(skip_all, fields(parts = manifest.parts.len(), entries = manifest.len()))]
pub fn resolve_manifest(manifest: &Manifest) -> Result<Vec<SourceDocument>> {
    let mut seen = HashSet::new();
    let mut docs = Vec::with_capacity(manifest.len());

    for part in &manifest.parts {
        for (i, raw) in part.files.iter().enumerate() {
            let path = normalize_path(raw).ok_or_else(|| {
                DocpressError::config(format!(
                    "manifest entry {raw:?} must be a relative path inside the source root"
                ))
            })?;

            if !seen.insert(path.clone()) {
                return Err(DocpressError::config(format!(
                    "manifest lists {path:?} more than once"
                )));
            }

            let part_break = if i == 0 { part.title.clone() } else { None };
            docs.push(SourceDocument {
                position: docs.len(),
                path,
                part_break,
            });
        }
    }

    debug!(documents = docs.len(), "manifest resolved");
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpress_shared::ManifestPart;

    #[test]
    fn flattens_parts_in_order() {
        let manifest = Manifest {
            parts: vec![
                ManifestPart::new("Foundation", &["SKILL.md", "references/primer.md"]),
                ManifestPart::new("Empty", &[]),
                ManifestPart::new("Resources", &["references/external-resources.md"]),
            ],
        };

        let docs = resolve_manifest(&manifest).unwrap();
        let paths: Vec<_> = docs.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            ["SKILL.md", "references/primer.md", "references/external-resources.md"]
        );
        assert_eq!(docs[2].position, 2);
        assert_eq!(docs[0].part_break.as_deref(), Some("Foundation"));
        assert_eq!(docs[1].part_break, None);
        assert_eq!(docs[2].part_break.as_deref(), Some("Resources"));
    }

    #[test]
    fn untitled_part_has_no_break() {
        let manifest = Manifest {
            parts: vec![ManifestPart {
                title: None,
                files: vec!["intro.md".into()],
            }],
        };
        let docs = resolve_manifest(&manifest).unwrap();
        assert_eq!(docs[0].part_break, None);
    }

    #[test]
    fn empty_manifest_is_allowed() {
        let docs = resolve_manifest(&Manifest::default()).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn duplicates_are_rejected_after_normalisation() {
        let manifest = Manifest {
            parts: vec![
                ManifestPart::new("A", &["intro.md"]),
                ManifestPart::new("B", &["./intro.md"]),
            ],
        };
        let err = resolve_manifest(&manifest).unwrap_err();
        assert!(err.to_string().contains("more than once"));
        assert!(err.to_string().contains("intro.md"));
    }

    #[test]
    fn escaping_paths_are_rejected() {
        let manifest = Manifest {
            parts: vec![ManifestPart::new("A", &["../outside.md"])],
        };
        let err = resolve_manifest(&manifest).unwrap_err();
        assert!(err.to_string().contains("../outside.md"));
    }
}
