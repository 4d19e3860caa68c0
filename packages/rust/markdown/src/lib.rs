//! Markdown preprocessing for combined documents.
//!
//! Cleans individual source documents, rewrites links between them into
//! in-document anchors, and renders the boundary markers that separate them
//! once concatenated.

mod cleanup;
mod fence;
mod links;

use tracing::{debug, instrument};

pub use links::{AnchorMap, anchor_for, normalize_path, rewrite_links};

/// Prepare one source document for concatenation.
///
/// 1. Strips YAML frontmatter
/// 2. Normalizes whitespace, code fence languages, and blank-line runs
/// 3. Rewrites links to other manifest entries into anchors
///
/// `source_path` is the document's normalised manifest path.
#[instrument(skip(md, anchors), fields(len = md.len()))]
pub fn preprocess(md: &str, source_path: &str, anchors: &AnchorMap) -> String {
    let cleaned = cleanup::run_pipeline(md);
    let linked = rewrite_links(&cleaned, source_path, anchors);

    debug!(raw_len = md.len(), final_len = linked.len(), "preprocessed document");
    linked
}

// ---------------------------------------------------------------------------
// Boundary markers
// ---------------------------------------------------------------------------

/// Raw LaTeX part break for a titled manifest part.
pub fn part_break(title: &str) -> String {
    format!("\\part{{{}}}\n", escape_latex(title))
}

/// Empty span carrying a document's anchor, so rewritten links land on it.
pub fn anchor_target(anchor: &str) -> String {
    format!("[]{{#{anchor}}}\n")
}

/// Escape all ten LaTeX special characters in a part title.
fn escape_latex(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push_str("\\textbackslash{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_cleans_and_relinks() {
        let anchors = AnchorMap::from_paths(["SKILL.md", "references/primer.md"]);
        let input = "---\nname: skill\n---\n\nRead the [primer](references/primer.md).\n\n```ts\nlet x = 1;\n```\n";
        let out = preprocess(input, "SKILL.md", &anchors);

        assert_eq!(
            out,
            "Read the [primer](#doc-references-primer).\n\n```typescript\nlet x = 1;\n```\n"
        );
    }

    #[test]
    fn preprocess_empty_document() {
        let out = preprocess("", "a.md", &AnchorMap::default());
        assert_eq!(out, "\n");
    }

    #[test]
    fn part_break_escapes_specials() {
        assert_eq!(part_break("Foundation"), "\\part{Foundation}\n");
        assert_eq!(part_break("Tips & Tricks"), "\\part{Tips \\& Tricks}\n");
    }

    #[test]
    fn part_break_escapes_backslash_caret_tilde() {
        assert_eq!(
            part_break(r"C:\src ~ 2^n"),
            "\\part{C:\\textbackslash{}src \\textasciitilde{} 2\\textasciicircum{}n}\n"
        );
    }

    #[test]
    fn anchor_target_is_pandoc_span() {
        assert_eq!(anchor_target("doc-skill"), "[]{#doc-skill}\n");
    }
}
