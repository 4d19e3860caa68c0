//! Per-document cleanup pipeline.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The pipeline strips frontmatter and normalizes code fences and whitespace
//! so the documents concatenate cleanly.

use std::sync::LazyLock;

use regex::Regex;

use crate::fence::{FenceLine, FenceTracker};

/// Run the full cleanup pipeline on one source document.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = strip_frontmatter(md).to_string();

    result = normalize_whitespace(&result);
    result = normalize_code_fences(&result);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Strip YAML frontmatter
// ---------------------------------------------------------------------------

/// Remove a leading `---` … `---` (or `...`) block and the blank lines after it.
///
/// An opening delimiter without a closing one is left as-is; it is more likely
/// a thematic break than broken frontmatter.
pub(crate) fn strip_frontmatter(md: &str) -> &str {
    let Some(rest) = md
        .strip_prefix("---\n")
        .or_else(|| md.strip_prefix("---\r\n"))
    else {
        return md;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let delim = line.trim_end();
        if delim == "---" || delim == "..." {
            return rest[offset..].trim_start_matches(['\n', '\r']);
        }
    }

    md
}

// ---------------------------------------------------------------------------
// Pass 2: Normalize whitespace
// ---------------------------------------------------------------------------

/// Trim trailing whitespace on every line (this also drops `\r`).
fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Normalize code fence languages
// ---------------------------------------------------------------------------

/// Map fence language aliases to the names the highlighter knows.
///
/// Only opening fences are touched; lines inside a block (including nested
/// fence examples in a longer block) stay verbatim. Unknown identifiers are
/// lower-cased; bare fences are left alone.
fn normalize_code_fences(md: &str) -> String {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^( {0,3})(`{3,}|~{3,})(\w+)$").expect("valid regex"));

    let mut tracker = FenceTracker::default();
    let mut out = String::with_capacity(md.len());

    for line in md.split_inclusive('\n') {
        let (body, eol) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };

        match (tracker.classify(body), FENCE_RE.captures(body)) {
            (FenceLine::Opening, Some(caps)) => {
                let lang = caps[3].to_lowercase();
                let name = canonical_language(&lang).unwrap_or(lang.as_str());
                out.push_str(&caps[1]);
                out.push_str(&caps[2]);
                out.push_str(name);
            }
            _ => out.push_str(body),
        }
        out.push_str(eol);
    }

    out
}

fn canonical_language(alias: &str) -> Option<&'static str> {
    let name = match alias {
        "ts" => "typescript",
        "js" => "javascript",
        "py" => "python",
        "cs" => "csharp",
        "sh" | "shell" => "bash",
        "yml" => "yaml",
        _ => return None,
    };
    Some(name)
}

// ---------------------------------------------------------------------------
// Pass 4: Clean up excessive blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ blank lines into exactly 2.
fn clean_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Pass 5: Ensure trailing newline
// ---------------------------------------------------------------------------

/// Ensure the document ends with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_frontmatter_removes_block() {
        let input = "---\nname: clean-architecture\ndescription: x\n---\n\n# Title\n";
        assert_eq!(strip_frontmatter(input), "# Title\n");
    }

    #[test]
    fn strip_frontmatter_accepts_dot_terminator() {
        let input = "---\ntitle: t\n...\n# Title\n";
        assert_eq!(strip_frontmatter(input), "# Title\n");
    }

    #[test]
    fn strip_frontmatter_without_block_is_identity() {
        let input = "# Title\n\n---\n\nAfter a rule.\n";
        assert_eq!(strip_frontmatter(input), input);
    }

    #[test]
    fn strip_frontmatter_unterminated_is_identity() {
        let input = "---\nnot: closed\n# Title\n";
        assert_eq!(strip_frontmatter(input), input);
    }

    #[test]
    fn strip_frontmatter_handles_crlf() {
        let input = "---\r\ntitle: t\r\n---\r\n\r\n# Title\r\n";
        assert_eq!(strip_frontmatter(input), "# Title\r\n");
    }

    #[test]
    fn normalize_code_fences_maps_aliases() {
        let input = "```ts\nconst a = 1;\n```\n\n```Py\nx = 1\n```\n\n```shell\nls\n```";
        let result = normalize_code_fences(input);
        assert!(result.contains("```typescript\n"));
        assert!(result.contains("```python\n"));
        assert!(result.contains("```bash\n"));
    }

    #[test]
    fn normalize_code_fences_lowercases_unknown() {
        let input = "```Rust\nfn main() {}\n```";
        assert_eq!(normalize_code_fences(input), "```rust\nfn main() {}\n```");
    }

    #[test]
    fn normalize_code_fences_keeps_closing_and_attribute_fences() {
        let input = "```{.python .numberLines}\nx\n```";
        assert_eq!(normalize_code_fences(input), input);
    }

    #[test]
    fn normalize_code_fences_leaves_nested_examples_alone() {
        let input = "````markdown\n```TS\nlet a = 1;\n```\n````\n\n~~~Py\nx\n~~~";
        assert_eq!(
            normalize_code_fences(input),
            "````markdown\n```TS\nlet a = 1;\n```\n````\n\n~~~python\nx\n~~~"
        );
    }

    #[test]
    fn clean_blank_lines_collapses_excess() {
        let input = "Line 1\n\n\n\n\nLine 2";
        let result = clean_blank_lines(input);
        assert_eq!(result, "Line 1\n\n\nLine 2");
    }

    #[test]
    fn normalize_whitespace_trims_trailing() {
        let input = "Line 1   \nLine 2\t\r\nLine 3";
        let result = normalize_whitespace(input);
        assert_eq!(result, "Line 1\nLine 2\nLine 3");
    }

    #[test]
    fn ensure_trailing_newline_normalizes_multiple() {
        assert_eq!(ensure_trailing_newline("Content\n\n\n"), "Content\n");
        assert_eq!(ensure_trailing_newline("Content"), "Content\n");
    }

    #[test]
    fn full_pipeline_cleans_document() {
        let input = "---\ntitle: x\n---\n# Title  \n\n\n\n\n\n```yml\na: 1\n```\nEnd";
        let result = run_pipeline(input);

        assert!(result.starts_with("# Title\n"));
        assert!(!result.contains("title: x"));
        assert!(!result.contains("\n\n\n\n"));
        assert!(result.contains("```yaml\n"));
        assert!(result.ends_with("End\n"));
    }
}
