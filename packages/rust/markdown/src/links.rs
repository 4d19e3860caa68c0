//! Cross-document link rewriting.
//!
//! Once all documents are concatenated, `[text](other.md)` no longer points
//! anywhere. Links whose target is another manifest entry are rewritten to
//! anchors inside the combined document; every other link is left alone.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::fence::{FenceLine, FenceTracker};

/// Prefix shared by every document anchor.
const ANCHOR_PREFIX: &str = "doc-";

/// Maps normalised manifest paths to anchor identifiers in the combined document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorMap {
    anchors: BTreeMap<String, String>,
}

impl AnchorMap {
    /// Build the map from manifest paths in reading order.
    ///
    /// Paths that slugify to the same anchor get a numeric suffix, assigned in
    /// order, so the result depends only on the manifest.
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut anchors = BTreeMap::new();
        let mut taken: BTreeMap<String, usize> = BTreeMap::new();

        for path in paths {
            let Some(key) = normalize_path(path) else {
                continue;
            };
            if anchors.contains_key(&key) {
                continue;
            }

            let base = anchor_for(&key);
            let count = taken.entry(base.clone()).or_insert(0);
            *count += 1;
            let anchor = if *count == 1 {
                base
            } else {
                format!("{base}-{count}")
            };
            anchors.insert(key, anchor);
        }

        Self { anchors }
    }

    /// Anchor for a normalised manifest path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.anchors.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// Derive the anchor identifier for a manifest path.
///
/// `references/layer-patterns.md` becomes `doc-references-layer-patterns`.
pub fn anchor_for(path: &str) -> String {
    let stem = strip_md_extension(path).unwrap_or(path);

    let mut slug = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');

    format!("{ANCHOR_PREFIX}{slug}")
}

/// Lexically normalise a `/`-separated relative path.
///
/// Resolves `.` and `..` without touching the filesystem. Returns `None` for
/// absolute paths, empty paths, and paths that climb above their root.
pub fn normalize_path(path: &str) -> Option<String> {
    if path.starts_with('/') {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Rewrite links to other manifest entries into in-document anchors.
///
/// `source_path` is the normalised manifest path of the document being
/// rewritten; link targets resolve relative to its directory. Inline links
/// and reference definitions (`[id]: other.md`) are rewritten. Image links,
/// inline code spans, and fenced code blocks are never touched. Code spans
/// are recognised within a single line only.
pub fn rewrite_links(md: &str, source_path: &str, anchors: &AnchorMap) -> String {
    static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(!?)\[([^\]]*)\]\(([^)\s]+)(\s+"[^"]*")?\)"#).expect("valid regex")
    });
    static REF_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^( {0,3}\[[^\]]+\]:[ \t]*)(<[^>]*>|\S+)(.*)$").expect("valid regex")
    });

    let source_dir = source_path.rsplit_once('/').map_or("", |(dir, _)| dir);
    let mut out = String::with_capacity(md.len());
    let mut fences = FenceTracker::default();

    for line in md.split_inclusive('\n') {
        if fences.classify(line) != FenceLine::Text {
            out.push_str(line);
            continue;
        }

        let (body, eol) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };

        if let Some(caps) = REF_DEF_RE.captures(body) {
            let raw = &caps[2];
            let href = raw
                .strip_prefix('<')
                .and_then(|h| h.strip_suffix('>'))
                .unwrap_or(raw);
            if let Some(target) = resolve_target(href, source_dir, anchors) {
                trace!(source = source_path, href, %target, "rewrote reference definition");
                out.push_str(&caps[1]);
                out.push_str(&target);
                out.push_str(&caps[3]);
                out.push_str(eol);
                continue;
            }
        }

        for (is_code, segment) in split_code_spans(body) {
            if is_code {
                out.push_str(segment);
                continue;
            }
            let rewritten = LINK_RE.replace_all(segment, |caps: &regex::Captures| {
                if !caps[1].is_empty() {
                    return caps[0].to_string();
                }
                let text = &caps[2];
                let href = &caps[3];
                let title = caps.get(4).map_or("", |m| m.as_str());

                match resolve_target(href, source_dir, anchors) {
                    Some(target) => {
                        trace!(source = source_path, href, %target, "rewrote cross-document link");
                        format!("[{text}]({target}{title})")
                    }
                    None => caps[0].to_string(),
                }
            });
            out.push_str(&rewritten);
        }
        out.push_str(eol);
    }

    out
}

/// Split a line into `(is_code, text)` segments around inline code spans.
///
/// A run of N backticks opens a span that closes at the next run of exactly N;
/// an unmatched run is literal text.
fn split_code_spans(line: &str) -> Vec<(bool, &str)> {
    let bytes = line.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let open_start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - open_start;

        let mut j = i;
        let mut close = None;
        while j < bytes.len() {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let close_start = j;
            while j < bytes.len() && bytes[j] == b'`' {
                j += 1;
            }
            if j - close_start == run {
                close = Some(j);
                break;
            }
        }

        if let Some(end) = close {
            if open_start > text_start {
                segments.push((false, &line[text_start..open_start]));
            }
            segments.push((true, &line[open_start..end]));
            text_start = end;
            i = end;
        }
    }

    if text_start < line.len() {
        segments.push((false, &line[text_start..]));
    }
    segments
}

/// Map a link target to an in-document anchor, if it names a manifest entry.
fn resolve_target(href: &str, source_dir: &str, anchors: &AnchorMap) -> Option<String> {
    if href.starts_with('#') || href.contains("://") || href.starts_with("mailto:") {
        return None;
    }

    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };
    strip_md_extension(path)?;

    let joined = if source_dir.is_empty() {
        path.to_string()
    } else {
        format!("{source_dir}/{path}")
    };
    let key = normalize_path(&joined)?;
    let anchor = anchors.get(&key)?;

    Some(match fragment {
        Some(fragment) if !fragment.is_empty() => format!("#{fragment}"),
        _ => format!("#{anchor}"),
    })
}

/// `Some(stem)` when `path` ends in `.md` (any case).
fn strip_md_extension(path: &str) -> Option<&str> {
    let split = path.len().checked_sub(3)?;
    if !path.is_char_boundary(split) {
        return None;
    }
    let (stem, ext) = path.split_at(split);
    ext.eq_ignore_ascii_case(".md").then_some(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors() -> AnchorMap {
        AnchorMap::from_paths([
            "SKILL.md",
            "references/layer-patterns.md",
            "references/primer.md",
            "languages/python/guide.md",
        ])
    }

    #[test]
    fn anchor_for_slugifies_paths() {
        assert_eq!(
            anchor_for("references/layer-patterns.md"),
            "doc-references-layer-patterns"
        );
        assert_eq!(
            anchor_for("example-task-manager/README.md"),
            "doc-example-task-manager-readme"
        );
        assert_eq!(anchor_for("SKILL.md"), "doc-skill");
    }

    #[test]
    fn colliding_slugs_get_suffixes() {
        let map = AnchorMap::from_paths(["a-b.md", "a/b.md", "a_b.md"]);
        assert_eq!(map.get("a-b.md"), Some("doc-a-b"));
        assert_eq!(map.get("a/b.md"), Some("doc-a-b-2"));
        assert_eq!(map.get("a_b.md"), Some("doc-a-b-3"));
    }

    #[test]
    fn normalize_path_resolves_dots() {
        assert_eq!(normalize_path("./a/b.md").as_deref(), Some("a/b.md"));
        assert_eq!(normalize_path("a/../b.md").as_deref(), Some("b.md"));
        assert_eq!(normalize_path("a//b.md").as_deref(), Some("a/b.md"));
        assert_eq!(normalize_path("../b.md"), None);
        assert_eq!(normalize_path("/abs.md"), None);
        assert_eq!(normalize_path(""), None);
    }

    #[test]
    fn rewrites_sibling_link_to_document_anchor() {
        let input = "See [patterns](layer-patterns.md) for details.\n";
        let out = rewrite_links(input, "references/primer.md", &anchors());
        assert_eq!(
            out,
            "See [patterns](#doc-references-layer-patterns) for details.\n"
        );
    }

    #[test]
    fn rewrites_parent_relative_link() {
        let input = "Back to [the skill](../../SKILL.md).\n";
        let out = rewrite_links(input, "languages/python/guide.md", &anchors());
        assert_eq!(out, "Back to [the skill](#doc-skill).\n");
    }

    #[test]
    fn fragment_links_point_at_heading() {
        let input = "[Domain](references/layer-patterns.md#domain-layer)\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(out, "[Domain](#domain-layer)\n");
    }

    #[test]
    fn title_is_preserved() {
        let input = r#"[Primer](references/primer.md "Start here")"#;
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(out, r#"[Primer](#doc-references-primer "Start here")"#);
    }

    #[test]
    fn links_outside_manifest_untouched() {
        let input = "[ext](https://example.com/a.md) [other](notes/todo.md) [pdf](guide.pdf) [sec](#intro)\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(out, input);
    }

    #[test]
    fn image_links_untouched() {
        let input = "![diagram](references/primer.md)\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(out, input);
    }

    #[test]
    fn code_blocks_untouched() {
        let input = "```markdown\n[Primer](references/primer.md)\n```\n[Primer](references/primer.md)\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(
            out,
            "```markdown\n[Primer](references/primer.md)\n```\n[Primer](#doc-references-primer)\n"
        );
    }

    #[test]
    fn tilde_fences_untouched() {
        let input = "~~~\n[Primer](references/primer.md)\n~~~\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(out, input);
    }

    #[test]
    fn longer_fence_hides_inner_fence_lines() {
        let input = "````markdown\n```\n[Primer](references/primer.md)\n```\n````\n[Primer](references/primer.md)\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(
            out,
            "````markdown\n```\n[Primer](references/primer.md)\n```\n````\n[Primer](#doc-references-primer)\n"
        );
    }

    #[test]
    fn inline_code_spans_untouched() {
        let input = "Write `[Primer](references/primer.md)` to link, like [Primer](references/primer.md).\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(
            out,
            "Write `[Primer](references/primer.md)` to link, like [Primer](#doc-references-primer).\n"
        );
    }

    #[test]
    fn unmatched_backtick_is_literal() {
        let input = "A ` then [Primer](references/primer.md)\n";
        let out = rewrite_links(input, "SKILL.md", &anchors());
        assert_eq!(out, "A ` then [Primer](#doc-references-primer)\n");
    }

    #[test]
    fn reference_definitions_are_rewritten() {
        let input = "See [the primer][p].\n\n[p]: references/primer.md \"Primer\"\n[s]: <../SKILL.md>\n[x]: https://example.com/a.md\n";
        let out = rewrite_links(input, "references/layer-patterns.md", &anchors());
        assert_eq!(
            out,
            "See [the primer][p].\n\n[p]: #doc-references-primer \"Primer\"\n[s]: #doc-skill\n[x]: https://example.com/a.md\n"
        );
    }

    #[test]
    fn is_a_pure_function_of_inputs() {
        let input = "[a](references/primer.md) and [b](SKILL.md)\n";
        let map = anchors();
        assert_eq!(
            rewrite_links(input, "SKILL.md", &map),
            rewrite_links(input, "SKILL.md", &map)
        );
    }
}
