//! Fenced code block tracking for line-by-line passes.

/// Where a line sits relative to fenced code blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FenceLine {
    /// Opens a block.
    Opening,
    /// Inside an open block.
    Inside,
    /// Closes the open block.
    Closing,
    /// Ordinary Markdown.
    Text,
}

/// Follows ```` ``` ```` / `~~~` fences across lines.
///
/// A block only closes on a run of the same character at least as long as
/// the one that opened it, with nothing after it. A ```` ```` ```` block can
/// therefore contain ```` ``` ```` lines.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Classify `line` and advance the tracker.
    pub(crate) fn classify(&mut self, line: &str) -> FenceLine {
        let marker = fence_marker(line);

        match (self.open, marker) {
            (Some((ch, len)), Some((m_ch, m_len, info)))
                if m_ch == ch && m_len >= len && info.trim().is_empty() =>
            {
                self.open = None;
                FenceLine::Closing
            }
            (Some(_), _) => FenceLine::Inside,
            (None, Some((m_ch, m_len, info))) => {
                // Backtick fences cannot carry backticks in their info string.
                if m_ch == '`' && info.contains('`') {
                    return FenceLine::Text;
                }
                self.open = Some((m_ch, m_len));
                FenceLine::Opening
            }
            (None, None) => FenceLine::Text,
        }
    }
}

/// `(char, run length, rest)` when `line` starts (after up to three spaces)
/// with three or more backticks or tildes.
fn fence_marker(line: &str) -> Option<(char, usize, &str)> {
    let body = line.trim_end_matches(['\n', '\r']);
    let indent = body.len() - body.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let body = &body[indent..];

    let ch = body.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = body.chars().take_while(|c| *c == ch).count();
    (len >= 3).then(|| (ch, len, &body[len..]))
}
