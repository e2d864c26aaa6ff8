//! Single-pass search over buffered output.

use crate::expect::pattern::{Pattern, PatternSet};

/// A successful match inside the session buffer.
///
/// `start..end` is the matched byte range; `index` is the position of the
/// winning pattern in its [`PatternSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// Scan `buffer` once, evaluating every pattern.
///
/// The match starting earliest in the buffer wins; ties go to the pattern
/// with the lower index. `None` means no pattern has matched *yet*: the
/// caller should read more data, it is not an error.
pub fn search(buffer: &[u8], patterns: &PatternSet) -> Option<Match> {
    let mut best: Option<Match> = None;
    for (index, pattern) in patterns.iter().enumerate() {
        let span = match pattern {
            Pattern::Literal(text) => find_subslice(buffer, text.as_bytes()),
            Pattern::Regex(re) => re.find(buffer).map(|m| (m.start(), m.end())),
        };
        let Some((start, end)) = span else { continue };
        // Strict < keeps the lower index on equal offsets, since iteration
        // is in ascending index order.
        if best.map_or(true, |b| start < b.start) {
            best = Some(Match { index, start, end });
        }
    }
    best
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<(usize, usize)> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|start| (start, start + needle.len()))
}
