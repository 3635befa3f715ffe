//! Markdown measurement.
//!
//! Everything here works on normalized text: trailing whitespace stripped from
//! every line, `\n` line endings, and a final newline when the file is not
//! empty. Counting only normalized text keeps the content hash and the counts
//! in agreement.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use regex::Regex;
use serde::Serialize;
use steward_core::constants::{DEBT_MARKERS, QUICK_NAV_END, QUICK_NAV_START};
use steward_core::types::FileMetric;

use super::hasher::hash_content;

static LINK_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").ok());

static DEBT_AC: LazyLock<Option<AhoCorasick>> = LazyLock::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(DEBT_MARKERS)
        .ok()
});

/// Structural counts of one normalized document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkdownStats {
    pub line_count: u32,
    pub char_count: u64,
    pub link_count: u32,
    pub header_count: u32,
    pub debt_marker_count: u32,
    pub max_header_depth: u8,
    pub format_issue_count: u32,
    pub has_title: bool,
    pub quick_nav_present: bool,
}

/// A header line outside fenced code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Zero-based line index in the normalized text.
    pub line: usize,
    pub level: u8,
    pub title: String,
}

/// An inline `[text](target)` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub line: usize,
    pub text: String,
    pub target: String,
}

/// A debt marker occurrence, as a byte range into the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebtMarker {
    pub start: usize,
    pub end: usize,
}

/// Strip trailing whitespace per line and unify line endings.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Header level of `line` when it is `#`×1–6 followed by a space.
pub fn header_level(line: &str) -> Option<u8> {
    let hashes = line.bytes().take_while(|b| *b == b'#').count();
    if (1..=6).contains(&hashes) && line[hashes..].starts_with(' ') {
        Some(hashes as u8)
    } else {
        None
    }
}

fn is_fence(line: &str) -> bool {
    let t = line.trim_start();
    t.starts_with("```") || t.starts_with("~~~")
}

/// Lines of `text` with a flag telling whether each sits inside fenced code.
/// Fence delimiter lines themselves count as fenced.
pub fn fenced_lines(text: &str) -> impl Iterator<Item = (usize, &str, bool)> {
    let mut in_fence = false;
    text.lines().enumerate().map(move |(i, line)| {
        if is_fence(line) {
            in_fence = !in_fence;
            (i, line, true)
        } else {
            (i, line, in_fence)
        }
    })
}

/// Headers outside fenced code, in document order.
pub fn headers(text: &str) -> Vec<Header> {
    fenced_lines(text)
        .filter(|(_, _, fenced)| !fenced)
        .filter_map(|(i, line, _)| {
            header_level(line).map(|level| Header {
                line: i,
                level,
                title: line[level as usize..].trim().to_string(),
            })
        })
        .collect()
}

/// Inline links outside fenced code.
pub fn links(text: &str) -> Vec<Link> {
    let Some(re) = LINK_RE.as_ref() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for (i, line, fenced) in fenced_lines(text) {
        if fenced {
            continue;
        }
        for caps in re.captures_iter(line) {
            out.push(Link {
                line: i,
                text: caps.get(1).map_or("", |m| m.as_str()).to_string(),
                target: caps.get(2).map_or("", |m| m.as_str()).trim().to_string(),
            });
        }
    }
    out
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whole-word, case-insensitive debt markers anywhere in `text`.
pub fn debt_markers(text: &str) -> Vec<DebtMarker> {
    let Some(ac) = DEBT_AC.as_ref() else {
        return Vec::new();
    };
    let bytes = text.as_bytes();
    ac.find_iter(text)
        .filter(|m| {
            let before = m.start().checked_sub(1).map(|i| bytes[i]);
            let after = bytes.get(m.end()).copied();
            !before.is_some_and(is_word_byte) && !after.is_some_and(is_word_byte)
        })
        .map(|m| DebtMarker {
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// True when the first non-blank line (after optional front matter) is an H1.
fn has_title(text: &str) -> bool {
    let mut lines = text.lines().peekable();
    if lines.peek() == Some(&"---") {
        lines.next();
        for line in lines.by_ref() {
            if line == "---" {
                break;
            }
        }
    }
    lines
        .find(|l| !l.trim().is_empty())
        .is_some_and(|l| header_level(l) == Some(1))
}

/// Count structure in already-normalized text.
pub fn analyze(normalized: &str) -> MarkdownStats {
    let line_count = normalized.lines().count() as u32;
    let hdrs = headers(normalized);
    let title = has_title(normalized);

    let mut format_issue_count = 0u32;
    if line_count > 0 && !title {
        format_issue_count += 1;
    }
    for pair in hdrs.windows(2) {
        if pair[1].level > pair[0].level + 1 {
            format_issue_count += 1;
        }
    }

    MarkdownStats {
        line_count,
        char_count: normalized.chars().count() as u64,
        link_count: links(normalized).len() as u32,
        header_count: hdrs.len() as u32,
        debt_marker_count: debt_markers(normalized).len() as u32,
        max_header_depth: hdrs.iter().map(|h| h.level).max().unwrap_or(0),
        format_issue_count,
        has_title: title,
        quick_nav_present: has_quick_nav(normalized),
    }
}

/// True when the document carries a complete quick-navigation block.
pub fn has_quick_nav(text: &str) -> bool {
    match (text.find(QUICK_NAV_START), text.find(QUICK_NAV_END)) {
        (Some(s), Some(e)) => s < e,
        _ => false,
    }
}

/// Normalize `raw` and measure it as the file at `path`.
pub fn measure(path: &str, raw: &str, sampled_at: i64) -> (FileMetric, String, MarkdownStats) {
    let normalized = normalize(raw);
    let stats = analyze(&normalized);
    let metric = FileMetric {
        path: path.to_string(),
        sampled_at,
        line_count: stats.line_count,
        char_count: stats.char_count,
        link_count: stats.link_count,
        header_count: stats.header_count,
        debt_marker_count: stats.debt_marker_count,
        max_header_depth: stats.max_header_depth,
        format_issue_count: stats.format_issue_count,
        has_title: stats.has_title,
        content_hash: hash_content(normalized.as_bytes()),
    };
    (metric, normalized, stats)
}
