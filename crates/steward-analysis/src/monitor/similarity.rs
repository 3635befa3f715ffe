//! Pairwise document similarity.
//!
//! s(a, b) = 0.5·J + 0.5·R
//!
//! J is the Jaccard index of the lower-cased whitespace token sets. R is the
//! line ratio 2·LCS / (nₐ + n_b) over the non-blank lines of each document.
//! R is only computed when J > 0: documents with no token in common cannot
//! share a line. Both terms are symmetric and bounded, so s ∈ [0, 1].

use rayon::prelude::*;
use serde::Serialize;
use steward_core::traits::{Cancellable, CancellationToken};
use steward_core::types::collections::FxHashSet;

use crate::scanner::hasher::hash_line;

/// Weight of the token term; the line term gets the rest.
pub const TOKEN_WEIGHT: f64 = 0.5;

/// A document prepared for repeated comparisons.
#[derive(Debug, Clone)]
pub struct PreparedDoc {
    tokens: FxHashSet<String>,
    lines: Vec<u64>,
}

impl PreparedDoc {
    pub fn new(content: &str) -> Self {
        Self {
            tokens: content
                .split_whitespace()
                .map(|t| t.to_lowercase())
                .collect(),
            lines: content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(hash_line)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Similarity of two documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityPair {
    /// Lexically smaller path.
    pub a: String,
    pub b: String,
    pub score: f64,
}

/// J(A, B) = |A ∩ B| / |A ∪ B|; 0 when both are empty.
pub fn jaccard(a: &FxHashSet<String>, b: &FxHashSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Length of the longest common subsequence of two line sequences.
pub fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let mut prev = vec![0u32; inner.len() + 1];
    let mut cur = vec![0u32; inner.len() + 1];
    for x in outer {
        for (j, y) in inner.iter().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[inner.len()] as usize
}

/// 2·LCS / (nₐ + n_b).
pub fn line_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

pub fn similarity_prepared(a: &PreparedDoc, b: &PreparedDoc) -> f64 {
    let j = jaccard(&a.tokens, &b.tokens);
    if j == 0.0 {
        return 0.0;
    }
    let r = line_ratio(&a.lines, &b.lines);
    (TOKEN_WEIGHT * j + (1.0 - TOKEN_WEIGHT) * r).clamp(0.0, 1.0)
}

/// Similarity of two normalized documents.
pub fn similarity(a: &str, b: &str) -> f64 {
    similarity_prepared(&PreparedDoc::new(a), &PreparedDoc::new(b))
}

/// Every unordered pair of non-empty documents scoring at least `min_score`,
/// sorted by `(a, b)`.
pub fn pairwise(docs: &[(&str, &str)], min_score: f64) -> Vec<SimilarityPair> {
    let prepared: Vec<(&str, PreparedDoc)> = docs
        .par_iter()
        .map(|(path, content)| (*path, PreparedDoc::new(content)))
        .filter(|(_, doc)| !doc.is_empty())
        .collect();

    let n = prepared.len();
    let mut pairs: Vec<SimilarityPair> = (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            let prepared = &prepared;
            ((i + 1)..n).filter_map(move |j| {
                let score = similarity_prepared(&prepared[i].1, &prepared[j].1);
                if score < min_score || score == 0.0 {
                    return None;
                }
                let (a, b) = if prepared[i].0 <= prepared[j].0 {
                    (prepared[i].0, prepared[j].0)
                } else {
                    (prepared[j].0, prepared[i].0)
                };
                Some(SimilarityPair {
                    a: a.to_string(),
                    b: b.to_string(),
                    score,
                })
            })
        })
        .collect();
    pairs.sort_by(|x, y| (&x.a, &x.b).cmp(&(&y.a, &y.b)));
    pairs
}

/// A run of lines common to both sequences, as found by the LCS alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonBlock {
    pub a_start: usize,
    pub b_start: usize,
    pub len: usize,
}

/// Largest DP table `common_blocks_bounded` allocates, in cells (64 MiB of u32).
pub const MAX_ALIGN_CELLS: usize = 16 * 1024 * 1024;

/// Why an alignment stopped without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignAbort {
    TooLarge { cells: usize },
    Cancelled,
}

/// Contiguous runs of at least `min_len` lines in an LCS alignment of `a` and
/// `b`, in order.
pub fn common_blocks<T: PartialEq>(a: &[T], b: &[T], min_len: usize) -> Vec<CommonBlock> {
    common_blocks_bounded(a, b, min_len, usize::MAX, &CancellationToken::new()).unwrap_or_default()
}

/// `common_blocks` with a cap on the DP table and a cancellation check per row.
pub fn common_blocks_bounded<T: PartialEq>(
    a: &[T],
    b: &[T],
    min_len: usize,
    max_cells: usize,
    cancel: &dyn Cancellable,
) -> Result<Vec<CommonBlock>, AlignAbort> {
    let (n, m) = (a.len(), b.len());
    if n == 0 || m == 0 {
        return Ok(Vec::new());
    }
    let width = m + 1;
    let cells = (n + 1).saturating_mul(width);
    if cells > max_cells {
        return Err(AlignAbort::TooLarge { cells });
    }
    // Suffix table: dp[i][j] = LCS of a[i..] and b[j..].
    let mut dp = vec![0u32; cells];
    for i in (0..n).rev() {
        if cancel.is_cancelled() {
            return Err(AlignAbort::Cancelled);
        }
        for j in (0..m).rev() {
            dp[i * width + j] = if a[i] == b[j] {
                dp[(i + 1) * width + j + 1] + 1
            } else {
                dp[(i + 1) * width + j].max(dp[i * width + j + 1])
            };
        }
    }

    let mut blocks = Vec::new();
    let mut current: Option<CommonBlock> = None;
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            current = match current {
                Some(mut blk) if blk.a_start + blk.len == i && blk.b_start + blk.len == j => {
                    blk.len += 1;
                    Some(blk)
                }
                other => {
                    if let Some(blk) = other.filter(|b| b.len >= min_len) {
                        blocks.push(blk);
                    }
                    Some(CommonBlock {
                        a_start: i,
                        b_start: j,
                        len: 1,
                    })
                }
            };
            i += 1;
            j += 1;
        } else if dp[(i + 1) * width + j] >= dp[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    if let Some(blk) = current.filter(|b| b.len >= min_len) {
        blocks.push(blk);
    }
    Ok(blocks)
}
