//! Consolidate: move the common blocks of two near-duplicate documents into a
//! shared file and point both originals at it. Further subjects (the rest of
//! a duplication cluster) drop any copy of those blocks and link the file too.

use steward_analysis::monitor::similarity::{
    common_blocks, common_blocks_bounded, AlignAbort, CommonBlock, MAX_ALIGN_CELLS,
};
use steward_core::errors::RemediationError;
use steward_core::types::ActionKind;

use super::links::{file_stem, join, parent_dir, relative};
use super::{transform_err, TransformContext, TransformOutput};

/// Shortest run of common lines worth moving.
pub const MIN_BLOCK_LINES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationPlan {
    /// Corpus path of the consolidated file.
    pub path: String,
    pub consolidated: String,
    pub a: String,
    pub b: String,
    /// Moved blocks, positioned in both originals.
    pub blocks: Vec<CommonBlock>,
    pub moved_lines: usize,
}

impl ConsolidationPlan {
    /// The moved blocks as line slices of the first original.
    pub fn block_lines<'l, 't>(&self, a_lines: &'l [&'t str]) -> Vec<&'l [&'t str]> {
        self.blocks
            .iter()
            .map(|blk| &a_lines[blk.a_start..blk.a_start + blk.len])
            .collect()
    }
}

/// `<dir of a>/consolidated-<stem a>-<stem b>.md`.
pub fn consolidated_path(a: &str, b: &str) -> Option<String> {
    join(
        parent_dir(a),
        &format!("consolidated-{}-{}.md", file_stem(a), file_stem(b)),
    )
}

pub fn run(subjects: &[String], ctx: &TransformContext<'_>) -> Result<TransformOutput, RemediationError> {
    let [a, b, rest @ ..] = subjects else {
        return Err(transform_err(ActionKind::Consolidate, "needs two subjects"));
    };
    let (a, b) = (a.as_str(), b.as_str());
    let (_, text_a) = ctx.read(a)?;
    let (_, text_b) = ctx.read(b)?;
    let la: Vec<&str> = text_a.lines().collect();
    let lb: Vec<&str> = text_b.lines().collect();
    let blocks = match common_blocks_bounded(&la, &lb, MIN_BLOCK_LINES, MAX_ALIGN_CELLS, ctx.cancel) {
        Ok(blocks) => blocks,
        Err(AlignAbort::Cancelled) => return Err(RemediationError::Cancelled),
        Err(AlignAbort::TooLarge { cells }) => {
            return Err(transform_err(
                ActionKind::Consolidate,
                format!("{a} and {b} are too large to align ({cells} cells)"),
            ))
        }
    };
    ctx.check_cancelled()?;
    let plan = build(a, &la, b, &lb, blocks).ok_or_else(|| {
        transform_err(
            ActionKind::Consolidate,
            format!("{a} and {b} share no block of {MIN_BLOCK_LINES}+ lines"),
        )
    })?;

    let moved: Vec<&[&str]> = plan.block_lines(&la);
    let mut others = Vec::new();
    for member in rest {
        ctx.check_cancelled()?;
        let (_, text) = ctx.read(member)?;
        if let Some(stripped) = strip_blocks(member, &text, &moved, &plan.path) {
            others.push((member, stripped));
        }
    }

    ctx.create(&plan.path, &plan.consolidated)?;
    ctx.write(a, &plan.a)?;
    ctx.write(b, &plan.b)?;
    let mut modified = vec![a.to_string(), b.to_string()];
    for (member, stripped) in others {
        ctx.write(member, &stripped)?;
        modified.push(member.clone());
    }

    tracing::info!(
        a,
        b,
        members = modified.len(),
        blocks = plan.blocks.len(),
        lines = plan.moved_lines,
        "documents consolidated"
    );
    Ok(TransformOutput {
        modified,
        created: vec![plan.path.clone()],
        summary: format!("moved {} shared lines into {}", plan.moved_lines, plan.path),
    })
}

/// `text` without every copy of the `moved` blocks, plus the reference note.
/// `None` when it holds none of them.
pub fn strip_blocks(rel: &str, text: &str, moved: &[&[&str]], target: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let mut dropped = vec![false; lines.len()];
    for block in moved.iter().filter(|b| !b.is_empty()) {
        let mut i = 0;
        while i + block.len() <= lines.len() {
            if !dropped[i] && lines[i..i + block.len()] == **block {
                dropped[i..i + block.len()].fill(true);
                i += block.len();
            } else {
                i += 1;
            }
        }
    }
    if !dropped.contains(&true) {
        return None;
    }
    Some(format!("{}\n{}", keep(&lines, &dropped), note(rel, target)))
}

fn note(from: &str, target: &str) -> String {
    let name = target.rsplit('/').next().unwrap_or(target);
    format!("> Shared content moved to [{name}]({}).\n", relative(from, target))
}

/// Compute the consolidation of two normalized documents.
pub fn plan(a_rel: &str, a: &str, b_rel: &str, b: &str, min_len: usize) -> Option<ConsolidationPlan> {
    let la: Vec<&str> = a.lines().collect();
    let lb: Vec<&str> = b.lines().collect();
    let blocks = common_blocks(&la, &lb, min_len);
    build(a_rel, &la, b_rel, &lb, blocks)
}

/// Lay out the consolidation for aligned `blocks`; all-blank blocks stay put.
fn build(a_rel: &str, la: &[&str], b_rel: &str, lb: &[&str], blocks: Vec<CommonBlock>) -> Option<ConsolidationPlan> {
    let blocks: Vec<_> = blocks
        .into_iter()
        .filter(|blk| la[blk.a_start..blk.a_start + blk.len].iter().any(|l| !l.trim().is_empty()))
        .collect();
    if blocks.is_empty() {
        return None;
    }
    let path = consolidated_path(a_rel, b_rel)?;

    let mut consolidated = format!(
        "# Shared content of {} and {}\n",
        file_stem(a_rel),
        file_stem(b_rel)
    );
    let mut drop_a = vec![false; la.len()];
    let mut drop_b = vec![false; lb.len()];
    let mut moved_lines = 0;
    for blk in &blocks {
        consolidated.push('\n');
        for line in &la[blk.a_start..blk.a_start + blk.len] {
            consolidated.push_str(line);
            consolidated.push('\n');
        }
        drop_a[blk.a_start..blk.a_start + blk.len].fill(true);
        drop_b[blk.b_start..blk.b_start + blk.len].fill(true);
        moved_lines += blk.len;
    }

    let new_a = format!("{}\n{}", keep(la, &drop_a), note(a_rel, &path));
    let new_b = format!("{}\n{}", keep(lb, &drop_b), note(b_rel, &path));

    Some(ConsolidationPlan {
        path,
        consolidated,
        a: new_a,
        b: new_b,
        blocks,
        moved_lines,
    })
}

/// Lines not dropped, with blank runs collapsed and trailing blanks removed.
fn keep(lines: &[&str], dropped: &[bool]) -> String {
    let mut out = String::new();
    let mut last_blank = true;
    for (line, _) in lines.iter().zip(dropped).filter(|(_, d)| !**d) {
        let blank = line.trim().is_empty();
        if blank && last_blank {
            continue;
        }
        out.push_str(line);
        out.push('\n');
        last_blank = blank;
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_common_blocks_and_adds_notes() {
        let a = "# A\nown a\nshared 1\nshared 2\nshared 3\n\ntail a\n";
        let b = "# B\nshared 1\nshared 2\nshared 3\nown b\n";
        let plan = plan("docs/a.md", a, "docs/sub/b.md", b, 3).unwrap();
        assert_eq!(plan.path, "docs/consolidated-a-b.md");
        assert_eq!(plan.blocks.len(), 1);
        assert_eq!(plan.moved_lines, 3);
        assert_eq!(plan.consolidated, "# Shared content of a and b\n\nshared 1\nshared 2\nshared 3\n");
        assert_eq!(
            plan.a,
            "# A\nown a\n\ntail a\n\n> Shared content moved to [consolidated-a-b.md](consolidated-a-b.md).\n"
        );
        assert!(plan.b.ends_with("[consolidated-a-b.md](../consolidated-a-b.md).\n"));
        assert!(!plan.b.contains("shared 2"));
    }

    #[test]
    fn further_members_lose_their_copies() {
        let block = ["shared 1", "shared 2", "shared 3"];
        let text = "# C\nshared 1\nshared 2\nshared 3\nown c\nshared 1\nshared 2\nshared 3\n";
        let out = strip_blocks("docs/c.md", text, &[&block[..]], "docs/consolidated-a-b.md").unwrap();
        assert_eq!(out, "# C\nown c\n\n> Shared content moved to [consolidated-a-b.md](consolidated-a-b.md).\n");
        assert!(strip_blocks("docs/c.md", "# C\nshared 1\nshared 2\n", &[&block[..]], "docs/x.md").is_none());
    }

    #[test]
    fn short_or_blank_overlaps_are_ignored() {
        assert!(plan("a.md", "x\ny\n", "b.md", "x\ny\n", 3).is_none());
        assert!(plan("a.md", "# A\n\n\n\nz\n", "b.md", "# B\n\n\n\nw\n", 3).is_none());
    }
}
