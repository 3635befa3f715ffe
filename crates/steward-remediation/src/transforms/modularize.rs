//! Modularize: split an oversized document into sibling section files.
//!
//! The split level is the shallowest header level that occurs at least twice.
//! Each section becomes `<stem>-NN-<slug>.md` next to the original, titled by
//! its header and linking back. The original keeps its preamble followed by a
//! "Sections" list that links every sibling exactly once.

use steward_analysis::scanner::markdown::{header_level, headers, Header};
use steward_core::errors::RemediationError;
use steward_core::types::ActionKind;

use super::links::{file_stem, join, parent_dir};
use super::{transform_err, TransformContext, TransformOutput};

const MAX_SLUG_LEN: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub path: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    pub level: u8,
    /// New content of the original document.
    pub index: String,
    pub sections: Vec<Section>,
}

pub fn run(rel: &str, ctx: &TransformContext<'_>) -> Result<TransformOutput, RemediationError> {
    let (_, text) = ctx.read(rel)?;
    let plan = split(rel, &text)
        .ok_or_else(|| transform_err(ActionKind::Modularize, format!("{rel} has no repeated section headers")))?;
    ctx.check_cancelled()?;

    let mut created = Vec::with_capacity(plan.sections.len());
    for section in &plan.sections {
        ctx.create(&section.path, &section.content)?;
        created.push(section.path.clone());
    }
    ctx.write(rel, &plan.index)?;

    tracing::info!(path = rel, sections = created.len(), level = plan.level, "document modularized");
    Ok(TransformOutput {
        modified: vec![rel.to_string()],
        summary: format!("split {rel} into {} sections at level {}", created.len(), plan.level),
        created,
    })
}

/// Shallowest header level with at least two headers.
pub fn split_level(hdrs: &[Header]) -> Option<u8> {
    (1..=6).find(|level| hdrs.iter().filter(|h| h.level == *level).count() >= 2)
}

/// ASCII file-name slug of a header title.
pub fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let mut slug = out.trim_matches('-').to_string();
    slug.truncate(MAX_SLUG_LEN);
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

/// Compute the split of normalized `text` without touching the filesystem.
pub fn split(rel: &str, text: &str) -> Option<SplitPlan> {
    let hdrs = headers(text);
    let level = split_level(&hdrs)?;
    let starts: Vec<&Header> = hdrs.iter().filter(|h| h.level == level).collect();
    let lines: Vec<&str> = text.lines().collect();

    let dir = parent_dir(rel);
    let stem = file_stem(rel);
    let name = rel.rsplit('/').next().unwrap_or(rel);

    let mut preamble: Vec<&str> = lines[..starts[0].line].to_vec();
    while preamble.last().is_some_and(|l| l.trim().is_empty()) {
        preamble.pop();
    }
    let doc_title = preamble
        .iter()
        .find(|l| header_level(l) == Some(1))
        .map(|l| l[1..].trim().to_string());

    let mut sections = Vec::with_capacity(starts.len());
    for (i, header) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(lines.len(), |next| next.line);
        let mut body: Vec<&str> = lines[header.line + 1..end].to_vec();
        while body.last().is_some_and(|l| l.trim().is_empty()) {
            body.pop();
        }
        let file = format!("{stem}-{:02}-{}.md", i + 1, slug(&header.title));
        let path = join(dir, &file)?;

        let mut content = format!(
            "# {}\n\n[Back to {}]({name})\n",
            header.title,
            doc_title.as_deref().unwrap_or(stem)
        );
        if body.first().is_some_and(|l| !l.trim().is_empty()) {
            content.push('\n');
        }
        for line in body {
            content.push_str(line);
            content.push('\n');
        }
        sections.push(Section {
            path,
            title: header.title.clone(),
            content,
        });
    }

    let mut index = String::new();
    if doc_title.is_none() {
        index.push_str(&format!("# {stem}\n\n"));
    }
    for line in &preamble {
        index.push_str(line);
        index.push('\n');
    }
    if !preamble.is_empty() {
        index.push('\n');
    }
    index.push_str("## Sections\n\n");
    for section in &sections {
        let file = section.path.rsplit('/').next().unwrap_or(&section.path);
        index.push_str(&format!("- [{}]({file})\n", section.title));
    }

    Some(SplitPlan {
        level,
        index,
        sections,
    })
}
