//! OptimizeStructure: give the root navigation document a quick-navigation
//! block and flatten header jumps.

use steward_analysis::scanner::markdown::headers;
use steward_core::constants::{QUICK_NAV_END, QUICK_NAV_START};
use steward_core::errors::RemediationError;

use super::{flatten_headers, TransformContext, TransformOutput};

/// Most entries listed in the quick-navigation line.
pub const MAX_NAV_ENTRIES: usize = 12;

pub fn run(rel: &str, ctx: &TransformContext<'_>) -> Result<TransformOutput, RemediationError> {
    let (_, text) = ctx.read(rel)?;
    let optimized = optimize(&text);
    let mut output = TransformOutput::default();
    if optimized != text {
        ctx.write(rel, &optimized)?;
        output.modified.push(rel.to_string());
    }
    output.summary = format!("quick navigation refreshed in {rel}");
    tracing::info!(path = rel, changed = !output.modified.is_empty(), "structure optimized");
    Ok(output)
}

/// Strip any previous block, flatten headers, then insert a fresh block.
pub fn optimize(text: &str) -> String {
    let stripped = strip_quick_nav(text);
    let (flat, _) = flatten_headers(&stripped);
    insert_quick_nav(&flat)
}

/// GitHub-style heading anchor.
pub fn anchor(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

fn strip_quick_nav(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut inside = false;
    for line in text.lines() {
        if line.trim() == QUICK_NAV_START {
            inside = true;
            continue;
        }
        if inside {
            if line.trim() == QUICK_NAV_END {
                inside = false;
            }
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn nav_line(text: &str) -> String {
    let entries: Vec<String> = headers(text)
        .into_iter()
        .filter(|h| h.level == 2)
        .take(MAX_NAV_ENTRIES)
        .map(|h| format!("[{}](#{})", h.title, anchor(&h.title)))
        .collect();
    if entries.is_empty() {
        "**Quick Navigation:** see the sections below".to_string()
    } else {
        format!("**Quick Navigation:** {}", entries.join(" · "))
    }
}

fn insert_quick_nav(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let title = headers(text).into_iter().find(|h| h.level == 1).map(|h| h.line);
    let (head, rest) = match title {
        Some(t) => lines.split_at(t + 1),
        None => lines.split_at(0),
    };
    let rest: Vec<&str> = rest.iter().copied().skip_while(|l| l.trim().is_empty()).collect();

    let mut out = String::with_capacity(text.len() + 256);
    for line in head {
        out.push_str(line);
        out.push('\n');
    }
    if !head.is_empty() {
        out.push('\n');
    }
    out.push_str(QUICK_NAV_START);
    out.push('\n');
    out.push_str(&nav_line(text));
    out.push('\n');
    out.push_str(QUICK_NAV_END);
    out.push('\n');
    if !rest.is_empty() {
        out.push('\n');
    }
    for line in rest {
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_analysis::scanner::markdown::has_quick_nav;

    #[test]
    fn inserts_block_after_title_and_flattens() {
        let text = "# Home\n\nWelcome.\n\n## Getting Started\n#### Deep\n## API Reference\n";
        let out = optimize(text);
        assert!(has_quick_nav(&out));
        assert!(out.starts_with(&format!("# Home\n\n{QUICK_NAV_START}\n")));
        assert!(out.contains("[Getting Started](#getting-started) · [API Reference](#api-reference)"));
        assert!(out.contains("\n### Deep\n"));
        assert!(!out.contains("#### Deep"));
    }

    #[test]
    fn optimizing_twice_changes_nothing() {
        let once = optimize("intro\n## A\n## B\n");
        assert_eq!(optimize(&once), once);
        assert!(once.starts_with(QUICK_NAV_START));
    }
}
