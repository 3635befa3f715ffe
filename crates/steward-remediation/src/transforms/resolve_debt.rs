//! ResolveDebt: rewrite debt markers into structured follow-up notes.

use steward_analysis::scanner::markdown::debt_markers;
use steward_core::errors::RemediationError;
use steward_core::types::ActionKind;

use super::{transform_err, TransformContext, TransformOutput};

pub const ACTION_ITEM: &str = "**Action Item:**";
pub const IMPROVEMENT_NEEDED: &str = "**Improvement Needed:**";

pub fn run(subjects: &[String], ctx: &TransformContext<'_>) -> Result<TransformOutput, RemediationError> {
    if subjects.is_empty() {
        return Err(transform_err(ActionKind::ResolveDebt, "no subjects"));
    }
    let mut output = TransformOutput::default();
    let mut total = 0;
    for rel in subjects {
        let (_, text) = ctx.read(rel)?;
        let (rewritten, count) = rewrite(&text);
        if count == 0 {
            continue;
        }
        ctx.write(rel, &rewritten)?;
        output.modified.push(rel.clone());
        total += count;
    }
    tracing::info!(files = output.modified.len(), markers = total, "debt markers rewritten");
    output.summary = format!("rewrote {total} debt markers in {} files", output.modified.len());
    Ok(output)
}

/// Replace every debt marker, swallowing a directly following colon.
/// Returns the new text and the number of markers replaced.
pub fn rewrite(text: &str) -> (String, usize) {
    let markers = debt_markers(text);
    let mut out = String::with_capacity(text.len() + markers.len() * 16);
    let mut cursor = 0;
    for m in &markers {
        out.push_str(&text[cursor..m.start]);
        let word = &text[m.start..m.end];
        out.push_str(if word.eq_ignore_ascii_case("TODO") {
            ACTION_ITEM
        } else {
            IMPROVEMENT_NEEDED
        });
        cursor = m.end;
        if text[cursor..].starts_with(':') {
            cursor += 1;
        }
    }
    out.push_str(&text[cursor..]);
    (out, markers.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_each_marker_kind() {
        let (out, n) = rewrite("TODO: write intro\nfixme broken link\nXXX check\ntodos stay\n");
        assert_eq!(n, 3);
        assert_eq!(
            out,
            "**Action Item:** write intro\n**Improvement Needed:** broken link\n**Improvement Needed:** check\ntodos stay\n"
        );
        let (_, again) = rewrite(&out);
        assert_eq!(again, 0);
    }
}
