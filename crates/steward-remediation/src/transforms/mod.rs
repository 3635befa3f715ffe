//! Markdown transformations applied by the executor.
//!
//! `apply` is the fixed dispatch table from `ActionKind` to transform. Every
//! transform reads its subjects through the allowed roots, records files it is
//! about to create in the backup's created log, and writes atomically. None of
//! them touches the store; validation and rollback belong to the executor.

pub mod consolidate;
pub mod convert_format;
pub mod latch;
pub mod links;
pub mod modularize;
pub mod optimize_structure;
pub mod resolve_debt;

use std::path::PathBuf;

use steward_analysis::scanner::normalize;
use steward_core::config::{ExecutorConfig, ThresholdConfig};
use steward_core::errors::RemediationError;
use steward_core::traits::{Cancellable, CancellationToken};
use steward_core::types::{Action, ActionKind};
use steward_core::AllowedRoots;

use crate::executor::backup::CreatedLog;
use crate::fsutil::{read_text, write_atomic};

pub use latch::EmergencyLatch;

/// Everything a transform may use.
pub struct TransformContext<'a> {
    pub roots: &'a AllowedRoots,
    pub thresholds: &'a ThresholdConfig,
    pub executor: &'a ExecutorConfig,
    /// Corpus path of the root navigation document.
    pub root_document: &'a str,
    pub latch: &'a EmergencyLatch,
    pub cancel: &'a CancellationToken,
    pub created: &'a CreatedLog,
}

impl TransformContext<'_> {
    /// Resolve and read a subject as normalized text.
    pub fn read(&self, rel: &str) -> Result<(PathBuf, String), RemediationError> {
        let abs = self.roots.resolve(rel)?;
        let text = read_text(&abs)?;
        Ok((abs, normalize(&text)))
    }

    /// Replace an existing subject.
    pub fn write(&self, rel: &str, content: &str) -> Result<(), RemediationError> {
        self.check_cancelled()?;
        let abs = self.roots.resolve(rel)?;
        write_atomic(&abs, content.as_bytes())
    }

    /// Create a new corpus file. Refuses to overwrite.
    pub fn create(&self, rel: &str, content: &str) -> Result<(), RemediationError> {
        self.check_cancelled()?;
        let abs = self.roots.resolve(rel)?;
        if abs.exists() {
            return Err(RemediationError::Io {
                path: abs,
                message: "refusing to overwrite an existing file".to_string(),
            });
        }
        self.created.record(rel)?;
        write_atomic(&abs, content.as_bytes())
    }

    pub fn check_cancelled(&self) -> Result<(), RemediationError> {
        if self.cancel.is_cancelled() {
            Err(RemediationError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Files a transform touched, as corpus paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOutput {
    pub modified: Vec<String>,
    pub created: Vec<String>,
    pub summary: String,
}

impl TransformOutput {
    /// Modified and created files, modified first.
    pub fn touched(&self) -> impl Iterator<Item = &String> {
        self.modified.iter().chain(&self.created)
    }
}

pub(crate) fn transform_err(kind: ActionKind, message: impl Into<String>) -> RemediationError {
    RemediationError::Transform {
        kind: kind.name(),
        message: message.into(),
    }
}

fn subject(action: &Action, index: usize) -> Result<&str, RemediationError> {
    action
        .subjects
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| transform_err(action.kind, format!("missing subject #{}", index + 1)))
}

/// Run the transformation for `action`.
pub fn apply(action: &Action, ctx: &TransformContext<'_>) -> Result<TransformOutput, RemediationError> {
    ctx.check_cancelled()?;
    match action.kind {
        ActionKind::Modularize => modularize::run(subject(action, 0)?, ctx),
        ActionKind::Consolidate => {
            subject(action, 1)?;
            consolidate::run(&action.subjects, ctx)
        }
        ActionKind::ResolveDebt => resolve_debt::run(&action.subjects, ctx),
        ActionKind::OptimizeStructure => optimize_structure::run(subject(action, 0)?, ctx),
        ActionKind::ConvertFormat => convert_format::run(&action.subjects, ctx),
        ActionKind::EmergencyHalt => {
            let newly = ctx.latch.trip(format!("emergency halt requested by {}", action.id));
            Ok(TransformOutput {
                summary: (if newly { "emergency latch set" } else { "emergency latch already set" }).to_string(),
                ..Default::default()
            })
        }
    }
}

/// Rewrite header levels so none is more than one deeper than the previous
/// header. The first header keeps its level. Returns the new text and the
/// number of headers changed.
pub(crate) fn flatten_headers(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut last_level: Option<u8> = None;
    let mut changed = 0;
    for (_, line, fenced) in steward_analysis::scanner::markdown::fenced_lines(text) {
        match steward_analysis::scanner::markdown::header_level(line).filter(|_| !fenced) {
            Some(level) => {
                let allowed = last_level.map_or(level, |last| level.min(last + 1));
                if allowed != level {
                    changed += 1;
                    out.push_str(&"#".repeat(allowed as usize));
                    out.push_str(&line[level as usize..]);
                } else {
                    out.push_str(line);
                }
                last_level = Some(allowed);
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
    (out, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_deep_jumps_but_keeps_fences() {
        let text = "# T\n#### deep\n```\n#### code\n```\n## ok\n### fine\n";
        let (out, changed) = flatten_headers(text);
        assert_eq!(changed, 1);
        assert_eq!(out, "# T\n## deep\n```\n#### code\n```\n## ok\n### fine\n");
    }

    #[test]
    fn flattening_is_idempotent() {
        let (once, _) = flatten_headers("### a\n##### b\n# c\n### d\n");
        assert_eq!(once, "### a\n#### b\n# c\n## d\n");
        let (twice, changed) = flatten_headers(&once);
        assert_eq!(once, twice);
        assert_eq!(changed, 0);
    }
}
