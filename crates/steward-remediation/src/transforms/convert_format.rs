//! ConvertFormat: bring documents to the house format.
//!
//! With `executor.converter_command` set, each subject is handed to that
//! program (path appended as the last argument) under a wall-clock timeout.
//! Otherwise the built-in normalizer adds a missing H1 title and repairs
//! header level jumps. The built-in normalizer is idempotent.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use steward_analysis::scanner::markdown::analyze;
use steward_core::errors::RemediationError;
use steward_core::traits::{Cancellable, CancellationToken};

use super::links::file_stem;
use super::{flatten_headers, TransformContext, TransformOutput};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_STDERR_CHARS: usize = 512;

pub fn run(subjects: &[String], ctx: &TransformContext<'_>) -> Result<TransformOutput, RemediationError> {
    let mut output = TransformOutput::default();
    let command = &ctx.executor.converter_command;
    for rel in subjects {
        if command.is_empty() {
            let (_, text) = ctx.read(rel)?;
            let normalized = normalize_document(rel, &text);
            if normalized != text {
                ctx.write(rel, &normalized)?;
                output.modified.push(rel.clone());
            }
        } else {
            ctx.check_cancelled()?;
            let abs = ctx.roots.resolve(rel)?;
            let timeout = Duration::from_secs(ctx.executor.effective_converter_timeout_s());
            run_converter(command, &abs, timeout, ctx.cancel)?;
            output.modified.push(rel.clone());
        }
    }
    output.summary = format!("converted {} of {} files", output.modified.len(), subjects.len());
    tracing::info!(files = output.modified.len(), external = !command.is_empty(), "format conversion done");
    Ok(output)
}

/// Title derived from a file name: `getting-started` -> `Getting started`.
pub fn title_from_path(rel: &str) -> String {
    let words = file_stem(rel).replace(['-', '_'], " ");
    let mut chars = words.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Untitled".to_string(),
    }
}

/// Built-in normalizer over normalized text.
pub fn normalize_document(rel: &str, text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    if !analyze(text).has_title {
        let at = front_matter_end(&lines);
        lines.insert(at, String::new());
        lines.insert(at, format!("# {}", title_from_path(rel)));
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }
    let mut joined = lines.join("\n");
    joined.push('\n');
    flatten_headers(&joined).0
}

/// Index of the first line after a leading `---` front matter block.
fn front_matter_end(lines: &[String]) -> usize {
    if lines.first().map(String::as_str) != Some("---") {
        return 0;
    }
    lines
        .iter()
        .skip(1)
        .position(|l| l == "---")
        .map_or(0, |i| i + 2)
}

/// Run the external converter on `path` and wait for it.
pub fn run_converter(
    command: &[String],
    path: &Path,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<(), RemediationError> {
    let converter_err = |exit_code: Option<i32>, message: String| RemediationError::Converter { exit_code, message };
    let (program, args) = command
        .split_first()
        .ok_or_else(|| converter_err(None, "empty converter command".to_string()))?;

    let mut child = Command::new(program)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| converter_err(None, format!("failed to start {program}: {e}")))?;

    // Drain stderr on the side so a chatty converter cannot fill the pipe.
    let stderr = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = String::new();
            let _ = pipe.read_to_string(&mut buf);
            buf
        })
    });
    let stderr_text = |handle: Option<thread::JoinHandle<String>>| {
        let text = handle.and_then(|h| h.join().ok()).unwrap_or_default();
        text.trim().chars().take(MAX_STDERR_CHARS).collect::<String>()
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => {
                let message = stderr_text(stderr);
                return Err(converter_err(status.code(), format!("{program} exited with {status}: {message}")));
            }
            Ok(None) => {}
            Err(e) => return Err(converter_err(None, e.to_string())),
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RemediationError::Cancelled);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(converter_err(None, format!("{program} timed out after {timeout:?}")));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
