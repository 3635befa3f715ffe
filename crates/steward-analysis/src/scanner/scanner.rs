//! Scanner: walk, read, measure.

use std::time::{Duration, Instant};

use rayon::prelude::*;
use steward_core::config::ScanConfig;
use steward_core::errors::{ScanError, StewardErrorCode};
use steward_core::traits::{Cancellable, CancellationToken};
use steward_core::types::FileMetric;
use steward_core::AllowedRoots;

use super::markdown::{self, MarkdownStats};
use super::reader::TimedReader;
use super::types::{RootDocumentProfile, ScanSnapshot, ScannedFile, SkippedFile};
use super::walker::{self, WalkOptions};

/// Measures the corpus under a fixed set of allowed roots.
pub struct CorpusScanner {
    roots: AllowedRoots,
    options: WalkOptions,
    reader: TimedReader,
    max_file_size: u64,
    root_document: String,
    cancel: CancellationToken,
}

impl CorpusScanner {
    pub fn new(roots: AllowedRoots, config: &ScanConfig) -> Result<Self, ScanError> {
        let options = WalkOptions::new(
            config.effective_extensions(),
            &config.exclude,
            config.effective_follow_symlinks(),
        );
        let reader = TimedReader::new(Duration::from_millis(config.effective_file_timeout_ms()))?;
        let root_document = root_document_path(&roots, &config.effective_root_document());
        Ok(Self {
            roots,
            options,
            reader,
            max_file_size: config.effective_max_file_size(),
            root_document,
            cancel: CancellationToken::new(),
        })
    }

    pub fn roots(&self) -> &AllowedRoots {
        &self.roots
    }

    /// Relative path of the root navigation document.
    pub fn root_document(&self) -> &str {
        &self.root_document
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// One full scan. Per-file failures are recorded in `skipped`; only a
    /// cancelled scan returns an error.
    pub fn scan_once(&mut self, now: i64) -> Result<ScanSnapshot, ScanError> {
        let start = Instant::now();
        let discovered = walker::discover(&self.roots, &self.options)?;

        let mut raw: Vec<(String, String)> = Vec::with_capacity(discovered.len());
        let mut skipped = Vec::new();
        for file in discovered {
            if self.cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            match self.read_text(&file.abs) {
                Ok(text) => raw.push((file.rel, text)),
                Err(e) => {
                    tracing::warn!(path = %file.rel, error = %e, "skipping file");
                    skipped.push(SkippedFile {
                        path: file.rel,
                        error_code: e.error_code(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let measured: Vec<(ScannedFile, MarkdownStats)> = raw
            .par_iter()
            .map(|(rel, text)| {
                let (metric, content, stats) = markdown::measure(rel, text, now);
                (ScannedFile { metric, content }, stats)
            })
            .collect();

        let root_document = measured
            .iter()
            .find(|(f, _)| f.metric.path == self.root_document)
            .map(|(f, stats)| RootDocumentProfile {
                path: f.metric.path.clone(),
                header_count: stats.header_count,
                link_count: stats.link_count,
                max_header_depth: stats.max_header_depth,
                quick_nav_present: stats.quick_nav_present,
            });

        let files: Vec<ScannedFile> = measured.into_iter().map(|(f, _)| f).collect();
        let duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            scan_file_count = files.len(),
            scan_skipped = skipped.len(),
            scan_duration_ms = duration_ms,
            "scan complete"
        );

        Ok(ScanSnapshot {
            sampled_at: now,
            files,
            skipped,
            duration_ms,
            root_document,
        })
    }

    /// Measure specific corpus files, e.g. the subjects of a finished action.
    /// Missing files are left out of the result.
    pub fn measure_paths(&mut self, paths: &[String], now: i64) -> Result<Vec<FileMetric>, ScanError> {
        let mut out = Vec::with_capacity(paths.len());
        for rel in paths {
            let abs = self
                .roots
                .resolve(rel)
                .map_err(|e| ScanError::Io {
                    path: rel.into(),
                    message: e.to_string(),
                })?;
            if !abs.exists() {
                continue;
            }
            let text = self.read_text(&abs)?;
            out.push(markdown::measure(rel, &text, now).0);
        }
        Ok(out)
    }

    fn read_text(&mut self, abs: &std::path::Path) -> Result<String, ScanError> {
        let bytes = self.reader.read(abs, self.max_file_size)?;
        String::from_utf8(bytes).map_err(|_| ScanError::Encoding {
            path: abs.to_path_buf(),
        })
    }
}

/// `<first root>/<document>`, relative to the working root.
pub fn root_document_path(roots: &AllowedRoots, document: &str) -> String {
    let first = roots
        .roots()
        .first()
        .and_then(|r| roots.relativize(r))
        .unwrap_or_default();
    if first.is_empty() {
        document.to_string()
    } else {
        format!("{first}/{document}")
    }
}
