//! Scanner integration tests over a temporary corpus.

use std::fs;

use steward_analysis::scanner::CorpusScanner;
use steward_core::config::ScanConfig;
use steward_core::AllowedRoots;

fn write(dir: &std::path::Path, rel: &str, content: &[u8]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn scanner(dir: &std::path::Path, config: ScanConfig) -> CorpusScanner {
    let roots = AllowedRoots::new(dir, &config.effective_roots()).unwrap();
    CorpusScanner::new(roots, &config).unwrap()
}

#[test]
fn scan_measures_every_markdown_file() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "docs/README.md",
        b"# Home\n\n- [Guide](guide.md)\n- [FAQ](faq.md)\n\n## Sections\n",
    );
    write(dir.path(), "docs/guide.md", b"# Guide   \n\nTODO: write this\nFIXME too\n");
    write(dir.path(), "docs/faq.md", b"intro without title\n### deep\n");
    write(dir.path(), "docs/image.png", b"\x89PNG");

    let mut s = scanner(dir.path(), ScanConfig::default());
    let snap = s.scan_once(1_000).unwrap();

    let paths: Vec<&str> = snap.files.iter().map(|f| f.metric.path.as_str()).collect();
    assert_eq!(paths, vec!["docs/README.md", "docs/faq.md", "docs/guide.md"]);
    assert!(snap.skipped.is_empty());

    let guide = snap.file("docs/guide.md").unwrap();
    assert_eq!(guide.metric.debt_marker_count, 2);
    assert_eq!(guide.metric.line_count, 4);
    assert!(guide.content.starts_with("# Guide\n"));

    let faq = snap.file("docs/faq.md").unwrap();
    assert!(!faq.metric.has_title);
    assert_eq!(faq.metric.format_issue_count, 1);

    let root = snap.root_document.as_ref().unwrap();
    assert_eq!(root.path, "docs/README.md");
    assert_eq!(root.link_count, 2);
    assert_eq!(root.header_count, 2);
    assert!(!root.quick_nav_present);
    assert!(snap.files.iter().all(|f| f.metric.sampled_at == 1_000));
}

#[test]
fn unreadable_files_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "docs/README.md", b"# Home\n");
    write(dir.path(), "docs/latin1.md", b"caf\xe9\n");
    let mut config = ScanConfig::default();
    config.max_file_size = Some(16);
    write(dir.path(), "docs/big.md", &[b'x'; 64]);

    let mut s = scanner(dir.path(), config);
    let snap = s.scan_once(5).unwrap();
    assert_eq!(snap.files.len(), 1);
    assert_eq!(snap.skipped_count(), 2);
    let codes: Vec<&str> = snap.skipped.iter().map(|k| k.error_code).collect();
    assert!(codes.contains(&"ENCODING_ERROR"));
    assert!(codes.contains(&"SCAN_ERROR"));
}

#[test]
fn missing_root_document_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "docs/a.md", b"# A\n");
    let mut s = scanner(dir.path(), ScanConfig::default());
    assert_eq!(s.root_document(), "docs/README.md");
    assert!(s.scan_once(1).unwrap().root_document.is_none());
}

#[test]
fn identical_content_scans_identically() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "docs/a.md", b"# A\n\nsame [x](y.md)\n");
    write(dir.path(), "docs/b.md", b"# A   \r\n\r\nsame [x](y.md)\r\n");
    let mut s = scanner(dir.path(), ScanConfig::default());
    let snap = s.scan_once(1).unwrap();
    let (a, b) = (&snap.files[0].metric, &snap.files[1].metric);
    assert_eq!(a.content_hash, b.content_hash);
    assert_eq!(a.line_count, b.line_count);
    assert_eq!(a.link_count, b.link_count);
}

#[test]
fn measure_paths_rescans_subjects() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "docs/a.md", b"# A\none\ntwo\n");
    let mut s = scanner(dir.path(), ScanConfig::default());
    let metrics = s
        .measure_paths(&["docs/a.md".to_string(), "docs/gone.md".to_string()], 9)
        .unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].line_count, 3);
    assert!(s.measure_paths(&["../outside.md".to_string()], 9).is_err());
}
