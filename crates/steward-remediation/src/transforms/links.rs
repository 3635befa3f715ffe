//! Relative link arithmetic over `/`-separated corpus paths.

/// Directory part of a corpus path (`""` at the top level).
pub fn parent_dir(rel: &str) -> &str {
    rel.rfind('/').map_or("", |i| &rel[..i])
}

/// File name without its extension.
pub fn file_stem(rel: &str) -> &str {
    let name = rel.rfind('/').map_or(rel, |i| &rel[i + 1..]);
    name.rfind('.').filter(|i| *i > 0).map_or(name, |i| &name[..i])
}

/// Join `target` onto `dir`, resolving `.` and `..`. `None` when the result
/// climbs above the working root.
pub fn join(dir: &str, target: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in target.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            p => parts.push(p),
        }
    }
    Some(parts.join("/"))
}

/// True for targets that point at another corpus file.
pub fn is_local(target: &str) -> bool {
    !(target.is_empty()
        || target.starts_with('#')
        || target.starts_with('/')
        || target.contains("://")
        || target.starts_with("mailto:"))
}

/// Corpus path a link in `from` points at, without fragment or title.
pub fn resolve(from: &str, target: &str) -> Option<String> {
    let target = target.split_whitespace().next()?;
    let target = target.split('#').next()?;
    if !is_local(target) {
        return None;
    }
    join(parent_dir(from), target)
}

/// Link target that reaches `to` from a document at `from`.
pub fn relative(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = parent_dir(from).split('/').filter(|p| !p.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();
    let (to_dir, name) = to_parts.split_at(to_parts.len().saturating_sub(1));
    let common = from_dir
        .iter()
        .zip(to_dir)
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = vec![".."; from_dir.len() - common];
    out.extend(&to_dir[common..]);
    out.extend(name);
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_and_parents() {
        assert_eq!(parent_dir("docs/guide/a.md"), "docs/guide");
        assert_eq!(parent_dir("a.md"), "");
        assert_eq!(file_stem("docs/A.md"), "A");
        assert_eq!(file_stem("docs/.hidden"), ".hidden");
    }

    #[test]
    fn resolves_relative_targets() {
        assert_eq!(resolve("docs/a.md", "b.md").as_deref(), Some("docs/b.md"));
        assert_eq!(resolve("docs/x/a.md", "../b.md#top").as_deref(), Some("docs/b.md"));
        assert_eq!(resolve("docs/a.md", "c.md \"Title\"").as_deref(), Some("docs/c.md"));
        assert_eq!(resolve("docs/a.md", "https://example.com/x.md"), None);
        assert_eq!(resolve("docs/a.md", "#anchor"), None);
        assert_eq!(resolve("a.md", "../../b.md"), None);
    }

    #[test]
    fn relative_round_trips_through_resolve() {
        for (from, to) in [
            ("docs/a.md", "docs/b.md"),
            ("docs/x/a.md", "docs/y/b.md"),
            ("docs/a.md", "docs/x/y/b.md"),
            ("a.md", "docs/b.md"),
        ] {
            let link = relative(from, to);
            assert_eq!(resolve(from, &link).as_deref(), Some(to), "{from} -> {link}");
        }
        assert_eq!(relative("docs/x/a.md", "docs/y/b.md"), "../y/b.md");
    }
}
