use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Find the full resource key in the resources map for a given href.
///
/// EPUB resources are stored with their full ZIP path (e.g. "OEBPS/ch1.xhtml"),
/// but manifest hrefs are relative to the OPF directory (e.g. "ch1.xhtml").
/// This function first checks for an exact match, then falls back to the
/// shortest key ending in `/<href>`.
pub fn find_resource_key(resources: &HashMap<String, Vec<u8>>, href: &str) -> Option<String> {
    if resources.contains_key(href) {
        return Some(href.to_string());
    }
    let suffix = format!("/{href}");
    resources
        .keys()
        .filter(|k| k.ends_with(&suffix))
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
        .cloned()
}

/// Resolve `href` against `base_dir` (which ends with `/` or is empty),
/// folding `.` and `..` segments. The fragment is carried over untouched;
/// absolute URLs and pure fragments are returned as-is.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    if href.is_empty() || href.starts_with('#') || href.contains("://") {
        return href.to_string();
    }
    let (path, fragment) = match href.split_once('#') {
        Some((path, frag)) => (path, Some(frag)),
        None => (href, None),
    };

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut resolved = segments.join("/");
    if let Some(frag) = fragment {
        resolved.push('#');
        resolved.push_str(frag);
    }
    resolved
}

/// Default Markdown output path: the input path with a `.md` extension.
pub fn default_output_path(epub_path: &Path) -> PathBuf {
    epub_path.with_extension("md")
}

/// Whether the path names an existing file with an `.epub` extension.
pub fn is_epub_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
}

/// Return `path` if it is free, otherwise the first free `<stem>_<n>.<ext>`.
pub fn unique_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    (1..)
        .map(|n| parent.join(format!("{stem}_{n}{ext}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Format a byte count as a human-readable size string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_resource_key_exact_match() {
        let mut resources = HashMap::new();
        resources.insert("ch1.xhtml".to_string(), vec![]);
        assert_eq!(
            find_resource_key(&resources, "ch1.xhtml"),
            Some("ch1.xhtml".to_string())
        );
    }

    #[test]
    fn test_find_resource_key_suffix_match() {
        let mut resources = HashMap::new();
        resources.insert("OEBPS/ch1.xhtml".to_string(), vec![]);
        assert_eq!(
            find_resource_key(&resources, "ch1.xhtml"),
            Some("OEBPS/ch1.xhtml".to_string())
        );
    }

    #[test]
    fn test_find_resource_key_respects_segments() {
        let mut resources: HashMap<String, Vec<u8>> = HashMap::new();
        resources.insert("OEBPS/xch1.xhtml".to_string(), vec![]);
        assert_eq!(find_resource_key(&resources, "ch1.xhtml"), None);

        resources.insert("OEBPS/extra/text/ch1.xhtml".to_string(), vec![]);
        resources.insert("OEBPS/text/ch1.xhtml".to_string(), vec![]);
        assert_eq!(
            find_resource_key(&resources, "ch1.xhtml"),
            Some("OEBPS/text/ch1.xhtml".to_string())
        );
        assert_eq!(
            find_resource_key(&resources, "text/ch1.xhtml"),
            Some("OEBPS/text/ch1.xhtml".to_string())
        );
    }

    #[test]
    fn test_find_resource_key_not_found() {
        let resources: HashMap<String, Vec<u8>> = HashMap::new();
        assert_eq!(find_resource_key(&resources, "missing.xhtml"), None);
    }

    #[test]
    fn test_resolve_href_parent_segments() {
        assert_eq!(resolve_href("Nav/", "../Text/ch1.xhtml"), "Text/ch1.xhtml");
        assert_eq!(resolve_href("a/b/", "./c.xhtml#x"), "a/b/c.xhtml#x");
        assert_eq!(resolve_href("", "ch1.xhtml"), "ch1.xhtml");
    }

    #[test]
    fn test_resolve_href_passthrough() {
        assert_eq!(resolve_href("Text/", "#note"), "#note");
        assert_eq!(
            resolve_href("Text/", "https://example.com/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("books/novel.epub")),
            PathBuf::from("books/novel.md")
        );
    }

    #[test]
    fn test_is_epub_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let upper = tmp.path().join("BOOK.EPUB");
        let other = tmp.path().join("book.pdf");
        std::fs::write(&upper, b"x").unwrap();
        std::fs::write(&other, b"x").unwrap();
        assert!(is_epub_file(&upper));
        assert!(!is_epub_file(&other));
        assert!(!is_epub_file(&tmp.path().join("missing.epub")));
    }

    #[test]
    fn test_unique_path_counts_up() {
        let tmp = tempfile::TempDir::new().unwrap();
        let target = tmp.path().join("out.md");
        assert_eq!(unique_path(&target), target);

        std::fs::write(&target, "").unwrap();
        std::fs::write(tmp.path().join("out_1.md"), "").unwrap();
        assert_eq!(unique_path(&target), tmp.path().join("out_2.md"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5 MB");
    }
}
