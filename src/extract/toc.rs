use crate::epub::NavPoint;
use serde::Serialize;
use std::collections::HashMap;

/// One line of the flattened table of contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocEntry {
    pub title: String,
    /// Target document, fragment removed.
    pub href: String,
    /// Nesting depth, 1 for top-level entries.
    pub level: usize,
}

/// Flattened navigation with an href lookup.
#[derive(Debug, Default)]
pub struct TocIndex {
    entries: Vec<TocEntry>,
    by_href: HashMap<String, usize>,
}

impl TocIndex {
    /// Flatten a navigation tree depth-first.
    pub fn flatten(points: &[NavPoint]) -> Self {
        let mut entries = Vec::new();
        collect(points, 1, &mut entries);

        let mut by_href = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if !entry.href.is_empty() {
                by_href.insert(entry.href.clone(), idx);
            }
        }
        TocIndex { entries, by_href }
    }

    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entry for a document href. When several entries point at the same
    /// document the last one wins.
    pub fn lookup_href(&self, href: &str) -> Option<&TocEntry> {
        self.by_href.get(href).map(|&idx| &self.entries[idx])
    }

    /// Level of the first entry whose title equals `title` exactly.
    pub fn level_of_title(&self, title: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.title == title)
            .map(|entry| entry.level)
    }

    pub fn contains_title(&self, title: &str) -> bool {
        self.level_of_title(title).is_some()
    }

    /// Render the outline as a linked bullet list under a `##` heading.
    /// Returns an empty string when there are no entries.
    pub fn render_markdown(&self, heading: &str) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let mut lines = vec![format!("## {heading}\n")];
        for entry in &self.entries {
            let indent = "  ".repeat(entry.level.saturating_sub(1));
            lines.push(format!("{indent}- [{}](#{})", entry.title, anchor(&entry.title)));
        }
        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn collect(points: &[NavPoint], level: usize, out: &mut Vec<TocEntry>) {
    for point in points {
        let href = match point.href.split_once('#') {
            Some((path, _)) => path,
            None => point.href.as_str(),
        };
        out.push(TocEntry {
            title: point.label.clone(),
            href: href.to_string(),
            level,
        });
        collect(&point.children, level + 1, out);
    }
}

/// Heading anchor: lowercased, spaces to hyphens, parentheses dropped.
/// Other characters, CJK included, are kept as they are.
pub fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| !matches!(c, '（' | '）' | '(' | ')'))
        .collect()
}
