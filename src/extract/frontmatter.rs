use crate::epub::Archive;
use serde::Serialize;

/// Descriptive fields carried into the front matter.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BookMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BookMetadata {
    pub fn from_archive(archive: &dyn Archive) -> Self {
        // Empty values count as absent.
        let field = |name: &str| archive.metadata("DC", name).filter(|v| !v.is_empty());
        BookMetadata {
            title: field("title"),
            author: field("creator"),
            language: field("language"),
            publisher: field("publisher"),
            description: field("description"),
        }
    }

    /// Present fields as `(key, value)` pairs in front-matter order.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("language", &self.language),
            ("publisher", &self.publisher),
            ("description", &self.description),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// YAML block delimited by `---` lines, or an empty string when no field
    /// is set. Single-line values are double-quoted; multi-line values use a
    /// literal block.
    pub fn to_front_matter(&self) -> String {
        let fields = self.fields();
        if fields.is_empty() {
            return String::new();
        }

        let mut lines = vec!["---".to_string()];
        for (key, value) in fields {
            if value.contains('\n') {
                lines.push(format!("{key}: |"));
                lines.extend(value.split('\n').map(|line| format!("  {line}")));
            } else {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                lines.push(format!("{key}: \"{escaped}\""));
            }
        }
        lines.push("---\n".to_string());
        lines.join("\n")
    }
}
