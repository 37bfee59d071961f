pub mod navigation;
pub mod package;
pub mod reader;

use crate::util::find_resource_key;
use serde::Serialize;
use std::collections::HashMap;

/// Read-only view of an EPUB archive, as seen by the converter.
///
/// The converter never touches ZIP or OPF structures directly; anything that
/// can list typed resources, answer metadata queries and expose a spine and a
/// navigation tree can be converted.
pub trait Archive {
    /// Content documents in manifest order.
    fn documents(&self) -> Vec<Resource<'_>>;

    /// Image resources in manifest order.
    fn images(&self) -> Vec<Resource<'_>>;

    /// First value of a descriptive metadata field, e.g. `("DC", "title")`.
    fn metadata(&self, namespace: &str, field: &str) -> Option<String>;

    /// Hierarchical navigation tree.
    fn toc(&self) -> &[NavPoint];

    /// Declared reading order as manifest ids.
    fn spine(&self) -> Vec<&str>;
}

/// A manifest resource together with its bytes.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub id: &'a str,
    /// Manifest href, relative to the package directory.
    pub name: &'a str,
    pub media_type: &'a str,
    pub content: &'a [u8],
}

/// Represents a parsed EPUB book
#[derive(Debug, Default)]
pub struct EpubBook {
    pub metadata: EpubMetadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    pub navigation: Navigation,
    /// ZIP path prefix of the OPF file, e.g. `OEBPS/` (empty at root level).
    pub opf_dir: String,
    pub resources: HashMap<String, Vec<u8>>,
}

/// Dublin Core metadata fields
#[derive(Debug, Default, Clone, Serialize)]
pub struct EpubMetadata {
    pub identifiers: Vec<String>,
    pub titles: Vec<String>,
    pub languages: Vec<String>,
    pub creators: Vec<String>,
    pub publishers: Vec<String>,
    pub dates: Vec<String>,
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub rights: Option<String>,
}

/// An item in the EPUB manifest
#[derive(Debug, Clone)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// The EPUB 3 navigation document carries the `nav` property.
    pub fn is_nav(&self) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|p| p.split_whitespace().any(|prop| prop == "nav"))
    }

    pub fn is_document(&self) -> bool {
        self.media_type.contains("html") && !self.is_nav()
    }
}

/// A spine item reference
#[derive(Debug, Clone)]
pub struct SpineItem {
    pub idref: String,
}

/// Navigation structure
#[derive(Debug, Default)]
pub struct Navigation {
    pub toc: Vec<NavPoint>,
    pub epub_version: EpubVersion,
}

/// A navigation point in the TOC tree
#[derive(Debug, Clone, PartialEq)]
pub struct NavPoint {
    pub label: String,
    pub href: String,
    pub children: Vec<NavPoint>,
}

/// EPUB version
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EpubVersion {
    V2,
    #[default]
    V3,
}

impl EpubBook {
    /// Bytes of the resource a manifest href points to.
    ///
    /// Manifest hrefs are relative to the OPF directory while resources are
    /// keyed by full ZIP path, so the prefixed path is tried first and a
    /// suffix match is the last resort.
    pub fn resource(&self, href: &str) -> Option<&[u8]> {
        let full_path = format!("{}{href}", self.opf_dir);
        if let Some(bytes) = self.resources.get(&full_path) {
            return Some(bytes);
        }
        let key = find_resource_key(&self.resources, href)?;
        self.resources.get(&key).map(Vec::as_slice)
    }

    fn manifest_resources(&self, keep: impl Fn(&ManifestItem) -> bool) -> Vec<Resource<'_>> {
        self.manifest
            .iter()
            .filter(|item| keep(item))
            .filter_map(|item| {
                let content = self.resource(&item.href)?;
                Some(Resource {
                    id: &item.id,
                    name: &item.href,
                    media_type: &item.media_type,
                    content,
                })
            })
            .collect()
    }
}

impl Archive for EpubBook {
    fn documents(&self) -> Vec<Resource<'_>> {
        self.manifest_resources(ManifestItem::is_document)
    }

    fn images(&self) -> Vec<Resource<'_>> {
        self.manifest_resources(ManifestItem::is_image)
    }

    fn metadata(&self, namespace: &str, field: &str) -> Option<String> {
        if !namespace.eq_ignore_ascii_case("DC") {
            return None;
        }
        let meta = &self.metadata;
        let value = match field {
            "title" => meta.titles.first(),
            "creator" => meta.creators.first(),
            "language" => meta.languages.first(),
            "publisher" => meta.publishers.first(),
            "identifier" => meta.identifiers.first(),
            "date" => meta.dates.first(),
            "subject" => meta.subjects.first(),
            "description" => meta.description.as_ref(),
            "rights" => meta.rights.as_ref(),
            _ => None,
        };
        value.cloned()
    }

    fn toc(&self) -> &[NavPoint] {
        &self.navigation.toc
    }

    fn spine(&self) -> Vec<&str> {
        self.spine.iter().map(|s| s.idref.as_str()).collect()
    }
}

impl std::fmt::Display for EpubVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpubVersion::V2 => write!(f, "2.0"),
            EpubVersion::V3 => write!(f, "3.0"),
        }
    }
}
