use crate::epub::Resource;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// An extracted image and the file name it is written under.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub original_path: String,
    pub assigned_name: String,
    pub data: Vec<u8>,
}

/// Maps in-archive image paths to deduplicated output file names.
///
/// Every record is reachable by its full archive path and, unless another
/// image already claimed it, by its bare file name. Markup in EPUBs refers to
/// images through inconsistent relative paths, so [`ImageRegistry::resolve`]
/// falls back from exact to basename to suffix matching.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    image_dir: String,
    records: Vec<ImageRecord>,
    // Keys in registration order; a re-registered key keeps its position.
    keys: Vec<String>,
    index: HashMap<String, usize>,
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Split `name` into stem and extension (with its dot). Leading dots belong
/// to the stem, so `.hidden` has no extension.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if !name[..idx].trim_start_matches('.').is_empty() => {
            (&name[..idx], &name[idx..])
        }
        _ => (name, ""),
    }
}

/// Drop leading `../` segments, then a leading `./`.
fn strip_relative_prefix(src: &str) -> &str {
    let mut cleaned = src;
    while let Some(rest) = cleaned.strip_prefix("../") {
        cleaned = rest;
    }
    match cleaned.strip_prefix("./") {
        Some(rest) => rest.trim_start_matches('/'),
        None => cleaned,
    }
}

impl ImageRegistry {
    pub fn new(image_dir: &str) -> Self {
        ImageRegistry {
            image_dir: image_dir.to_string(),
            ..Default::default()
        }
    }

    /// Register every image resource, in order.
    pub fn harvest(images: &[Resource<'_>], image_dir: &str) -> Self {
        let mut registry = ImageRegistry::new(image_dir);
        for image in images {
            registry.register(image.name, image.content.to_vec());
        }
        log::debug!("harvested {} images", registry.records.len());
        registry
    }

    pub fn register(&mut self, original_path: &str, data: Vec<u8>) {
        let assigned_name = self.unique_name(basename(original_path));
        let idx = self.records.len();
        self.records.push(ImageRecord {
            original_path: original_path.to_string(),
            assigned_name,
            data,
        });

        self.insert_key(original_path, idx);
        let base = basename(original_path);
        if !self.index.contains_key(base) {
            self.insert_key(base, idx);
        }
    }

    fn insert_key(&mut self, key: &str, idx: usize) {
        if self.index.insert(key.to_string(), idx).is_none() {
            self.keys.push(key.to_string());
        }
    }

    fn unique_name(&self, file_name: &str) -> String {
        let taken = |name: &str| self.records.iter().any(|r| r.assigned_name == name);
        if !taken(file_name) {
            return file_name.to_string();
        }
        let (stem, ext) = split_extension(file_name);
        (1..)
            .map(|n| format!("{stem}_{n}{ext}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| file_name.to_string())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn output_path(&self, idx: usize) -> String {
        format!("{}/{}", self.image_dir, self.records[idx].assigned_name)
    }

    /// Rewrite an `<img src>` value to its output-relative path.
    ///
    /// Unresolvable references come back unchanged.
    pub fn resolve(&self, src: &str) -> String {
        if let Some(&idx) = self.index.get(src) {
            return self.output_path(idx);
        }
        if let Some(&idx) = self.index.get(basename(src)) {
            return self.output_path(idx);
        }

        let cleaned = strip_relative_prefix(src);
        if !cleaned.is_empty() {
            let hit = self
                .keys
                .iter()
                .find(|key| key.ends_with(cleaned) || cleaned.ends_with(basename(key)))
                .and_then(|key| self.index.get(key));
            if let Some(&idx) = hit {
                return self.output_path(idx);
            }
        }

        log::debug!("unresolved image reference: {src}");
        src.to_string()
    }

    /// Write every record to `<output_dir>/<image_dir>/<assigned_name>`.
    ///
    /// Failures are logged and skipped; returns the number of files written.
    pub fn persist(&self, output_dir: &Path) -> usize {
        if self.records.is_empty() {
            return 0;
        }
        let dir = output_dir.join(&self.image_dir);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            log::warn!("cannot create image directory {}: {e}", dir.display());
            return 0;
        }

        let mut written = HashSet::new();
        for record in &self.records {
            if written.contains(record.assigned_name.as_str()) {
                continue;
            }
            let path = dir.join(&record.assigned_name);
            match std::fs::write(&path, &record.data) {
                Ok(()) => {
                    log::debug!("wrote {}", path.display());
                    written.insert(record.assigned_name.as_str());
                }
                Err(e) => log::warn!("failed to write image {}: {e}", path.display()),
            }
        }
        written.len()
    }
}
