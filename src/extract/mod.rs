pub mod dom;
pub mod frontmatter;
pub mod html_to_md;
pub mod images;
pub mod order;
pub mod title;
pub mod toc;

use crate::epub::{Archive, EpubBook, reader};
use crate::error::ConvertError;
use frontmatter::BookMetadata;
use html_to_md::{Transformer, collapse_blank_lines, is_navigation_page};
use images::ImageRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use toc::TocIndex;

/// Settings for one conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    pub extract_images: bool,
    pub generate_toc: bool,
    /// Image directory name, relative to the Markdown file.
    pub image_dir: String,
    pub toc_heading: String,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptions {
            extract_images: true,
            generate_toc: true,
            image_dir: "images".to_string(),
            toc_heading: "目录".to_string(),
        }
    }
}

impl ConversionOptions {
    pub fn extract_images(mut self, enabled: bool) -> Self {
        self.extract_images = enabled;
        self
    }

    pub fn generate_toc(mut self, enabled: bool) -> Self {
        self.generate_toc = enabled;
        self
    }

    pub fn image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into();
        self
    }

    pub fn toc_heading(mut self, heading: impl Into<String>) -> Self {
        self.toc_heading = heading.into();
        self
    }
}

/// Outcome of [`Converter::save`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub image_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ConversionResult {
    fn failed(err: &ConvertError) -> Self {
        ConversionResult {
            success: false,
            output_path: None,
            image_count: 0,
            error_message: Some(err.to_string()),
        }
    }
}

/// A progress notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub percentage: u8,
    pub message: String,
}

/// Receives progress notifications from a running conversion.
///
/// Reports arrive on the converting thread, so implementations must return
/// promptly.
pub trait ProgressSink {
    fn report(&self, percentage: u8, message: &str);
}

impl<F: Fn(u8, &str)> ProgressSink for F {
    fn report(&self, percentage: u8, message: &str) {
        self(percentage, message)
    }
}

fn report(progress: Option<&dyn ProgressSink>, percentage: u8, message: &str) {
    log::debug!("[{percentage:>3}%] {message}");
    if let Some(sink) = progress {
        sink.report(percentage, message);
    }
}

/// Markdown for a whole book plus the images it references.
#[derive(Debug)]
pub struct Conversion {
    pub markdown: String,
    pub images: ImageRegistry,
}

/// Convert an opened archive to a single Markdown document.
///
/// The output is front matter, title, table of contents, then every content
/// document in reading order separated by `---`. Generated contents pages
/// are skipped.
pub fn convert_archive(
    archive: &dyn Archive,
    options: &ConversionOptions,
    progress: Option<&dyn ProgressSink>,
) -> Conversion {
    let mut parts: Vec<String> = Vec::new();

    report(progress, 10, "Extracting images");
    let images = if options.extract_images {
        ImageRegistry::harvest(&archive.images(), &options.image_dir)
    } else {
        ImageRegistry::new(&options.image_dir)
    };

    report(progress, 20, "Reading table of contents");
    let toc = TocIndex::flatten(archive.toc());

    report(progress, 30, "Collecting metadata");
    let metadata = BookMetadata::from_archive(archive);
    if !metadata.is_empty() {
        parts.push(metadata.to_front_matter());
    }
    if let Some(title) = &metadata.title {
        parts.push(format!("# {title}\n"));
    }
    if options.generate_toc {
        let toc_md = toc.render_markdown(&options.toc_heading);
        if !toc_md.is_empty() {
            parts.push(toc_md);
            parts.push("\n---\n".to_string());
        }
    }

    report(progress, 40, "Converting documents");
    let documents = archive.documents();
    let spine = archive.spine();
    let ordered = order::reading_order(&documents, &spine);
    let transformer = Transformer::new(&toc, &images);
    let total = ordered.len();

    for (idx, doc) in ordered.iter().enumerate() {
        let percentage = 40 + (idx * 50 / total) as u8;
        report(progress, percentage, &format!("Converting {}", doc.name));

        let html = decode_utf8(doc.content);
        let root = dom::parse_document(&html);
        if is_navigation_page(&root) {
            log::debug!("skipping contents page {}", doc.name);
            continue;
        }

        let markdown = transformer.transform(root);
        if !markdown.trim().is_empty() {
            parts.push(markdown);
            parts.push("\n\n---\n\n".to_string());
        }
    }

    let markdown = finish(&parts.join("\n"));
    report(progress, 100, "Done");
    Conversion { markdown, images }
}

/// Decode document bytes as UTF-8, dropping invalid sequences.
fn decode_utf8(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Final whitespace pass: collapse blank lines and drop trailing separators.
fn finish(assembled: &str) -> String {
    let collapsed = collapse_blank_lines(assembled);
    let mut out = collapsed.trim_end();
    while let Some(rest) = out.strip_suffix("\n---") {
        out = rest.trim_end();
    }
    out.trim().to_string()
}

/// Convert an archive and write the result to `output_path`, with images in
/// a sibling directory.
///
/// Nothing is written if the conversion produces no content.
pub fn save_archive(
    archive: &dyn Archive,
    output_path: &Path,
    options: &ConversionOptions,
    progress: Option<&dyn ProgressSink>,
) -> Result<ConversionResult, ConvertError> {
    let conversion = convert_archive(archive, options, progress);
    if conversion.markdown.is_empty() {
        return Err(ConvertError::EmptyOutput);
    }

    let output_dir = output_path.parent().unwrap_or_else(|| Path::new(""));
    if !output_dir.as_os_str().is_empty() {
        std::fs::create_dir_all(output_dir).map_err(|source| ConvertError::Io {
            path: output_dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(output_path, &conversion.markdown).map_err(|source| ConvertError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    let image_count = if options.extract_images {
        conversion.images.persist(output_dir)
    } else {
        0
    };
    log::info!(
        "wrote {} ({} bytes, {image_count} images)",
        output_path.display(),
        conversion.markdown.len()
    );

    Ok(ConversionResult {
        success: true,
        output_path: Some(output_path.to_path_buf()),
        image_count,
        error_message: None,
    })
}

/// Converts one EPUB file.
#[derive(Debug, Clone)]
pub struct Converter {
    epub_path: PathBuf,
    options: ConversionOptions,
}

impl Converter {
    pub fn new(epub_path: impl Into<PathBuf>, options: ConversionOptions) -> Self {
        Converter {
            epub_path: epub_path.into(),
            options,
        }
    }

    pub fn load(&self) -> Result<EpubBook, ConvertError> {
        reader::read_epub(&self.epub_path).map_err(|source| ConvertError::Load {
            path: self.epub_path.clone(),
            source,
        })
    }

    /// Convert to Markdown in memory. An unreadable archive yields an empty
    /// string.
    pub fn convert(&self, progress: Option<&dyn ProgressSink>) -> String {
        report(progress, 0, "Loading EPUB");
        match self.load() {
            Ok(book) => convert_archive(&book, &self.options, progress).markdown,
            Err(e) => {
                log::warn!("{e}");
                String::new()
            }
        }
    }

    /// Convert and write the Markdown file and images. Failures are reported
    /// in the result, never returned as errors.
    pub fn save(&self, output_path: &Path, progress: Option<&dyn ProgressSink>) -> ConversionResult {
        report(progress, 0, "Loading EPUB");
        let outcome = self
            .load()
            .and_then(|book| save_archive(&book, output_path, &self.options, progress));
        match outcome {
            Ok(result) => result,
            Err(e) => {
                log::warn!("conversion failed: {e}");
                ConversionResult::failed(&e)
            }
        }
    }
}
