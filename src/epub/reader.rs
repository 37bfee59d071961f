use crate::epub::{EpubBook, Navigation, navigation, package};
use crate::error::{EpubError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Read and parse an EPUB file into an EpubBook model
pub fn read_epub(path: &Path) -> Result<EpubBook> {
    let file = File::open(path)?;
    read_epub_from(file)
}

/// Parse an EPUB from any seekable byte source.
pub fn read_epub_from<R: Read + Seek>(source: R) -> Result<EpubBook> {
    let mut archive = ZipArchive::new(source)?;
    validate_mimetype(&mut archive)?;

    let container_xml = read_entry_string(&mut archive, "META-INF/container.xml")?;
    let opf_path = package::parse_container(&container_xml)?;
    let opf_dir = match opf_path.rfind('/') {
        Some(idx) => opf_path[..=idx].to_string(),
        None => String::new(),
    };

    let opf_xml = read_entry_string(&mut archive, &opf_path)?;
    let package = package::parse_package(&opf_xml)?;

    let mut resources = HashMap::new();
    for name in list_entries(&archive) {
        if name == "mimetype" || name.starts_with("META-INF/") || name.ends_with('/') {
            continue;
        }
        match read_entry(&mut archive, &name) {
            Ok(data) => {
                resources.insert(name, data);
            }
            Err(e) => log::warn!("skipping unreadable entry {name}: {e}"),
        }
    }

    let navigation = navigation::parse_navigation(&package.manifest, &|href| {
        resources
            .get(&format!("{opf_dir}{href}"))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    })
    .unwrap_or_else(|e| {
        log::warn!("ignoring unreadable navigation: {e}");
        Navigation::default()
    });

    log::debug!(
        "read EPUB {}: {} manifest items, {} spine entries, {} resources",
        package.version,
        package.manifest.len(),
        package.spine.len(),
        resources.len()
    );

    Ok(EpubBook {
        metadata: package.metadata,
        manifest: package.manifest,
        spine: package.spine,
        navigation,
        opf_dir,
        resources,
    })
}

fn validate_mimetype<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<()> {
    let mut entry = archive
        .by_name("mimetype")
        .map_err(|_| EpubError::InvalidEpub("missing mimetype entry".into()))?;

    let mut content = String::new();
    entry.read_to_string(&mut content)?;

    if content.trim() != "application/epub+zip" {
        return Err(EpubError::InvalidEpub(format!(
            "invalid mimetype: {}",
            content.trim()
        )));
    }

    Ok(())
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .map_err(|_| EpubError::InvalidEpub(format!("missing entry: {name}")))?;
    let mut buf = Vec::new();
    entry.read_to_end(&mut buf)?;
    Ok(buf)
}

fn read_entry_string<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let bytes = read_entry(archive, name)?;
    String::from_utf8(bytes)
        .map_err(|e| EpubError::InvalidEpub(format!("invalid UTF-8 in {name}: {e}")))
}

fn list_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    (0..archive.len())
        .filter_map(|i| archive.name_for_index(i).map(|s| s.to_string()))
        .collect()
}
