//! `META-INF/container.xml` and OPF package document parsing.

use crate::epub::{EpubMetadata, EpubVersion, ManifestItem, SpineItem};
use crate::error::{EpubError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

pub struct Package {
    pub metadata: EpubMetadata,
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineItem>,
    pub version: EpubVersion,
}

/// Parse META-INF/container.xml to find the OPF rootfile path
pub fn parse_container(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(ref e) | Event::Start(ref e) if e.local_name().as_ref() == b"rootfile" => {
                if let Some(path) = attr(e, b"full-path") {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Err(EpubError::InvalidEpub(
        "no rootfile found in container.xml".into(),
    ))
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn manifest_item(e: &BytesStart<'_>) -> ManifestItem {
    ManifestItem {
        id: attr(e, b"id").unwrap_or_default(),
        href: attr(e, b"href").unwrap_or_default(),
        media_type: attr(e, b"media-type").unwrap_or_default(),
        properties: attr(e, b"properties"),
    }
}

fn spine_item(e: &BytesStart<'_>) -> SpineItem {
    SpineItem {
        idref: attr(e, b"idref").unwrap_or_default(),
    }
}

fn store_metadata(metadata: &mut EpubMetadata, element: &str, text: String) {
    match element {
        "identifier" => metadata.identifiers.push(text),
        "title" => metadata.titles.push(text),
        "language" => metadata.languages.push(text),
        "creator" => metadata.creators.push(text),
        "publisher" => metadata.publishers.push(text),
        "date" => metadata.dates.push(text),
        "subject" => metadata.subjects.push(text),
        "description" => {
            metadata.description.get_or_insert(text);
        }
        "rights" => {
            metadata.rights.get_or_insert(text);
        }
        _ => {}
    }
}

/// Parse the OPF package document into metadata, manifest and spine.
pub fn parse_package(xml: &str) -> Result<Package> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut metadata = EpubMetadata::default();
    let mut manifest = Vec::new();
    let mut spine = Vec::new();
    let mut version = EpubVersion::V3;

    let mut in_metadata = false;
    let mut current_element: Option<String> = None;
    let mut current_text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match local.as_str() {
                    "package" => {
                        if attr(e, b"version").is_some_and(|v| v.starts_with('2')) {
                            version = EpubVersion::V2;
                        }
                    }
                    "metadata" => in_metadata = true,
                    "item" => manifest.push(manifest_item(e)),
                    "itemref" => spine.push(spine_item(e)),
                    _ if in_metadata => {
                        current_element = Some(local);
                        current_text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"item" => manifest.push(manifest_item(e)),
                b"itemref" => spine.push(spine_item(e)),
                _ => {}
            },
            Event::Text(ref e) if current_element.is_some() => {
                current_text.push_str(&e.unescape().unwrap_or_default());
            }
            Event::CData(ref e) if current_element.is_some() => {
                current_text.push_str(&String::from_utf8_lossy(e));
            }
            Event::End(ref e) => {
                let local = e.local_name();
                if local.as_ref() == b"metadata" {
                    in_metadata = false;
                } else if let Some(element) = current_element.take() {
                    let text = current_text.trim().to_string();
                    if !text.is_empty() {
                        store_metadata(&mut metadata, &element, text);
                    }
                    current_text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(Package {
        metadata,
        manifest,
        spine,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opf(version: &str, metadata_extra: &str, manifest_extra: &str, spine_extra: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="{version}" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:test</dc:identifier>
    <dc:title>Test Book</dc:title>
    <dc:language>zh-CN</dc:language>
    {metadata_extra}
  </metadata>
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    {manifest_extra}
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    {spine_extra}
  </spine>
</package>"#
        )
    }

    #[test]
    fn container_points_at_rootfile() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
        assert_eq!(parse_container(xml).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn container_without_rootfile_is_invalid() {
        let xml = r#"<container><rootfiles></rootfiles></container>"#;
        assert!(matches!(
            parse_container(xml),
            Err(EpubError::InvalidEpub(_))
        ));
    }

    #[test]
    fn container_malformed_xml() {
        assert!(parse_container("<container><not-closed>").is_err());
    }

    #[test]
    fn package_version_detection() {
        assert_eq!(parse_package(&opf("2.0", "", "", "")).unwrap().version, EpubVersion::V2);
        assert_eq!(parse_package(&opf("3.0", "", "", "")).unwrap().version, EpubVersion::V3);
    }

    #[test]
    fn package_dublin_core_fields() {
        let xml = opf(
            "3.0",
            r#"<dc:creator>鲁迅</dc:creator>
    <dc:publisher>Press</dc:publisher>
    <dc:description>Line one
Line two</dc:description>"#,
            "",
            "",
        );
        let pkg = parse_package(&xml).unwrap();
        assert_eq!(pkg.metadata.titles, vec!["Test Book"]);
        assert_eq!(pkg.metadata.creators, vec!["鲁迅"]);
        assert_eq!(pkg.metadata.publishers, vec!["Press"]);
        assert_eq!(pkg.metadata.languages, vec!["zh-CN"]);
        assert_eq!(
            pkg.metadata.description.as_deref(),
            Some("Line one\nLine two")
        );
    }

    #[test]
    fn package_meta_elements_are_not_titles() {
        let xml = opf(
            "3.0",
            r#"<meta property="dcterms:modified">2024-06-15T10:30:00Z</meta>"#,
            "",
            "",
        );
        let pkg = parse_package(&xml).unwrap();
        assert_eq!(pkg.metadata.titles.len(), 1);
        assert!(pkg.metadata.dates.is_empty());
    }

    #[test]
    fn package_manifest_and_spine() {
        let xml = opf(
            "3.0",
            "",
            r#"<item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="cover" href="img/cover.jpg" media-type="image/jpeg"></item>"#,
            r#"<itemref idref="cover" linear="no"/>"#,
        );
        let pkg = parse_package(&xml).unwrap();
        assert_eq!(pkg.manifest.len(), 3);
        assert_eq!(pkg.manifest[1].properties.as_deref(), Some("nav"));
        assert_eq!(pkg.manifest[2].href, "img/cover.jpg");
        assert_eq!(pkg.spine.len(), 2);
        assert_eq!(pkg.spine[1].idref, "cover");
    }

    #[test]
    fn package_empty_sections() {
        let xml = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"></metadata>
  <manifest/>
  <spine/>
</package>"#;
        let pkg = parse_package(xml).unwrap();
        assert!(pkg.metadata.titles.is_empty());
        assert!(pkg.manifest.is_empty());
        assert!(pkg.spine.is_empty());
    }
}
