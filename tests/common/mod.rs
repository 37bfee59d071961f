#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

struct Chapter {
    id: String,
    body: String,
    in_spine: bool,
}

/// Builder for small EPUB 3 files written to disk for tests.
///
/// Chapters live in `OEBPS/text/<id>.xhtml`; images and navigation hrefs are
/// relative to `OEBPS/`.
#[derive(Default)]
pub struct EpubFixture {
    metadata: Vec<(String, String)>,
    chapters: Vec<Chapter>,
    images: Vec<(String, Vec<u8>)>,
    toc: Vec<(String, String, Vec<(String, String)>)>,
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn media_type(href: &str) -> &'static str {
    match href.rsplit('.').next() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "image/jpeg",
    }
}

impl EpubFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a Dublin Core element, e.g. `("title", "Sample")`.
    pub fn meta(mut self, element: &str, value: &str) -> Self {
        self.metadata.push((element.to_string(), value.to_string()));
        self
    }

    /// Add a spine chapter whose `<body>` holds `body`.
    pub fn chapter(mut self, id: &str, body: &str) -> Self {
        self.chapters.push(Chapter {
            id: id.to_string(),
            body: body.to_string(),
            in_spine: true,
        });
        self
    }

    /// Add a manifest document that the spine does not reference.
    pub fn orphan(mut self, id: &str, body: &str) -> Self {
        self.chapters.push(Chapter {
            id: id.to_string(),
            body: body.to_string(),
            in_spine: false,
        });
        self
    }

    pub fn image(mut self, href: &str, data: &[u8]) -> Self {
        self.images.push((href.to_string(), data.to_vec()));
        self
    }

    /// Add a top-level navigation entry with optional children.
    pub fn toc_entry(mut self, label: &str, href: &str, children: &[(&str, &str)]) -> Self {
        self.toc.push((
            label.to_string(),
            href.to_string(),
            children
                .iter()
                .map(|(l, h)| (l.to_string(), h.to_string()))
                .collect(),
        ));
        self
    }

    fn opf(&self) -> String {
        let metadata: String = self
            .metadata
            .iter()
            .map(|(element, value)| format!("    <dc:{element}>{}</dc:{element}>\n", escape(value)))
            .collect();

        let mut manifest = String::from(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        for chapter in &self.chapters {
            manifest.push_str(&format!(
                "    <item id=\"{0}\" href=\"text/{0}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
                chapter.id
            ));
        }
        for (i, (href, _)) in self.images.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item id=\"img{i}\" href=\"{href}\" media-type=\"{}\"/>\n",
                media_type(href)
            ));
        }

        let spine: String = self
            .chapters
            .iter()
            .filter(|c| c.in_spine)
            .map(|c| format!("    <itemref idref=\"{}\"/>\n", c.id))
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>"#
        )
    }

    fn nav(&self) -> String {
        let items: String = self
            .toc
            .iter()
            .map(|(label, href, children)| {
                let nested = if children.is_empty() {
                    String::new()
                } else {
                    let inner: String = children
                        .iter()
                        .map(|(l, h)| format!("<li><a href=\"{h}\">{}</a></li>", escape(l)))
                        .collect();
                    format!("<ol>{inner}</ol>")
                };
                format!("<li><a href=\"{href}\">{}</a>{nested}</li>\n", escape(label))
            })
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Navigation</title></head>
<body>
<nav epub:type="toc"><ol>
{items}</ol></nav>
</body>
</html>"#
        )
    }

    fn xhtml(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter</title><link rel="stylesheet" href="../style.css"/></head>
<body>{body}</body>
</html>"#
        )
    }

    /// Write the EPUB to `path`.
    pub fn write_to(&self, path: &Path) {
        let file = std::fs::File::create(path).expect("create epub");
        let mut zip = ZipWriter::new(file);
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default();

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
        )
        .unwrap();

        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        zip.start_file("OEBPS/nav.xhtml", deflated).unwrap();
        zip.write_all(self.nav().as_bytes()).unwrap();

        for chapter in &self.chapters {
            zip.start_file(format!("OEBPS/text/{}.xhtml", chapter.id), deflated)
                .unwrap();
            zip.write_all(Self::xhtml(&chapter.body).as_bytes()).unwrap();
        }
        for (href, data) in &self.images {
            zip.start_file(format!("OEBPS/{href}"), stored).unwrap();
            zip.write_all(data).unwrap();
        }

        zip.finish().unwrap();
    }

    /// Write the EPUB as `dir/name` and return its path.
    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        self.write_to(&path);
        path
    }
}

/// One chapter with a heading, bold text and a cover image.
pub fn sample_book() -> EpubFixture {
    EpubFixture::new()
        .meta("title", "Sample")
        .meta("creator", "A. N.")
        .chapter(
            "intro",
            r#"<h1>Intro</h1><p>Hello <b>world</b></p><p><img src="../img/cover.jpg"/></p>"#,
        )
        .image("img/cover.jpg", &[0xFF, 0xD8, 0xFF, 0xE0])
}

/// Entry names under `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
