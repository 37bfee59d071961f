use crate::epub::{EpubVersion, ManifestItem, NavPoint, Navigation};
use crate::error::Result;
use crate::util::resolve_href;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parse the navigation tree from the manifest.
///
/// Prefers the EPUB 3 navigation document and falls back to the NCX. Link
/// targets are rebased onto the package directory so they compare equal to
/// manifest hrefs, wherever the navigation file lives.
pub fn parse_navigation(
    manifest: &[ManifestItem],
    get_content: &dyn Fn(&str) -> Option<String>,
) -> Result<Navigation> {
    if let Some(nav_item) = manifest.iter().find(|item| item.is_nav())
        && let Some(content) = get_content(&nav_item.href)
        && let Ok(toc) = parse_nav_xhtml(&content)
        && !toc.is_empty()
    {
        return Ok(Navigation {
            toc: rebase(toc, &nav_item.href),
            epub_version: EpubVersion::V3,
        });
    }

    if let Some(ncx_item) = manifest
        .iter()
        .find(|item| item.media_type == "application/x-dtbncx+xml")
        && let Some(content) = get_content(&ncx_item.href)
    {
        let toc = parse_ncx(&content)?;
        return Ok(Navigation {
            toc: rebase(toc, &ncx_item.href),
            epub_version: EpubVersion::V2,
        });
    }

    Ok(Navigation::default())
}

fn rebase(points: Vec<NavPoint>, nav_href: &str) -> Vec<NavPoint> {
    let base_dir = match nav_href.rfind('/') {
        Some(idx) => &nav_href[..=idx],
        None => "",
    };
    points
        .into_iter()
        .map(|point| NavPoint {
            href: resolve_href(base_dir, &point.href),
            children: rebase(point.children, nav_href),
            label: point.label,
        })
        .collect()
}

fn href_of(e: &BytesStart<'_>, name: &[u8]) -> String {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
        .unwrap_or_default()
}

fn is_toc_nav(e: &BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|a| {
        a.key.local_name().as_ref() == b"type"
            && String::from_utf8_lossy(&a.value)
                .split_whitespace()
                .any(|t| t == "toc")
    })
}

/// Attach a finished nested list to the last entry of its parent list.
fn close_list(stack: &mut Vec<Vec<NavPoint>>) {
    if stack.len() < 2 {
        return;
    }
    let children = stack.pop().unwrap_or_default();
    if let Some(parent_list) = stack.last_mut() {
        match parent_list.last_mut() {
            Some(parent) => parent.children.extend(children),
            None => parent_list.extend(children),
        }
    }
}

/// An entry being read: the element that opened it, its target and the
/// label text seen so far.
struct OpenEntry {
    opener: Vec<u8>,
    href: String,
    label: String,
}

fn parse_nav_xhtml(html: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;
    let mut buf = Vec::new();

    let mut in_toc = false;
    // One list per open <ol>; the bottom entry collects top-level points.
    let mut stack: Vec<Vec<NavPoint>> = vec![Vec::new()];
    let mut ol_depth = 0usize;
    let mut entry: Option<OpenEntry> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"nav" if is_toc_nav(e) => in_toc = true,
                b"ol" if in_toc => {
                    ol_depth += 1;
                    if ol_depth > 1 {
                        stack.push(Vec::new());
                    }
                }
                name @ (b"a" | b"span") if in_toc => match entry.as_mut() {
                    // Spans inside a label keep their words apart.
                    Some(open) => open.label.push(' '),
                    None => {
                        entry = Some(OpenEntry {
                            opener: name.to_vec(),
                            href: href_of(e, b"href"),
                            label: String::new(),
                        });
                    }
                },
                _ => {}
            },
            Event::Text(ref e) => {
                if let Some(open) = entry.as_mut() {
                    open.label.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"nav" if in_toc => in_toc = false,
                b"ol" if in_toc => {
                    if ol_depth > 1 {
                        close_list(&mut stack);
                    }
                    ol_depth = ol_depth.saturating_sub(1);
                }
                name @ (b"a" | b"span") if in_toc => {
                    let closes_entry = entry.as_ref().is_some_and(|open| open.opener == name);
                    if !closes_entry {
                        if let Some(open) = entry.as_mut() {
                            open.label.push(' ');
                        }
                    } else if let Some(open) = entry.take()
                        && let Some(current) = stack.last_mut()
                    {
                        current.push(NavPoint {
                            label: open.label.split_whitespace().collect::<Vec<_>>().join(" "),
                            href: open.href,
                            children: Vec::new(),
                        });
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    while stack.len() > 1 {
        close_list(&mut stack);
    }
    Ok(stack.pop().unwrap_or_default())
}

fn parse_ncx(xml: &str) -> Result<Vec<NavPoint>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut nav_points = Vec::new();
    let mut stack: Vec<NavPoint> = Vec::new();
    let mut in_text = false;
    let mut current_label = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"navPoint" => stack.push(NavPoint {
                    label: String::new(),
                    href: String::new(),
                    children: Vec::new(),
                }),
                b"text" => {
                    in_text = true;
                    current_label.clear();
                }
                b"content" => {
                    if let Some(current) = stack.last_mut() {
                        current.href = href_of(e, b"src");
                    }
                }
                _ => {}
            },
            Event::Empty(ref e) if e.local_name().as_ref() == b"content" => {
                if let Some(current) = stack.last_mut() {
                    current.href = href_of(e, b"src");
                }
            }
            Event::Text(ref e) if in_text => {
                current_label.push_str(&e.unescape().unwrap_or_default());
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"text" => {
                    in_text = false;
                    if let Some(current) = stack.last_mut()
                        && current.label.is_empty()
                    {
                        current.label = current_label.trim().to_string();
                    }
                }
                b"navPoint" => {
                    if let Some(point) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(point),
                            None => nav_points.push(point),
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(nav_points)
}
