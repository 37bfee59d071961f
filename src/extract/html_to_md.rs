use super::dom::{self, Element, Node};
use super::images::ImageRegistry;
use super::title::TitleClassifier;
use super::toc::TocIndex;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Elements dropped before conversion.
const NON_CONTENT: &[&str] = &["script", "style", "head", "meta", "link"];

/// A page with more links than this into `index_split_*` files is a
/// generated contents page.
const NAV_PAGE_LINK_THRESHOLD: usize = 10;

static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Converts one element to Markdown. The last argument is the element's
/// parent, when there is one.
type Handler = fn(&Transformer<'_>, &Element, Option<&Element>) -> String;

static HANDLERS: LazyLock<HashMap<&'static str, Handler>> = LazyLock::new(|| {
    let mut table: HashMap<&'static str, Handler> = HashMap::new();
    for tag in ["h1", "h2", "h3", "h4", "h5", "h6"] {
        table.insert(tag, heading);
    }
    table.insert("p", paragraph);
    table.insert("br", line_break);
    table.insert("hr", rule);
    for tag in ["strong", "b"] {
        table.insert(tag, bold);
    }
    for tag in ["em", "i"] {
        table.insert(tag, italic);
    }
    table.insert("u", underline);
    for tag in ["s", "strike", "del"] {
        table.insert(tag, strikethrough);
    }
    table.insert("a", link);
    table.insert("img", image);
    table.insert("ul", unordered_list);
    table.insert("ol", ordered_list);
    table.insert("blockquote", blockquote);
    table.insert("pre", preformatted);
    table.insert("code", code);
    table.insert("table", table_block);
    table.insert("sup", superscript);
    table.insert("sub", subscript);
    table
});

/// Collapse runs of three or more newlines to a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

/// Whether the document is a generated contents page that only links to the
/// split chapter files.
pub fn is_navigation_page(root: &Element) -> bool {
    root.find_all("a")
        .into_iter()
        .filter(|a| a.attr("href").is_some_and(|href| href.starts_with("index_split_")))
        .count()
        > NAV_PAGE_LINK_THRESHOLD
}

/// HTML to Markdown conversion for the content documents of one book.
pub struct Transformer<'a> {
    classifier: TitleClassifier<'a>,
    images: &'a ImageRegistry,
}

impl<'a> Transformer<'a> {
    pub fn new(toc: &'a TocIndex, images: &'a ImageRegistry) -> Self {
        Transformer {
            classifier: TitleClassifier::new(toc),
            images,
        }
    }

    pub fn convert(&self, html: &str) -> String {
        self.transform(dom::parse_document(html))
    }

    /// Convert a parsed document. Only the `<body>` is converted when there
    /// is one.
    pub fn transform(&self, mut root: Element) -> String {
        root.remove_all(NON_CONTENT);
        let mut content = root.take_first("body").unwrap_or(root);
        self.promote_headings(&mut content);

        let markdown = self.element(&content, None);
        collapse_blank_lines(&markdown).trim().to_string()
    }

    /// Replace paragraphs classified as headings with real heading elements,
    /// in document order. A promoted heading keeps only the paragraph's text.
    fn promote_headings(&self, parent: &mut Element) {
        for idx in 0..parent.children.len() {
            let promoted = match &parent.children[idx] {
                Node::Element(child) if child.is("p") => self
                    .classifier
                    .classify(child, Some(&*parent))
                    .map(|level| (level.min(6), child.text().trim().to_string())),
                _ => None,
            };

            match promoted {
                Some((level, text)) => {
                    parent.children[idx] =
                        Node::Element(Element::with_text(&format!("h{level}"), text));
                }
                None => {
                    if let Node::Element(child) = &mut parent.children[idx] {
                        self.promote_headings(child);
                    }
                }
            }
        }
    }

    fn node(&self, node: &Node, parent: Option<&Element>) -> String {
        match node {
            Node::Text(text) => HORIZONTAL_SPACE.replace_all(text, " ").into_owned(),
            Node::Element(el) => self.element(el, parent),
        }
    }

    fn element(&self, el: &Element, parent: Option<&Element>) -> String {
        match HANDLERS.get(el.name.as_str()) {
            Some(handler) => handler(self, el, parent),
            None => self.children(el),
        }
    }

    fn children(&self, el: &Element) -> String {
        el.children
            .iter()
            .map(|child| self.node(child, Some(el)))
            .collect()
    }

    /// Children converted and trimmed, wrapped in `open`/`close` unless empty.
    fn wrapped(&self, el: &Element, open: &str, close: &str) -> String {
        let inner = self.children(el);
        let inner = inner.trim();
        if inner.is_empty() {
            String::new()
        } else {
            format!("{open}{inner}{close}")
        }
    }
}

fn heading(_: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    let level = el.name[1..].parse::<usize>().unwrap_or(1);
    let text = el.separated_text();
    if text.is_empty() {
        return String::new();
    }
    format!("\n\n{} {text}\n\n", "#".repeat(level))
}

fn paragraph(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "\n\n", "\n\n")
}

fn line_break(_: &Transformer<'_>, _: &Element, _: Option<&Element>) -> String {
    "  \n".to_string()
}

fn rule(_: &Transformer<'_>, _: &Element, _: Option<&Element>) -> String {
    "\n\n---\n\n".to_string()
}

fn bold(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "**", "**")
}

fn italic(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "*", "*")
}

fn underline(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "<u>", "</u>")
}

fn strikethrough(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "~~", "~~")
}

fn superscript(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "^", "^")
}

fn subscript(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    t.wrapped(el, "~", "~")
}

fn link(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    let href = el.attr("href").unwrap_or_default();
    let text = t.children(el);
    let text = text.trim();
    if !text.is_empty() && !href.is_empty() && !href.starts_with('#') {
        format!("[{text}]({href})")
    } else {
        text.to_string()
    }
}

fn image(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    let src = el.attr("src").unwrap_or_default();
    if src.is_empty() {
        return String::new();
    }
    let alt = el.attr("alt").unwrap_or("image");
    format!("![{alt}]({})", t.images.resolve(src))
}

fn unordered_list(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    list(t, el, |_| "- ".to_string(), "  ")
}

fn ordered_list(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    list(t, el, |n| format!("{n}. "), "   ")
}

/// Render the direct `<li>` children. `marker` receives the 1-based
/// position of the item among all direct items, empty ones included.
fn list(t: &Transformer<'_>, el: &Element, marker: impl Fn(usize) -> String, indent: &str) -> String {
    let items: Vec<String> = el
        .child_elements()
        .filter(|child| child.is("li"))
        .enumerate()
        .filter_map(|(idx, li)| {
            let text = t.children(li);
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let mut lines = text.split('\n');
            let mut item = marker(idx + 1);
            item.push_str(lines.next().unwrap_or_default());
            for line in lines.map(str::trim).filter(|line| !line.is_empty()) {
                item.push('\n');
                item.push_str(indent);
                item.push_str(line);
            }
            Some(item)
        })
        .collect();

    if items.is_empty() {
        String::new()
    } else {
        format!("\n\n{}\n\n", items.join("\n"))
    }
}

fn blockquote(t: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    let text = t.children(el);
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = text.split('\n').map(|line| format!("> {line}")).collect();
    format!("\n\n{}\n\n", quoted.join("\n"))
}

fn preformatted(_: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    format!("\n\n```\n{}\n```\n\n", el.text())
}

fn code(_: &Transformer<'_>, el: &Element, parent: Option<&Element>) -> String {
    if parent.is_some_and(|p| p.is("pre")) {
        return el.text();
    }
    let text = el.text();
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else {
        format!("`{text}`")
    }
}

fn table_block(_: &Transformer<'_>, el: &Element, _: Option<&Element>) -> String {
    let rows: Vec<Vec<String>> = el
        .find_all("tr")
        .into_iter()
        .map(|tr| {
            tr.descendants()
                .into_iter()
                .filter(|cell| cell.is("th") || cell.is("td"))
                .map(|cell| cell.separated_text().replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };
    let width = header.len();

    let mut lines = vec![
        format!("| {} |", header.join(" | ")),
        format!("| {} |", vec!["---"; width].join(" | ")),
    ];
    for row in body {
        let mut cells: Vec<&str> = row.iter().take(width).map(String::as_str).collect();
        cells.resize(width, "");
        lines.push(format!("| {} |", cells.join(" | ")));
    }
    format!("\n\n{}\n\n", lines.join("\n"))
}
