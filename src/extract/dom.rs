//! Owned document tree for the Markdown transformer.
//!
//! `scraper` does the HTML5 parsing; the result is copied into a plain
//! element/text tree that can be edited in place (heading promotion,
//! element removal) without going through arena node ids.

use ego_tree::NodeRef;
use scraper::Html;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// Parse a whole (X)HTML document. The returned root is a synthetic
/// `#document` element whose children are the top-level nodes.
pub fn parse_document(html: &str) -> Element {
    let doc = Html::parse_document(html);
    Element {
        name: "#document".to_string(),
        attrs: Vec::new(),
        children: doc.tree.root().children().filter_map(convert).collect(),
    }
}

fn convert(node: NodeRef<'_, scraper::Node>) -> Option<Node> {
    match node.value() {
        scraper::Node::Text(text) => Some(Node::Text(String::from(&**text))),
        scraper::Node::Element(el) => Some(Node::Element(Element {
            name: el.name().to_ascii_lowercase(),
            attrs: el
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children: node.children().filter_map(convert).collect(),
        })),
        // comments, doctype, processing instructions
        _ => None,
    }
}

impl Element {
    pub fn with_text(name: &str, text: impl Into<String>) -> Self {
        Element {
            name: name.to_string(),
            attrs: Vec::new(),
            children: vec![Node::Text(text.into())],
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Direct element children.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// All descendant elements in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            out.push(child);
            child.collect_descendants(out);
        }
    }

    /// Descendant elements with the given tag name, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        self.descendants()
            .into_iter()
            .filter(|el| el.is(name))
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&Element> {
        self.child_elements()
            .find_map(|child| if child.is(name) { Some(child) } else { child.find(name) })
    }

    /// Detach the first descendant with the given tag name.
    pub fn take_first(&mut self, name: &str) -> Option<Element> {
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if el.is(name) {
                    return Some(std::mem::take(el));
                }
                if let Some(found) = el.take_first(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Remove every descendant element whose tag is in `names`.
    pub fn remove_all(&mut self, names: &[&str]) {
        self.children.retain(|child| match child {
            Node::Element(el) => !names.contains(&el.name.as_str()),
            Node::Text(_) => true,
        });
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.remove_all(names);
            }
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Text nodes trimmed, empty ones dropped, joined with single spaces.
    pub fn separated_text(&self) -> String {
        let mut pieces = Vec::new();
        self.collect_pieces(&mut pieces);
        pieces.join(" ")
    }

    fn collect_pieces<'a>(&'a self, out: &mut Vec<&'a str>) {
        for child in &self.children {
            match child {
                Node::Text(t) => {
                    let t = t.trim();
                    if !t.is_empty() {
                        out.push(t);
                    }
                }
                Node::Element(el) => el.collect_pieces(out),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_html_skeleton() {
        let root = parse_document("<p>Hello <b>world</b></p>");
        let body = root.find("body").expect("body is synthesized");
        let p = body.find("p").unwrap();
        assert_eq!(p.text(), "Hello world");
        assert_eq!(p.find("b").unwrap().text(), "world");
    }

    #[test]
    fn test_xml_declaration_and_comments_are_dropped() {
        let root = parse_document(
            r#"<?xml version="1.0" encoding="UTF-8"?><html><body><!-- note --><p>x</p></body></html>"#,
        );
        let body = root.find("body").unwrap();
        assert_eq!(body.text(), "x");
    }

    #[test]
    fn test_attributes_are_looked_up_by_name() {
        let root = parse_document(r#"<a href="ch2.html" class="link">go</a>"#);
        let a = root.find("a").unwrap();
        assert_eq!(a.attr("href"), Some("ch2.html"));
        assert_eq!(a.attr("class"), Some("link"));
        assert_eq!(a.attr("id"), None);
    }

    #[test]
    fn test_find_all_is_in_document_order() {
        let root = parse_document("<div><p>1</p><section><p>2</p></section></div><p>3</p>");
        let texts: Vec<_> = root.find_all("p").iter().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_remove_all_strips_nested_elements() {
        let mut root = parse_document(
            "<html><head><style>p{}</style></head><body><p>a<script>x()</script>b</p></body></html>",
        );
        root.remove_all(&["script", "style", "head"]);
        assert!(root.find("head").is_none());
        assert_eq!(root.find("p").unwrap().text(), "ab");
    }

    #[test]
    fn test_take_first_detaches_subtree() {
        let mut root = parse_document("<body><p>kept</p></body>");
        let body = root.take_first("body").unwrap();
        assert_eq!(body.name, "body");
        assert_eq!(body.text(), "kept");
        assert!(root.find("p").is_none());
    }

    #[test]
    fn test_separated_text_joins_trimmed_pieces() {
        let root = parse_document("<h2>  Part <em>One</em>\n <span> </span>Begins </h2>");
        assert_eq!(root.find("h2").unwrap().separated_text(), "Part One Begins");
    }
}
