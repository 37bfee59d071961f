//! Heading detection for paragraphs styled as headings.
//!
//! Many EPUBs, converted from word processors, mark chapter and section
//! titles with a bold `<span>` inside a plain `<p>`. [`TitleClassifier`]
//! decides which of those paragraphs are headings and at what level, using
//! the table of contents as the main signal. The rules run in a fixed order
//! and the first one that applies decides.

use super::dom::Element;
use super::toc::TocIndex;
use regex::Regex;
use std::sync::LazyLock;

static NUMBERED_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[（(][一二三四五六七八九十\d]+[）)]$").unwrap());

static DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}年\d{1,2}月\d{1,2}日").unwrap());

static SHORT_CJK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\u{4e00}-\u{9fa5}]{2,4}$").unwrap());

/// Front-matter page labels that are never chapter headings.
const EXCLUDED_TITLES: &[&str] = &["版权信息", "目录", "封面", "扉页"];

/// Longest candidate text, exclusive.
const MAX_CANDIDATE_CHARS: usize = 100;
/// Longest text accepted by the chapter-heading rule.
const MAX_CHAPTER_CHARS: usize = 30;
/// A following paragraph longer than this counts as body prose.
const MIN_BODY_CHARS: usize = 50;

pub struct TitleClassifier<'a> {
    toc: &'a TocIndex,
}

/// Whether the paragraph carries a bold-styled span.
pub fn has_bold_span(element: &Element) -> bool {
    element.descendants().into_iter().any(|el| {
        el.is("span") && el.attr("class").is_some_and(|class| class.contains("bold"))
    })
}

impl<'a> TitleClassifier<'a> {
    pub fn new(toc: &'a TocIndex) -> Self {
        TitleClassifier { toc }
    }

    /// Heading level for `element`, or `None` if it is not a heading.
    ///
    /// `parent` is the element's current parent; the chapter-heading rule
    /// looks at the paragraphs around the candidate.
    pub fn classify(&self, element: &Element, parent: Option<&Element>) -> Option<usize> {
        if let Some(level) = heading_level(&element.name) {
            return Some(level);
        }
        if !element.is("p") || !has_bold_span(element) {
            return None;
        }

        let text = element.text();
        let text = text.trim();
        let len = text.chars().count();
        if text.is_empty() || len >= MAX_CANDIDATE_CHARS {
            return None;
        }
        self.level_for(element, text, len, parent)
    }

    fn level_for(
        &self,
        element: &Element,
        text: &str,
        len: usize,
        parent: Option<&Element>,
    ) -> Option<usize> {
        if let Some(level) = self.toc.level_of_title(text) {
            return Some(level + 1);
        }
        if NUMBERED_SECTION.is_match(text) {
            return Some(3);
        }
        if DATE_LINE.is_match(text) {
            return None;
        }
        if SHORT_CJK.is_match(text) && !self.toc.contains_title(text) {
            return None;
        }
        if EXCLUDED_TITLES.contains(&text) {
            return None;
        }

        if len <= MAX_CHAPTER_CHARS
            && let Some(parent) = parent
            && is_first_bold_paragraph(parent, element)
            && has_body_after(parent, element)
        {
            return Some(2);
        }
        None
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

// Paragraphs are compared by content, so an identical paragraph earlier in
// the parent stands in for the candidate.
fn is_first_bold_paragraph(parent: &Element, element: &Element) -> bool {
    parent
        .find_all("p")
        .into_iter()
        .find(|p| has_bold_span(p))
        .is_some_and(|first| first == element)
}

fn has_body_after(parent: &Element, element: &Element) -> bool {
    parent
        .find_all("p")
        .into_iter()
        .skip_while(|p| *p != element)
        .skip(1)
        .any(|p| p.text().trim().chars().count() > MIN_BODY_CHARS)
}
