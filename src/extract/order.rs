use crate::epub::Resource;
use std::collections::HashSet;

/// Reading order: documents named by the spine first, in spine order, then
/// every document the spine leaves out, in manifest order.
///
/// Spine ids without a matching document are ignored and a repeated spine id
/// yields its document once.
pub fn reading_order<'a>(documents: &[Resource<'a>], spine: &[&str]) -> Vec<Resource<'a>> {
    let mut ordered = Vec::with_capacity(documents.len());
    let mut seen = HashSet::new();

    for id in spine {
        if seen.contains(id) {
            continue;
        }
        if let Some(doc) = documents.iter().find(|doc| doc.id == *id) {
            seen.insert(*id);
            ordered.push(*doc);
        }
    }

    let orphans = documents.iter().filter(|doc| !spine.contains(&doc.id));
    let from_spine = ordered.len();
    ordered.extend(orphans.copied());
    if ordered.len() > from_spine {
        log::debug!(
            "{} documents outside the spine appended",
            ordered.len() - from_spine
        );
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &'static str) -> Resource<'static> {
        Resource {
            id,
            name: id,
            media_type: "application/xhtml+xml",
            content: b"",
        }
    }

    fn ids(docs: &[Resource<'_>]) -> Vec<String> {
        docs.iter().map(|d| d.id.to_string()).collect()
    }

    #[test]
    fn test_spine_order_wins_over_manifest_order() {
        let docs = [doc("a"), doc("b"), doc("c")];
        let ordered = reading_order(&docs, &["c", "a", "b"]);
        assert_eq!(ids(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_orphans_follow_in_manifest_order() {
        let docs = [doc("x"), doc("ch1"), doc("y"), doc("ch2")];
        let ordered = reading_order(&docs, &["ch2", "ch1"]);
        assert_eq!(ids(&ordered), vec!["ch2", "ch1", "x", "y"]);
    }

    #[test]
    fn test_unknown_and_repeated_spine_ids() {
        let docs = [doc("a"), doc("b")];
        let ordered = reading_order(&docs, &["ghost", "b", "b", "a"]);
        assert_eq!(ids(&ordered), vec!["b", "a"]);
    }

    #[test]
    fn test_result_is_permutation_of_documents() {
        let docs = [doc("p"), doc("q"), doc("r"), doc("s")];
        let ordered = reading_order(&docs, &["s", "q", "s"]);
        let mut got = ids(&ordered);
        got.sort();
        assert_eq!(got, vec!["p", "q", "r", "s"]);
    }

    #[test]
    fn test_empty_spine_keeps_manifest_order() {
        let docs = [doc("b"), doc("a")];
        assert_eq!(ids(&reading_order(&docs, &[])), vec!["b", "a"]);
    }
}
