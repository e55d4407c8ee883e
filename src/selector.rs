use crate::dom::{Document, NodeId};

/// Builds a CSS selector for `node` by walking ancestors toward the root.
///
/// Each step contributes a lowercase tag token. An `id` attribute anchors the
/// path: the token becomes `tag#id` and the walk stops there, so a selector
/// carries at most one `#`. An element with preceding same-tag siblings gets
/// a 1-based `:nth-of-type(n)` ordinal. Tokens are joined outermost-first
/// with single spaces. Non-element nodes have no selector.
pub fn synthesize(doc: &Document, node: NodeId) -> String {
    if !doc.is_element(node) {
        return String::new();
    }
    let mut path: Vec<String> = Vec::new();
    let mut current = Some(node);
    while let Some(id) = current {
        let element = match doc.element(id) {
            Some(element) => element,
            None => break,
        };
        let mut token = element.tag.to_ascii_lowercase();
        match element.id.as_deref().filter(|id| !id.is_empty()) {
            Some(anchor) => {
                token.push('#');
                token.push_str(anchor);
                path.push(token);
                break;
            }
            None => {
                let position = same_tag_position(doc, id);
                if position > 1 {
                    token.push_str(&format!(":nth-of-type({position})"));
                }
                path.push(token);
            }
        }
        current = doc.parent(id);
    }
    path.reverse();
    path.join(" ")
}

/// 1-based position among element siblings sharing this element's tag.
fn same_tag_position(doc: &Document, node: NodeId) -> usize {
    let parent = match doc.parent(node) {
        Some(parent) => parent,
        None => return 1,
    };
    let tag = doc.tag(node);
    let mut position = 1;
    for &sibling in doc.children(parent) {
        if sibling == node {
            break;
        }
        if doc.tag(sibling) == tag {
            position += 1;
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_joined_with_spaces() {
        let doc = Document::parse("<html><body><section><div>x</div></section></body></html>");
        let div = doc.find_first("div").unwrap();
        assert_eq!(synthesize(&doc, div), "html body section div");
    }

    #[test]
    fn test_id_truncates_ascent() {
        let doc = Document::parse(
            "<html><body><main><div id=\"hero\"><p>x</p></div></main></body></html>",
        );
        let p = doc.find_first("p").unwrap();
        assert_eq!(synthesize(&doc, p), "div#hero p");
        let div = doc.find_first("div").unwrap();
        assert_eq!(synthesize(&doc, div), "div#hero");
    }

    #[test]
    fn test_at_most_one_id_anchor() {
        let doc = Document::parse(
            "<html><body><div id=\"outer\"><div id=\"inner\"><span>x</span></div></div></body></html>",
        );
        let span = doc.find_first("span").unwrap();
        let selector = synthesize(&doc, span);
        assert_eq!(selector, "div#inner span");
        assert_eq!(selector.matches('#').count(), 1);
    }

    #[test]
    fn test_nth_of_type_counts_same_tag_siblings() {
        let doc = Document::parse(
            "<html><body><div>a</div><p>b</p><div>c</div><div>d</div></body></html>",
        );
        let body = doc.body();
        let children = doc.children(body).to_vec();
        assert_eq!(synthesize(&doc, children[0]), "html body div");
        assert_eq!(synthesize(&doc, children[1]), "html body p");
        assert_eq!(synthesize(&doc, children[2]), "html body div:nth-of-type(2)");
        assert_eq!(synthesize(&doc, children[3]), "html body div:nth-of-type(3)");
    }

    #[test]
    fn test_text_between_siblings_not_counted() {
        let doc = Document::parse("<html><body><p>a</p>loose text<p>b</p></body></html>");
        let body = doc.body();
        let second_p = *doc
            .children(body)
            .iter()
            .filter(|&&c| doc.tag(c) == Some("p"))
            .nth(1)
            .unwrap();
        assert_eq!(synthesize(&doc, second_p), "html body p:nth-of-type(2)");
    }

    #[test]
    fn test_text_node_has_no_selector() {
        let doc = Document::parse("<html><body>just text</body></html>");
        let body = doc.body();
        let text = doc.children(body)[0];
        assert!(!doc.is_element(text));
        assert_eq!(synthesize(&doc, text), "");
    }
}
