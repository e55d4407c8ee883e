/// Node handle into a `Document` arena. Handles are only meaningful for the
/// document that produced them.
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Element tree parsed from markup text. The parser is deliberately tolerant:
/// generated markup is trusted, and anything malformed degrades to a smaller
/// tree rather than an error.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

impl Document {
    pub fn parse(markup: &str) -> Self {
        let mut parser = Parser {
            src: markup,
            pos: 0,
            nodes: Vec::new(),
            stack: Vec::new(),
            top: Vec::new(),
        };
        parser.run();
        parser.into_document()
    }

    /// The `html` element. Synthesized together with a `body` wrapper when
    /// the markup has no `html` root, so ancestor walks always terminate.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// First element with the given tag in document order.
    pub fn find_first(&self, tag: &str) -> Option<NodeId> {
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if self.tag(id) == Some(tag) {
                return Some(id);
            }
            for &child in self.children(id).iter().rev() {
                pending.push(child);
            }
        }
        None
    }

    /// The `body` element, falling back to the root when the markup never
    /// declared one.
    pub fn body(&self) -> NodeId {
        self.find_first("body").unwrap_or(self.root)
    }

    /// Concatenated descendant text with whitespace collapsed.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.get(next) {
                if let NodeKind::Text(text) = &node.kind {
                    parts.push(text);
                }
                for &child in node.children.iter().rev() {
                    pending.push(child);
                }
            }
        }
        parts
            .join(" ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
    top: Vec<NodeId>,
}

impl<'a> Parser<'a> {
    fn run(&mut self) {
        while self.pos < self.src.len() {
            let rest = &self.src[self.pos..];
            if let Some(stripped) = rest.strip_prefix("<!--") {
                self.pos += 4 + stripped.find("-->").map(|i| i + 3).unwrap_or(stripped.len());
            } else if rest.starts_with("<!") {
                self.skip_past('>');
            } else if rest.starts_with("</") {
                self.close_tag();
            } else if rest.starts_with('<')
                && rest[1..].chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            {
                self.open_tag();
            } else {
                self.text_run();
            }
        }
    }

    fn skip_past(&mut self, end: char) {
        match self.src[self.pos..].find(end) {
            Some(i) => self.pos += i + end.len_utf8(),
            None => self.pos = self.src.len(),
        }
    }

    fn text_run(&mut self) {
        let rest = &self.src[self.pos..];
        let len = rest[1..].find('<').map(|i| i + 1).unwrap_or(rest.len());
        let text = &rest[..len];
        self.pos += len;
        if !text.trim().is_empty() {
            self.attach(NodeKind::Text(text.to_string()), false);
        }
    }

    fn open_tag(&mut self) {
        self.pos += 1;
        let tag = self.tag_name();
        let (id, classes, self_closed) = self.attributes();
        let open_children = !self_closed && !VOID_TAGS.contains(&tag.as_str());
        let raw_text = RAW_TEXT_TAGS.contains(&tag.as_str());
        let element = NodeKind::Element(Element {
            tag: tag.clone(),
            id,
            classes,
        });
        let node = self.attach(element, open_children && !raw_text);
        if open_children && raw_text {
            self.swallow_raw_text(node, &tag);
        }
    }

    fn tag_name(&mut self) -> String {
        let rest = &self.src[self.pos..];
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_ascii_lowercase()
    }

    /// Parses attributes up to the closing `>`. Only `id` and `class` are
    /// retained. Returns `(id, classes, self_closed)`.
    fn attributes(&mut self) -> (Option<String>, Vec<String>, bool) {
        let mut id = None;
        let mut classes = Vec::new();
        let mut self_closed = false;
        loop {
            while self.src[self.pos..].starts_with(|c: char| c.is_whitespace()) {
                self.pos += 1;
            }
            let rest = &self.src[self.pos..];
            if rest.is_empty() {
                break;
            }
            if let Some(after) = rest.strip_prefix("/>") {
                self.pos = self.src.len() - after.len();
                self_closed = true;
                break;
            }
            if let Some(after) = rest.strip_prefix('>') {
                self.pos = self.src.len() - after.len();
                break;
            }
            let name_len = rest
                .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
                .unwrap_or(rest.len());
            if name_len == 0 {
                self.pos += 1;
                continue;
            }
            let name = rest[..name_len].to_ascii_lowercase();
            self.pos += name_len;
            let value = self.attribute_value();
            match name.as_str() {
                "id" => {
                    if let Some(value) = value.filter(|v| !v.is_empty()) {
                        id = Some(value);
                    }
                }
                "class" => {
                    if let Some(value) = value {
                        classes.extend(value.split_whitespace().map(str::to_string));
                    }
                }
                _ => {}
            }
        }
        (id, classes, self_closed)
    }

    fn attribute_value(&mut self) -> Option<String> {
        if !self.src[self.pos..].starts_with('=') {
            return None;
        }
        self.pos += 1;
        let rest = &self.src[self.pos..];
        if let Some(quote) = rest.chars().next().filter(|&c| c == '"' || c == '\'') {
            let inner = &rest[1..];
            let len = inner.find(quote).unwrap_or(inner.len());
            self.pos += 1 + len + if inner.len() > len { 1 } else { 0 };
            Some(inner[..len].to_string())
        } else {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == '>')
                .unwrap_or(rest.len());
            self.pos += len;
            Some(rest[..len].to_string())
        }
    }

    fn close_tag(&mut self) {
        self.pos += 2;
        let tag = self.tag_name();
        self.skip_past('>');
        // Pop through the nearest matching open element; a stray close tag
        // with no match is ignored.
        if let Some(depth) = self.stack.iter().rposition(|&id| {
            matches!(&self.nodes[id].kind, NodeKind::Element(el) if el.tag == tag)
        }) {
            self.stack.truncate(depth);
        }
    }

    /// `script` and `style` bodies are opaque text, not markup.
    fn swallow_raw_text(&mut self, parent: NodeId, tag: &str) {
        let rest = &self.src[self.pos..];
        let lower = rest.to_ascii_lowercase();
        let closer = format!("</{tag}");
        let end = lower.find(&closer).unwrap_or(rest.len());
        let body = &rest[..end];
        if !body.trim().is_empty() {
            let node = self.new_node(NodeKind::Text(body.to_string()), Some(parent));
            self.nodes[parent].children.push(node);
        }
        self.pos += end;
        if end < rest.len() {
            self.pos += 2;
            self.tag_name();
            self.skip_past('>');
        }
    }

    fn attach(&mut self, kind: NodeKind, opens_scope: bool) -> NodeId {
        let parent = self.stack.last().copied();
        let node = self.new_node(kind, parent);
        match parent {
            Some(parent) => self.nodes[parent].children.push(node),
            None => self.top.push(node),
        }
        if opens_scope {
            self.stack.push(node);
        }
        node
    }

    fn new_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn into_document(mut self) -> Document {
        let existing_root = self.top.iter().copied().find(|&id| {
            matches!(&self.nodes[id].kind, NodeKind::Element(el) if el.tag == "html")
        });
        let root = match existing_root {
            Some(root) => root,
            None => {
                // Wrap loose content the way a browser would, so every node
                // has html and body ancestors.
                let html = self.new_node(
                    NodeKind::Element(Element {
                        tag: "html".to_string(),
                        id: None,
                        classes: Vec::new(),
                    }),
                    None,
                );
                let body = self.new_node(
                    NodeKind::Element(Element {
                        tag: "body".to_string(),
                        id: None,
                        classes: Vec::new(),
                    }),
                    Some(html),
                );
                self.nodes[html].children.push(body);
                let top = std::mem::take(&mut self.top);
                for id in top {
                    self.nodes[id].parent = Some(body);
                    self.nodes[body].children.push(id);
                }
                html
            }
        };
        Document {
            nodes: self.nodes,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_structure() {
        let doc = Document::parse(
            "<html><body><div id=\"hero\" class=\"wide tall\"><h1>Title</h1></div></body></html>",
        );
        let body = doc.body();
        assert_eq!(doc.tag(body), Some("body"));
        let div = doc.children(body)[0];
        let el = doc.element(div).unwrap();
        assert_eq!(el.tag, "div");
        assert_eq!(el.id.as_deref(), Some("hero"));
        assert_eq!(el.classes, vec!["wide", "tall"]);
        let h1 = doc.children(div)[0];
        assert_eq!(doc.tag(h1), Some("h1"));
        assert_eq!(doc.text_content(h1), "Title");
    }

    #[test]
    fn test_tags_are_lowercased() {
        let doc = Document::parse("<HTML><BODY><DIV ID='x'></DIV></BODY></HTML>");
        let div = doc.find_first("div").unwrap();
        assert_eq!(doc.element(div).unwrap().id.as_deref(), Some("x"));
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let doc = Document::parse("<body><img src=\"a.png\"><p>after</p></body>");
        let body = doc.body();
        let tags: Vec<_> = doc
            .children(body)
            .iter()
            .filter_map(|&c| doc.tag(c))
            .collect();
        assert_eq!(tags, vec!["img", "p"]);
        let img = doc.find_first("img").unwrap();
        assert!(doc.children(img).is_empty());
    }

    #[test]
    fn test_script_body_is_opaque() {
        let doc = Document::parse("<body><script>if (a < b) { render('<div>'); }</script><p>x</p></body>");
        assert!(doc.find_first("div").is_none());
        assert!(doc.find_first("p").is_some());
        let script = doc.find_first("script").unwrap();
        assert!(doc.text_content(script).contains("render"));
    }

    #[test]
    fn test_fragment_gains_html_and_body() {
        let doc = Document::parse("<h1>Hello</h1><p>World</p>");
        assert_eq!(doc.tag(doc.root()), Some("html"));
        let body = doc.body();
        assert_eq!(doc.tag(body), Some("body"));
        assert_eq!(doc.children(body).len(), 2);
        let h1 = doc.children(body)[0];
        assert_eq!(doc.parent(h1), Some(body));
    }

    #[test]
    fn test_stray_close_tag_ignored() {
        let doc = Document::parse("<body><div><p>a</p></span><p>b</p></div></body>");
        let div = doc.find_first("div").unwrap();
        assert_eq!(doc.children(div).len(), 2);
    }

    #[test]
    fn test_unclosed_children_collapse_at_parent_close() {
        let doc = Document::parse("<body><ul><li>one<li>two</ul><p>end</p></body>");
        let ul = doc.find_first("ul").unwrap();
        let items = doc
            .children(ul)
            .iter()
            .filter(|&&c| doc.tag(c) == Some("li"))
            .count();
        assert_eq!(items, 2);
        let body = doc.body();
        assert_eq!(doc.tag(*doc.children(body).last().unwrap()), Some("p"));
    }

    #[test]
    fn test_comments_and_doctype_skipped() {
        let doc = Document::parse("<!DOCTYPE html><!-- note --><html><body><p>x</p></body></html>");
        assert_eq!(doc.tag(doc.root()), Some("html"));
        assert!(doc.find_first("p").is_some());
    }

    #[test]
    fn test_text_content_collapses_whitespace() {
        let doc = Document::parse("<body><div>  a\n   b  <span>c</span></div></body>");
        let div = doc.find_first("div").unwrap();
        assert_eq!(doc.text_content(div), "a b c");
    }
}
