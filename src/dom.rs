use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

pub use ego_tree::NodeId;
use ego_tree::{NodeMut, NodeRef};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::DomError;

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("hardcoded body selector is valid"));

static HIDDEN_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:display\s*:\s*none|visibility\s*:\s*hidden)")
        .expect("hardcoded hidden style regex is valid")
});

const NON_RENDERED_TAGS: &[&str] = &["head", "noscript", "script", "style", "template"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tbody", "tfoot", "thead", "tr", "ul",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    CharacterData,
    Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub kind: MutationKind,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

impl MutationRecord {
    fn new(target: NodeId, kind: MutationKind) -> Self {
        Self {
            target,
            kind,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }
}

pub struct Document {
    html: Html,
    hidden: HashSet<NodeId>,
    mutations: Vec<MutationRecord>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
            hidden: HashSet::new(),
            mutations: Vec::new(),
        }
    }

    pub fn root_element(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    pub fn body(&self) -> Option<ElementRef<'_>> {
        self.root_element().select(&BODY_SELECTOR).next()
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    // Walks the tree, not the node arena, so detached nodes never match.
    pub fn select<'a, 'b>(
        &'a self,
        selector: &'b Selector,
    ) -> impl Iterator<Item = ElementRef<'a>> + use<'a, 'b> {
        self.root_element().select(selector)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        let root = self.html.tree.root().id();
        self.html
            .tree
            .get(id)
            .is_some_and(|node| node.id() == root || node.ancestors().any(|up| up.id() == root))
    }

    pub fn is_rendered(&self, id: NodeId) -> bool {
        let Some(node) = self.html.tree.get(id) else {
            return false;
        };
        if !self.contains(id) {
            return false;
        }
        std::iter::once(node)
            .chain(node.ancestors())
            .all(|candidate| !self.hides(candidate))
    }

    fn hides(&self, node: NodeRef<'_, Node>) -> bool {
        if self.hidden.contains(&node.id()) {
            return true;
        }
        let Some(element) = node.value().as_element() else {
            return false;
        };
        NON_RENDERED_TAGS.contains(&element.name())
            || element.attr("hidden").is_some()
            || element
                .attr("aria-hidden")
                .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
            || element
                .attr("style")
                .is_some_and(|style| HIDDEN_STYLE_RE.is_match(style))
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node {
            return true;
        }
        self.html
            .tree
            .get(node)
            .is_some_and(|node| node.ancestors().any(|up| up.id() == ancestor))
    }

    pub fn overlaps(&self, left: NodeId, right: NodeId) -> bool {
        self.is_ancestor_or_self(left, right) || self.is_ancestor_or_self(right, left)
    }

    pub fn positions(&self) -> HashMap<NodeId, usize> {
        self.html
            .tree
            .root()
            .descendants()
            .enumerate()
            .map(|(index, node)| (node.id(), index))
            .collect()
    }

    pub fn append_html(&mut self, parent: NodeId, fragment: &str) -> Result<Vec<NodeId>, DomError> {
        let added = self.graft_fragment(parent, fragment)?;
        let mut record = MutationRecord::new(parent, MutationKind::ChildList);
        record.added.clone_from(&added);
        self.mutations.push(record);
        Ok(added)
    }

    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self
            .html
            .tree
            .get(id)
            .ok_or(DomError::UnknownNode)?
            .parent()
            .map(|parent| parent.id());
        self.html
            .tree
            .get_mut(id)
            .ok_or(DomError::UnknownNode)?
            .detach();

        if let Some(parent) = parent {
            let mut record = MutationRecord::new(parent, MutationKind::ChildList);
            record.removed.push(id);
            self.mutations.push(record);
        }
        Ok(())
    }

    pub fn set_inner_html(&mut self, id: NodeId, fragment: &str) -> Result<Vec<NodeId>, DomError> {
        let removed = self.detach_children(id)?;
        let added = self.graft_fragment(id, fragment)?;
        self.mutations.push(MutationRecord {
            target: id,
            kind: MutationKind::ChildList,
            added: added.clone(),
            removed,
        });
        Ok(added)
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        let escaped = text
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        self.detach_children(id)?;
        self.graft_fragment(id, &escaped)?;
        self.mutations
            .push(MutationRecord::new(id, MutationKind::CharacterData));
        Ok(())
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<(), DomError> {
        if self.html.tree.get(id).is_none() {
            return Err(DomError::UnknownNode);
        }
        if hidden {
            self.hidden.insert(id);
        } else {
            self.hidden.remove(&id);
        }
        self.mutations
            .push(MutationRecord::new(id, MutationKind::Attributes));
        Ok(())
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    fn detach_children(&mut self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        let node = self.html.tree.get(id).ok_or(DomError::UnknownNode)?;
        if !node.value().is_element() {
            return Err(DomError::NotAnElement);
        }
        let children = node.children().map(|child| child.id()).collect::<Vec<_>>();
        for child in &children {
            if let Some(mut child) = self.html.tree.get_mut(*child) {
                child.detach();
            }
        }
        Ok(children)
    }

    fn graft_fragment(&mut self, parent: NodeId, fragment: &str) -> Result<Vec<NodeId>, DomError> {
        let parsed = Html::parse_fragment(fragment);
        let mut target = self.html.tree.get_mut(parent).ok_or(DomError::UnknownNode)?;
        let added = parsed
            .root_element()
            .children()
            .map(|child| graft(child, &mut target))
            .collect();
        Ok(added)
    }
}

fn graft(source: NodeRef<'_, Node>, target: &mut NodeMut<'_, Node>) -> NodeId {
    let mut copy = target.append(source.value().clone());
    for child in source.children() {
        graft(child, &mut copy);
    }
    copy.id()
}

pub fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect()
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_inner_text(*element, &mut out);
    out.trim().to_string()
}

fn push_inner_text(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => out.push_str(text),
        Node::Element(element) => {
            let name = element.name();
            if NON_RENDERED_TAGS.contains(&name) {
                return;
            }
            if name == "br" {
                out.push('\n');
                return;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            for child in node.children() {
                push_inner_text(child, out);
            }
            if block {
                out.push('\n');
            } else if name == "td" || name == "th" {
                out.push('\t');
            }
        }
        _ => {
            for child in node.children() {
                push_inner_text(child, out);
            }
        }
    }
}

pub fn clean_cell_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::{Document, inner_text};

    #[test]
    fn inner_text_breaks_on_br_and_blocks() {
        let document = Document::parse("<body><p>A | B<br>1 | 2</p><div>x</div></body>");
        let body = document.body().expect("body exists");
        assert_eq!(inner_text(body), "A | B\n1 | 2\n\nx");
    }

    #[test]
    fn removed_nodes_are_no_longer_contained() {
        let mut document = Document::parse("<body><div id=a><span>x</span></div></body>");
        let body = document.body().expect("body exists").id();
        let added = document
            .append_html(body, "<p>new</p>")
            .expect("append succeeds");
        assert!(document.contains(added[0]));

        document.remove(added[0]).expect("remove succeeds");
        assert!(!document.contains(added[0]));
        assert!(document.element(added[0]).is_some());
        assert_eq!(document.take_mutations().len(), 2);
    }

    #[test]
    fn hidden_ancestors_hide_descendants() {
        let document = Document::parse(
            r#"<body><div style="display: none"><table id=t></table></div></body>"#,
        );
        let selector = scraper::Selector::parse("#t").expect("valid selector");
        let table = document.select(&selector).next().expect("table exists").id();
        assert!(document.contains(table));
        assert!(!document.is_rendered(table));
    }

    #[test]
    fn aria_hidden_ancestor_hides_table() {
        let document = Document::parse(
            r#"<body><div aria-hidden="true"><table id=t></table></div><table id=u aria-hidden="false"></table></body>"#,
        );
        let hidden = scraper::Selector::parse("#t").expect("valid selector");
        let shown = scraper::Selector::parse("#u").expect("valid selector");
        let hidden = document.select(&hidden).next().expect("table exists").id();
        let shown = document.select(&shown).next().expect("table exists").id();
        assert!(!document.is_rendered(hidden));
        assert!(document.is_rendered(shown));
    }
}
