use std::fmt;
use std::hash::{Hash, Hasher};

use crate::document::Document;
use crate::error::DomError;
use crate::tree::{NodeId, NodeKind};

/// Kind of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Document,
    Element,
    Text,
}

impl NodeType {
    const fn label(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Element => "element",
            Self::Text => "text",
        }
    }
}

/// Handle to a node of a [`Document`].
///
/// Handles compare equal when they refer to the same node of the same
/// document, which is what "called with that element" means in tests.
#[derive(Clone)]
pub struct Node {
    doc: Document,
    id: NodeId,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.doc.same_document(&other.doc)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(tree) = self.doc.try_tree() else {
            return write!(f, "Node#{}", self.id.0);
        };
        match &tree.node(self.id).kind {
            NodeKind::Document => write!(f, "#document"),
            NodeKind::Text(text) => write!(f, "#text({text:?})#{}", self.id.0),
            NodeKind::Element(data) => {
                write!(f, "<{}", data.local_name)?;
                for (name, value) in &data.attributes {
                    write!(f, " {name}={value:?}")?;
                }
                write!(f, ">#{}", self.id.0)
            }
        }
    }
}

impl Node {
    pub(crate) fn new(doc: Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.id
    }

    /// The document this node belongs to.
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self.doc.tree().node(self.id).kind {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
        }
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        self.node_type() == NodeType::Element
    }

    /// Upper-cased tag name, `None` for non-elements.
    #[must_use]
    pub fn tag_name(&self) -> Option<String> {
        self.doc
            .tree()
            .element(self.id)
            .map(|el| el.local_name.to_ascii_uppercase())
    }

    /// The full `class` attribute; empty when absent or not an element.
    #[must_use]
    pub fn class_name(&self) -> String {
        self.get_attribute("class").unwrap_or_default()
    }

    /// Set the `class` attribute.
    ///
    /// # Errors
    ///
    /// [`DomError::InvalidNodeType`] on non-elements.
    pub fn set_class_name(&self, value: &str) -> Result<(), DomError> {
        self.set_attribute("class", value)
    }

    /// The `id` attribute; empty when absent.
    #[must_use]
    pub fn id(&self) -> String {
        self.get_attribute("id").unwrap_or_default()
    }

    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.doc
            .tree()
            .element(self.id)
            .and_then(|el| el.attribute(&name))
            .map(str::to_string)
    }

    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.get_attribute(name).is_some()
    }

    /// Attribute names in insertion order.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.doc
            .tree()
            .element(self.id)
            .map(|el| el.attributes.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }

    /// Set an attribute. Always queues a record, even when the value is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// [`DomError::InvalidNodeType`] on non-elements.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
        self.ensure_element("set_attribute")?;
        self.doc
            .tree_mut()
            .set_attribute(self.id, &name.to_ascii_lowercase(), value);
        Ok(())
    }

    /// Remove an attribute; queues a record only if it was present.
    ///
    /// # Errors
    ///
    /// [`DomError::InvalidNodeType`] on non-elements.
    pub fn remove_attribute(&self, name: &str) -> Result<(), DomError> {
        self.ensure_element("remove_attribute")?;
        self.doc
            .tree_mut()
            .remove_attribute(self.id, &name.to_ascii_lowercase());
        Ok(())
    }

    #[must_use]
    pub fn parent_node(&self) -> Option<Node> {
        let parent = self.doc.tree().node(self.id).parent;
        parent.map(|id| self.doc.node(id))
    }

    #[must_use]
    pub fn parent_element(&self) -> Option<Node> {
        self.parent_node().filter(Node::is_element)
    }

    #[must_use]
    pub fn child_nodes(&self) -> Vec<Node> {
        let children = self.doc.tree().node(self.id).children.clone();
        children.into_iter().map(|id| self.doc.node(id)).collect()
    }

    /// Element children only.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        let tree = self.doc.tree();
        let ids: Vec<NodeId> = tree
            .node(self.id)
            .children
            .iter()
            .copied()
            .filter(|&id| tree.element(id).is_some())
            .collect();
        drop(tree);
        ids.into_iter().map(|id| self.doc.node(id)).collect()
    }

    /// Whether `other` is this node or one of its descendants.
    #[must_use]
    pub fn contains(&self, other: &Node) -> bool {
        self.doc.same_document(&other.doc) && self.doc.tree().is_inclusive_ancestor(self.id, other.id)
    }

    /// Whether the node is attached to its document.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let tree = self.doc.tree();
        tree.is_inclusive_ancestor(tree.document, self.id)
    }

    /// Descendant elements in document order, this node excluded.
    #[must_use]
    pub fn descendant_elements(&self) -> Vec<Node> {
        let tree = self.doc.tree();
        let ids: Vec<NodeId> = tree
            .descendants(self.id)
            .into_iter()
            .filter(|&id| tree.element(id).is_some())
            .collect();
        drop(tree);
        ids.into_iter().map(|id| self.doc.node(id)).collect()
    }

    /// Descendant elements carrying every class token in `names`.
    #[must_use]
    pub fn get_elements_by_class_name(&self, names: &str) -> Vec<Node> {
        let wanted: Vec<&str> = names.split_ascii_whitespace().collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        let tree = self.doc.tree();
        let ids: Vec<NodeId> = tree
            .descendants(self.id)
            .into_iter()
            .filter(|&id| {
                tree.element(id)
                    .and_then(|el| el.attribute("class"))
                    .is_some_and(|class| {
                        let tokens: Vec<&str> = class.split_ascii_whitespace().collect();
                        wanted.iter().all(|w| tokens.contains(w))
                    })
            })
            .collect();
        drop(tree);
        ids.into_iter().map(|id| self.doc.node(id)).collect()
    }

    /// Concatenated text of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let tree = self.doc.tree();
        if let NodeKind::Text(text) = &tree.node(self.id).kind {
            return text.clone();
        }
        tree.descendants(self.id)
            .into_iter()
            .filter_map(|id| match &tree.node(id).kind {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    // ── Tree edits ──────────────────────────────────────────────────────

    /// Append `child`, moving it from its current parent if it has one.
    ///
    /// # Errors
    ///
    /// Hierarchy and document errors as on the platform.
    pub fn append_child(&self, child: &Node) -> Result<Node, DomError> {
        self.insert_before(child, None)
    }

    /// Append several nodes as one change (a single child-list record).
    ///
    /// # Errors
    ///
    /// Hierarchy and document errors as on the platform; nothing is
    /// inserted when any node is rejected.
    pub fn append(&self, nodes: &[Node]) -> Result<(), DomError> {
        let ids = self.validated(nodes, None)?;
        self.doc.tree_mut().insert(self.id, &ids, None);
        Ok(())
    }

    /// Insert `node` before `reference`, or append when `reference` is `None`.
    ///
    /// # Errors
    ///
    /// [`DomError::NotFound`] when `reference` is not a child of this node,
    /// hierarchy and document errors as on the platform.
    pub fn insert_before(&self, node: &Node, reference: Option<&Node>) -> Result<Node, DomError> {
        if let Some(reference) = reference
            && !self.doc.same_document(&reference.doc)
        {
            return Err(DomError::WrongDocument);
        }
        let mut before = reference.map(Node::node_id);
        let ids = self.validated(std::slice::from_ref(node), before)?;
        if before == Some(node.id) {
            let tree = self.doc.tree();
            let siblings = &tree.node(self.id).children;
            before = siblings
                .iter()
                .position(|&c| c == node.id)
                .and_then(|index| siblings.get(index + 1).copied());
        }
        self.doc.tree_mut().insert(self.id, &ids, before);
        Ok(node.clone())
    }

    /// Remove `child` from this node.
    ///
    /// # Errors
    ///
    /// [`DomError::NotFound`] when `child` is not a child of this node.
    pub fn remove_child(&self, child: &Node) -> Result<Node, DomError> {
        if !self.doc.same_document(&child.doc)
            || self.doc.tree().node(child.id).parent != Some(self.id)
        {
            return Err(DomError::NotFound {
                reason: "the node to remove is not a child of this node",
            });
        }
        self.doc.tree_mut().detach(child.id);
        Ok(child.clone())
    }

    /// Detach this node from its parent; no-op when already detached.
    pub fn remove(&self) {
        self.doc.tree_mut().detach(self.id);
    }

    /// Replace all children with `nodes` as one change.
    ///
    /// # Errors
    ///
    /// Hierarchy and document errors as on the platform.
    pub fn replace_children(&self, nodes: &[Node]) -> Result<(), DomError> {
        let ids = self.validated(nodes, None)?;
        self.doc.tree_mut().replace_all(self.id, &ids);
        Ok(())
    }

    /// Replace all children with the parsed `markup` as one change.
    ///
    /// # Errors
    ///
    /// [`DomError::Markup`] for unparsable markup,
    /// [`DomError::InvalidNodeType`] on text nodes.
    pub fn set_inner_html(&self, markup: &str) -> Result<(), DomError> {
        if self.node_type() == NodeType::Text {
            return Err(DomError::InvalidNodeType {
                operation: "set_inner_html",
                node_type: NodeType::Text.label(),
            });
        }
        let nodes = self.doc.parse_fragment(markup)?;
        let ids: Vec<NodeId> = nodes.iter().map(Node::node_id).collect();
        self.doc.tree_mut().replace_all(self.id, &ids);
        Ok(())
    }

    /// Replace the text of a text node, or all children of an element with a
    /// single text node (none when `text` is empty).
    pub fn set_text_content(&self, text: &str) {
        match self.node_type() {
            NodeType::Text => self.doc.tree_mut().set_text_data(self.id, text),
            NodeType::Element => {
                let ids = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![self.doc.create_text_node(text).id]
                };
                self.doc.tree_mut().replace_all(self.id, &ids);
            }
            NodeType::Document => {}
        }
    }

    fn ensure_element(&self, operation: &'static str) -> Result<(), DomError> {
        match self.node_type() {
            NodeType::Element => Ok(()),
            other => Err(DomError::InvalidNodeType {
                operation,
                node_type: other.label(),
            }),
        }
    }

    /// Validate `nodes` for insertion under this node; duplicates keep their
    /// last position.
    fn validated(&self, nodes: &[Node], before: Option<NodeId>) -> Result<Vec<NodeId>, DomError> {
        let tree = self.doc.tree();
        for node in nodes {
            if !self.doc.same_document(&node.doc) {
                return Err(DomError::WrongDocument);
            }
            tree.ensure_pre_insert(self.id, node.id, before)?;
        }
        let ids: Vec<NodeId> = nodes.iter().map(Node::node_id).collect();
        Ok(ids
            .iter()
            .enumerate()
            .filter(|&(index, id)| !ids[index + 1..].contains(id))
            .map(|(_, &id)| id)
            .collect())
    }
}
