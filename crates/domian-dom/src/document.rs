use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{CallbackError, DeliveryError, DomError};
use crate::markup::{self, Fragment};
use crate::node::Node;
use crate::observer::{MutationObserver, MutationRecord};
use crate::tree::{NodeId, NodeKind, PendingRecord, Tree};

struct DocumentInner {
    tree: RefCell<Tree>,
    delivering: Cell<bool>,
}

/// Shared handle to an in-memory document.
///
/// Cloning is cheap and yields a handle to the **same** document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree();
        f.debug_struct("Document")
            .field("observers", &tree.live_observers())
            .field("pending", &tree.has_pending())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing an empty `<body>`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                tree: RefCell::new(Tree::new()),
                delivering: Cell::new(false),
            }),
        }
    }

    /// Create a document whose body holds the parsed `markup`.
    ///
    /// The body is populated before any observer can exist, so no records
    /// are queued.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Markup`] when `markup` cannot be parsed.
    pub fn with_body(markup: &str) -> Result<Self, DomError> {
        let doc = Self::new();
        let nodes = doc.parse_fragment(markup)?;
        {
            let mut tree = doc.tree_mut();
            let body = tree.body;
            for node in &nodes {
                tree.link(body, node.node_id());
            }
        }
        Ok(doc)
    }

    pub(crate) fn tree(&self) -> Ref<'_, Tree> {
        self.inner.tree.borrow()
    }

    pub(crate) fn try_tree(&self) -> Result<Ref<'_, Tree>, std::cell::BorrowError> {
        self.inner.tree.try_borrow()
    }

    pub(crate) fn tree_mut(&self) -> RefMut<'_, Tree> {
        self.inner.tree.borrow_mut()
    }

    pub(crate) fn try_tree_mut(&self) -> Result<RefMut<'_, Tree>, std::cell::BorrowMutError> {
        self.inner.tree.try_borrow_mut()
    }

    pub(crate) fn same_document(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn node(&self, id: NodeId) -> Node {
        Node::new(self.clone(), id)
    }

    /// The document node itself.
    #[must_use]
    pub fn document_node(&self) -> Node {
        let id = self.tree().document;
        self.node(id)
    }

    /// The `<html>` element.
    #[must_use]
    pub fn document_element(&self) -> Node {
        let id = self.tree().document_element;
        self.node(id)
    }

    /// The `<body>` element.
    #[must_use]
    pub fn body(&self) -> Node {
        let id = self.tree().body;
        self.node(id)
    }

    /// Create a detached element.
    #[must_use]
    pub fn create_element(&self, tag: &str) -> Node {
        let id = self.tree_mut().alloc_element(tag);
        self.node(id)
    }

    /// Create a detached text node.
    #[must_use]
    pub fn create_text_node(&self, text: &str) -> Node {
        let id = self.tree_mut().alloc(NodeKind::Text(text.to_string()));
        self.node(id)
    }

    /// Parse `markup` into detached top-level nodes.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::Markup`] when `markup` cannot be parsed.
    pub fn parse_fragment(&self, markup: &str) -> Result<Vec<Node>, DomError> {
        let fragments = markup::parse(markup)?;
        let mut tree = self.tree_mut();
        let ids: Vec<NodeId> = fragments
            .into_iter()
            .map(|fragment| build(&mut tree, fragment))
            .collect();
        drop(tree);
        Ok(ids.into_iter().map(|id| self.node(id)).collect())
    }

    /// First connected element, in document order, whose `id` is `id`.
    #[must_use]
    pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
        let found = {
            let tree = self.tree();
            tree.descendants(tree.document).into_iter().find(|&node| {
                tree.element(node)
                    .and_then(|el| el.attribute("id"))
                    .is_some_and(|value| value == id)
            })
        };
        found.map(|node| self.node(node))
    }

    /// Connected elements carrying every class token in `names`, in document
    /// order. An empty token list matches nothing.
    #[must_use]
    pub fn get_elements_by_class_name(&self, names: &str) -> Vec<Node> {
        self.document_node().get_elements_by_class_name(names)
    }

    /// Create an observer. It observes nothing until
    /// [`MutationObserver::observe`] is called.
    pub fn create_mutation_observer<F>(&self, callback: F) -> MutationObserver
    where
        F: FnMut(Vec<MutationRecord>, &MutationObserver) -> Result<(), CallbackError> + 'static,
    {
        let (id, handles) = self.tree_mut().add_observer(Box::new(callback));
        MutationObserver {
            doc: self.clone(),
            id,
            handles,
        }
    }

    /// Observers still holding their callback: those observing something
    /// and those a live [`MutationObserver`] handle could still reuse.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.tree().live_observers()
    }

    /// Whether any observer has undelivered records.
    #[must_use]
    pub fn has_pending_mutations(&self) -> bool {
        self.tree().has_pending()
    }

    /// Deliver queued records to their observers.
    ///
    /// Observers are notified in creation order, each with all records
    /// queued for it at the moment its turn comes. The checkpoint repeats
    /// while callbacks queue further records. A failing callback is reported
    /// and does not prevent other observers from being notified. Re-entrant
    /// calls from inside a callback return `Ok(0)`.
    ///
    /// Returns the number of callback invocations.
    ///
    /// # Errors
    ///
    /// [`DeliveryError`] carrying every callback error, in delivery order.
    pub fn perform_microtask_checkpoint(&self) -> Result<usize, DeliveryError> {
        if self.inner.delivering.replace(true) {
            return Ok(0);
        }
        let mut delivered = 0usize;
        let mut errors: Vec<CallbackError> = Vec::new();

        while self.has_pending_mutations() {
            let order = self.tree().observers_in_creation_order();
            for id in order {
                let (pending, callback, handles) = {
                    let mut tree = self.tree_mut();
                    let slot = &mut tree.observers[id.0];
                    if slot.queue.is_empty() {
                        continue;
                    }
                    let Some(callback) = slot.callback.clone() else {
                        continue;
                    };
                    let pending = std::mem::take(&mut slot.queue);
                    (pending, callback, tree.observer_handles(id))
                };
                let records = self.materialize(pending);
                let observer = MutationObserver {
                    doc: self.clone(),
                    id,
                    handles,
                };
                delivered += 1;
                let result = (callback.borrow_mut())(records, &observer);
                // Frees the slot when the callback disconnected the last handle.
                drop(observer);
                if let Err(err) = result {
                    tracing::error!(
                        message = "dom.observer.callback_failed",
                        observer = id.0,
                        error = %err
                    );
                    errors.push(err);
                }
            }
        }

        self.inner.delivering.set(false);
        if errors.is_empty() {
            Ok(delivered)
        } else {
            Err(DeliveryError { errors })
        }
    }

    pub(crate) fn materialize(&self, pending: Vec<PendingRecord>) -> Vec<MutationRecord> {
        let to_nodes = |ids: Vec<NodeId>| -> Vec<Node> { ids.into_iter().map(|id| self.node(id)).collect() };
        pending
            .into_iter()
            .map(|record| MutationRecord {
                kind: record.kind,
                target: self.node(record.target),
                added_nodes: to_nodes(record.added),
                removed_nodes: to_nodes(record.removed),
                previous_sibling: record.previous_sibling.map(|id| self.node(id)),
                next_sibling: record.next_sibling.map(|id| self.node(id)),
                attribute_name: record.attribute_name,
                old_value: record.old_value,
            })
            .collect()
    }
}

fn build(tree: &mut Tree, fragment: Fragment) -> NodeId {
    match fragment {
        Fragment::Text(text) => tree.alloc(NodeKind::Text(text)),
        Fragment::Element {
            tag,
            attributes,
            children,
        } => {
            let id = tree.alloc_element(&tag);
            if let NodeKind::Element(data) = &mut tree.node_mut(id).kind {
                data.attributes = attributes;
            }
            for child in children {
                let child = build(tree, child);
                tree.link(id, child);
            }
            id
        }
    }
}
