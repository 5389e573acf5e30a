//! Arena storage behind [`Document`](crate::Document).
//!
//! Everything here is plain data manipulation: no callbacks run while a
//! `Tree` is borrowed. Mutation records are queued as [`PendingRecord`]s
//! holding raw ids so that queued records never keep the document alive.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::DomError;
use crate::observer::{MutationKind, MutationObserverInit, ObserverCallback};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ObserverId(pub(crate) usize);

#[derive(Debug)]
pub(crate) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
pub(crate) struct ElementData {
    pub(crate) local_name: String,
    pub(crate) attributes: Vec<(String, String)>,
}

impl ElementData {
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    registrations: Vec<Registration>,
}

#[derive(Debug, Clone)]
struct Registration {
    observer: ObserverId,
    options: MutationObserverInit,
}

/// A queued record; node handles are materialised at delivery time.
#[derive(Debug, Clone)]
pub(crate) struct PendingRecord {
    pub(crate) kind: MutationKind,
    pub(crate) target: NodeId,
    pub(crate) added: Vec<NodeId>,
    pub(crate) removed: Vec<NodeId>,
    pub(crate) previous_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) attribute_name: Option<String>,
    pub(crate) old_value: Option<String>,
}

impl PendingRecord {
    fn child_list(
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added,
            removed,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }
}

pub(crate) type SharedCallback = Rc<RefCell<ObserverCallback>>;

/// Per-observer state. A slot whose `callback` is `None` has been released
/// and its id is waiting in `Tree::free_observers`.
pub(crate) struct ObserverSlot {
    pub(crate) callback: Option<SharedCallback>,
    pub(crate) queue: Vec<PendingRecord>,
    observed: Vec<NodeId>,
    /// Creation sequence; delivery follows it even when ids are reused.
    pub(crate) created: u64,
    /// Liveness of the user-facing handles.
    pub(crate) handles: Weak<()>,
}

pub(crate) struct Tree {
    nodes: Vec<NodeData>,
    pub(crate) document: NodeId,
    pub(crate) document_element: NodeId,
    pub(crate) body: NodeId,
    pub(crate) observers: Vec<ObserverSlot>,
    free_observers: Vec<ObserverId>,
    observer_seq: u64,
}

impl Tree {
    /// A document holding `<html><body></body></html>`.
    pub(crate) fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            document: NodeId(0),
            document_element: NodeId(0),
            body: NodeId(0),
            observers: Vec::new(),
            free_observers: Vec::new(),
            observer_seq: 0,
        };
        let document = tree.alloc(NodeKind::Document);
        let html = tree.alloc_element("html");
        let body = tree.alloc_element("body");
        tree.link(document, html);
        tree.link(html, body);
        tree.document = document;
        tree.document_element = html;
        tree.body = body;
        tree
    }

    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
            registrations: Vec::new(),
        });
        id
    }

    pub(crate) fn alloc_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            local_name: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }))
    }

    /// Unobserved append used while building fresh, detached subtrees.
    pub(crate) fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub(crate) fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes[current.0].parent;
        }
        false
    }

    /// Depth-first pre-order walk over `root`'s descendants (root excluded).
    pub(crate) fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[root.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    // ── Validation ──────────────────────────────────────────────────────

    pub(crate) fn ensure_pre_insert(
        &self,
        parent: NodeId,
        node: NodeId,
        child: Option<NodeId>,
    ) -> Result<(), DomError> {
        if matches!(self.nodes[parent.0].kind, NodeKind::Text(_)) {
            return Err(DomError::HierarchyRequest {
                reason: "text nodes cannot have children",
            });
        }
        if matches!(self.nodes[node.0].kind, NodeKind::Document) {
            return Err(DomError::HierarchyRequest {
                reason: "a document cannot be inserted",
            });
        }
        if self.is_inclusive_ancestor(node, parent) {
            return Err(DomError::HierarchyRequest {
                reason: "the new child is an inclusive ancestor of the parent",
            });
        }
        if let Some(child) = child
            && self.nodes[child.0].parent != Some(parent)
        {
            return Err(DomError::NotFound {
                reason: "the reference node is not a child of this node",
            });
        }
        Ok(())
    }

    // ── Edits (each queues its records) ─────────────────────────────────

    /// Remove `node` from its parent, if any, queueing one record.
    pub(crate) fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.nodes[node.0].parent else {
            return;
        };
        let siblings = &mut self.nodes[parent.0].children;
        let Some(index) = siblings.iter().position(|&c| c == node) else {
            return;
        };
        let previous = index.checked_sub(1).map(|i| siblings[i]);
        let next = siblings.get(index + 1).copied();
        siblings.remove(index);
        self.nodes[node.0].parent = None;
        self.queue(PendingRecord::child_list(
            parent,
            Vec::new(),
            vec![node],
            previous,
            next,
        ));
    }

    /// Insert already-validated `nodes` before `before` (or at the end),
    /// queueing a single record for the whole insertion.
    pub(crate) fn insert(&mut self, parent: NodeId, nodes: &[NodeId], before: Option<NodeId>) {
        for &node in nodes {
            self.detach(node);
        }
        if nodes.is_empty() {
            return;
        }
        let children = &self.nodes[parent.0].children;
        let index = before
            .and_then(|b| children.iter().position(|&c| c == b))
            .unwrap_or(children.len());
        let previous = index.checked_sub(1).map(|i| children[i]);
        self.nodes[parent.0]
            .children
            .splice(index..index, nodes.iter().copied());
        for &node in nodes {
            self.nodes[node.0].parent = Some(parent);
        }
        self.queue(PendingRecord::child_list(
            parent,
            nodes.to_vec(),
            Vec::new(),
            previous,
            before,
        ));
    }

    /// Replace every child of `parent` with `nodes` as one record.
    pub(crate) fn replace_all(&mut self, parent: NodeId, nodes: &[NodeId]) {
        for &node in nodes {
            self.detach(node);
        }
        let removed = std::mem::take(&mut self.nodes[parent.0].children);
        for &old in &removed {
            self.nodes[old.0].parent = None;
        }
        for &node in nodes {
            self.nodes[node.0].parent = Some(parent);
        }
        self.nodes[parent.0].children = nodes.to_vec();
        if !removed.is_empty() || !nodes.is_empty() {
            self.queue(PendingRecord::child_list(
                parent,
                nodes.to_vec(),
                removed,
                None,
                None,
            ));
        }
    }

    pub(crate) fn set_attribute(&mut self, target: NodeId, name: &str, value: &str) {
        let NodeKind::Element(data) = &mut self.nodes[target.0].kind else {
            return;
        };
        let old = match data.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, value.to_string())),
            None => {
                data.attributes.push((name.to_string(), value.to_string()));
                None
            }
        };
        self.queue_attribute(target, name, old);
    }

    pub(crate) fn remove_attribute(&mut self, target: NodeId, name: &str) {
        let NodeKind::Element(data) = &mut self.nodes[target.0].kind else {
            return;
        };
        let Some(index) = data.attributes.iter().position(|(key, _)| key == name) else {
            return;
        };
        let (_, old) = data.attributes.remove(index);
        self.queue_attribute(target, name, Some(old));
    }

    pub(crate) fn set_text_data(&mut self, target: NodeId, text: &str) {
        let NodeKind::Text(data) = &mut self.nodes[target.0].kind else {
            return;
        };
        let old = std::mem::replace(data, text.to_string());
        self.queue(PendingRecord {
            kind: MutationKind::CharacterData,
            target,
            added: Vec::new(),
            removed: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value: Some(old),
        });
    }

    fn queue_attribute(&mut self, target: NodeId, name: &str, old: Option<String>) {
        self.queue(PendingRecord {
            kind: MutationKind::Attributes,
            target,
            added: Vec::new(),
            removed: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value: old,
        });
    }

    // ── Observers ───────────────────────────────────────────────────────

    /// Store `callback` in a fresh or recycled slot. The returned token is
    /// shared by every handle to the observer.
    pub(crate) fn add_observer(&mut self, callback: ObserverCallback) -> (ObserverId, Rc<()>) {
        let handles = Rc::new(());
        let slot = ObserverSlot {
            callback: Some(Rc::new(RefCell::new(callback))),
            queue: Vec::new(),
            observed: Vec::new(),
            created: self.observer_seq,
            handles: Rc::downgrade(&handles),
        };
        self.observer_seq += 1;
        let id = match self.free_observers.pop() {
            Some(id) => {
                self.observers[id.0] = slot;
                id
            }
            None => {
                self.observers.push(slot);
                ObserverId(self.observers.len() - 1)
            }
        };
        (id, handles)
    }

    /// Handle token for a delivery, minting a new one when every user
    /// handle has been dropped.
    pub(crate) fn observer_handles(&mut self, observer: ObserverId) -> Rc<()> {
        let slot = &mut self.observers[observer.0];
        slot.handles.upgrade().unwrap_or_else(|| {
            let handles = Rc::new(());
            slot.handles = Rc::downgrade(&handles);
            handles
        })
    }

    /// Free `observer` if it no longer observes anything. The callback is
    /// handed back so the caller drops it after releasing the tree borrow.
    pub(crate) fn release(&mut self, observer: ObserverId) -> Option<SharedCallback> {
        let slot = &mut self.observers[observer.0];
        if !slot.observed.is_empty() {
            return None;
        }
        let callback = slot.callback.take()?;
        slot.queue.clear();
        self.free_observers.push(observer);
        Some(callback)
    }

    /// Observers that still hold a callback.
    pub(crate) fn live_observers(&self) -> usize {
        self.observers.len() - self.free_observers.len()
    }

    /// Live observer ids in creation order.
    pub(crate) fn observers_in_creation_order(&self) -> Vec<ObserverId> {
        let mut live: Vec<(u64, usize)> = self
            .observers
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.callback.is_some())
            .map(|(index, slot)| (slot.created, index))
            .collect();
        live.sort_unstable();
        live.into_iter().map(|(_, index)| ObserverId(index)).collect()
    }

    /// Register (or re-register with new options) `observer` on `target`.
    pub(crate) fn register(
        &mut self,
        observer: ObserverId,
        target: NodeId,
        options: MutationObserverInit,
    ) {
        let registrations = &mut self.nodes[target.0].registrations;
        match registrations.iter_mut().find(|r| r.observer == observer) {
            Some(existing) => existing.options = options,
            None => {
                registrations.push(Registration { observer, options });
                self.observers[observer.0].observed.push(target);
            }
        }
    }

    pub(crate) fn unregister_all(&mut self, observer: ObserverId) {
        let slot = &mut self.observers[observer.0];
        let observed = std::mem::take(&mut slot.observed);
        slot.queue.clear();
        for node in observed {
            self.nodes[node.0]
                .registrations
                .retain(|r| r.observer != observer);
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.observers.iter().any(|slot| !slot.queue.is_empty())
    }

    /// Queue `record` for every observer interested in its target.
    fn queue(&mut self, record: PendingRecord) {
        let mut interested: Vec<(ObserverId, bool)> = Vec::new();
        let mut cursor = Some(record.target);
        while let Some(node) = cursor {
            for registration in &self.nodes[node.0].registrations {
                let options = &registration.options;
                if node != record.target && !options.subtree {
                    continue;
                }
                let wants_old_value = match record.kind {
                    MutationKind::Attributes => {
                        if !options.observes_attributes() {
                            continue;
                        }
                        if let (Some(filter), Some(name)) =
                            (&options.attribute_filter, &record.attribute_name)
                            && !filter.iter().any(|f| f == name)
                        {
                            continue;
                        }
                        options.attribute_old_value
                    }
                    MutationKind::CharacterData => {
                        if !options.observes_character_data() {
                            continue;
                        }
                        options.character_data_old_value
                    }
                    MutationKind::ChildList => {
                        if !options.child_list {
                            continue;
                        }
                        false
                    }
                };
                match interested
                    .iter_mut()
                    .find(|(id, _)| *id == registration.observer)
                {
                    Some((_, old)) => *old |= wants_old_value,
                    None => interested.push((registration.observer, wants_old_value)),
                }
            }
            cursor = self.nodes[node.0].parent;
        }

        for (observer, wants_old_value) in interested {
            let mut queued = record.clone();
            if !wants_old_value {
                queued.old_value = None;
            }
            self.observers[observer.0].queue.push(queued);
        }
    }
}
