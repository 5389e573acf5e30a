//! Mutation observers: registration, records, and take/disconnect.
//!
//! Delivery itself lives in [`Document::perform_microtask_checkpoint`].

use std::fmt;
use std::rc::Rc;

use crate::document::Document;
use crate::error::{CallbackError, DomError};
use crate::node::Node;
use crate::tree::ObserverId;

pub(crate) type ObserverCallback =
    Box<dyn FnMut(Vec<MutationRecord>, &MutationObserver) -> Result<(), CallbackError>>;

/// What kind of change a [`MutationRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// An attribute was set or removed.
    Attributes,
    /// Text node data changed.
    CharacterData,
    /// Children were inserted and/or removed.
    ChildList,
}

impl MutationKind {
    /// Platform name of the record type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attributes => "attributes",
            Self::CharacterData => "characterData",
            Self::ChildList => "childList",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for [`MutationObserver::observe`].
///
/// Setting `attribute_old_value` or `attribute_filter` implies `attributes`;
/// setting `character_data_old_value` implies `character_data`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Child-list and attribute changes anywhere in the subtree.
    #[must_use]
    pub fn subtree_changes() -> Self {
        Self {
            child_list: true,
            attributes: true,
            subtree: true,
            ..Self::default()
        }
    }

    pub(crate) fn observes_attributes(&self) -> bool {
        self.attributes || self.attribute_old_value || self.attribute_filter.is_some()
    }

    pub(crate) fn observes_character_data(&self) -> bool {
        self.character_data || self.character_data_old_value
    }

    fn validate(&self) -> Result<(), DomError> {
        if !self.child_list && !self.observes_attributes() && !self.observes_character_data() {
            return Err(DomError::InvalidObserverOptions {
                reason: "one of child_list, attributes, or character_data must be set",
            });
        }
        Ok(())
    }
}

/// One delivered unit of change.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    /// Element whose attribute changed, text node whose data changed, or the
    /// parent whose child list changed.
    pub target: Node,
    pub added_nodes: Vec<Node>,
    pub removed_nodes: Vec<Node>,
    pub previous_sibling: Option<Node>,
    pub next_sibling: Option<Node>,
    pub attribute_name: Option<String>,
    /// Present only when the registration asked for old values.
    pub old_value: Option<String>,
}

/// Handle to an observer created by [`Document::create_mutation_observer`].
///
/// Dropping the handle does not disconnect the observer; it stays registered
/// for as long as the document lives, as on the platform. Once the observer
/// is disconnected and its last handle is dropped, the document frees its
/// slot and drops the callback.
#[derive(Clone)]
pub struct MutationObserver {
    pub(crate) doc: Document,
    pub(crate) id: ObserverId,
    pub(crate) handles: Rc<()>,
}

impl Drop for MutationObserver {
    fn drop(&mut self) {
        if Rc::strong_count(&self.handles) > 1 {
            return;
        }
        let Ok(mut tree) = self.doc.try_tree_mut() else {
            return;
        };
        let callback = tree.release(self.id);
        drop(tree);
        drop(callback);
    }
}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObserver")
            .field("id", &self.id.0)
            .finish()
    }
}

impl PartialEq for MutationObserver {
    fn eq(&self, other: &Self) -> bool {
        self.doc.same_document(&other.doc) && self.id == other.id
    }
}

impl MutationObserver {
    /// Start (or reconfigure) observation of `target`.
    ///
    /// # Errors
    ///
    /// [`DomError::InvalidObserverOptions`] when the options select nothing,
    /// [`DomError::WrongDocument`] when `target` belongs to another document.
    pub fn observe(&self, target: &Node, options: MutationObserverInit) -> Result<(), DomError> {
        options.validate()?;
        if !self.doc.same_document(target.document()) {
            return Err(DomError::WrongDocument);
        }
        self.doc
            .tree_mut()
            .register(self.id, target.node_id(), options);
        Ok(())
    }

    /// Stop observing every node and discard queued records.
    pub fn disconnect(&self) {
        self.doc.tree_mut().unregister_all(self.id);
    }

    /// Remove and return the records queued for this observer.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        let pending = std::mem::take(&mut self.doc.tree_mut().observers[self.id.0].queue);
        self.doc.materialize(pending)
    }
}
