//! The document contract the engine is written against.
//!
//! A [`Host`] exposes a queryable element tree with class strings and a
//! subscription API that delivers batches of [`ChangeRecord`]s on the host's
//! own schedule. The engine never mutates the tree.

use std::fmt;

use crate::error::{HostError, LifecycleError};

/// Which changes a subscription reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObserverOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
}

impl ObserverOptions {
    /// Child-list and attribute changes anywhere below the root.
    pub const LIFECYCLE: Self = Self {
        child_list: true,
        subtree: true,
        attributes: true,
    };
}

/// One delivered unit of change, already narrowed to what dispatch needs.
#[derive(Clone, PartialEq, Eq)]
pub enum ChangeRecord<N> {
    /// An attribute of `target` was set or removed.
    Attributes {
        target: N,
        attribute_name: Option<String>,
    },
    /// The child list of `target` changed.
    ChildList {
        target: N,
        added: Vec<N>,
        removed: Vec<N>,
    },
}

impl<N> ChangeRecord<N> {
    pub fn target(&self) -> &N {
        match self {
            Self::Attributes { target, .. } | Self::ChildList { target, .. } => target,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Attributes { .. } => "attributes",
            Self::ChildList { .. } => "childList",
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for ChangeRecord<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attributes {
                target,
                attribute_name,
            } => f
                .debug_struct("Attributes")
                .field("target", target)
                .field("attribute_name", attribute_name)
                .finish(),
            Self::ChildList {
                target,
                added,
                removed,
            } => f
                .debug_struct("ChildList")
                .field("target", target)
                .field("added", added)
                .field("removed", removed)
                .finish(),
        }
    }
}

/// Callback handed to [`Host::observe`]; invoked once per delivered batch.
pub type ChangeCallback<N> = Box<dyn FnMut(Vec<ChangeRecord<N>>) -> Result<(), LifecycleError>>;

/// A document environment the lifecycle engine can attach to.
///
/// Implementations are cheap handles (`Clone`) onto a single-threaded
/// document.
pub trait Host: Clone + 'static {
    type Node: Clone + fmt::Debug + 'static;

    /// Token returned by [`Host::observe`]; consumed by [`Host::disconnect`].
    type Subscription;

    /// The fixed root observed for the lifetime of a lifecycle instance.
    ///
    /// # Errors
    ///
    /// [`HostError::MissingRoot`] when the document has no content root.
    fn observed_root(&self) -> Result<Self::Node, HostError>;

    /// `root` (when it is an element) followed by every descendant element,
    /// in document order.
    fn elements_in(&self, root: &Self::Node) -> Vec<Self::Node>;

    /// The full class attribute of an element (empty when unset), or `None`
    /// for non-element nodes.
    fn class_name(&self, node: &Self::Node) -> Option<String>;

    /// Start delivering change batches for `root` to `callback`.
    ///
    /// # Errors
    ///
    /// [`HostError::ObserverUnavailable`] when the host cannot observe.
    fn observe(
        &self,
        root: &Self::Node,
        options: ObserverOptions,
        callback: ChangeCallback<Self::Node>,
    ) -> Result<Self::Subscription, HostError>;

    /// Stop the subscription. Batches not yet delivered are discarded where
    /// the host allows it.
    fn disconnect(&self, subscription: Self::Subscription);
}
