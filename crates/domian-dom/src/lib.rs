#![forbid(unsafe_code)]

//! In-memory document tree with native-style mutation observers.
//!
//! This crate is the deterministic host used by Domian's tests and by native
//! embedders. It models the parts of the platform DOM that lifecycle dispatch
//! depends on:
//!
//! - [`Document`] and [`Node`] handles over a shared, single-threaded tree.
//! - Tree edits (`append_child`, `remove_child`, `set_inner_html`, ...) with
//!   platform error semantics ([`DomError`]).
//! - [`MutationObserver`] registrations that queue one [`MutationRecord`] per
//!   mutation API call and deliver them only at
//!   [`Document::perform_microtask_checkpoint`].
//!
//! # Delivery model
//!
//! Browsers deliver mutation records from a microtask, some time after the
//! code that caused them has returned. Here the embedder decides when that
//! happens by calling `perform_microtask_checkpoint()`; until then records
//! accumulate per observer. This keeps tests fully reproducible.
//!
//! # Invariants
//!
//! 1. Node identity is stable: a node removed from the tree keeps its id and
//!    can be reinserted.
//! 2. Every mutation API call queues at most one record per interested
//!    observer, except moves, which first queue a removal on the old parent.
//! 3. Observers are notified in creation order; records within a batch keep
//!    the order in which they were queued.
//! 4. No tree borrow is held while an observer callback runs, so callbacks
//!    may freely mutate the document.
//! 5. Nodes live in an arena that only grows. A node removed from the tree
//!    stays allocated, so its handles stay valid, until the document is
//!    dropped. Embedders that rebuild large subtrees for a long time should
//!    start a fresh document rather than reuse one indefinitely.
//! 6. Observer slots are reclaimed. Once an observer is disconnected and its
//!    last [`MutationObserver`] handle is gone, its callback is dropped and
//!    the slot is reused by the next observer created.
//!
//! # Example
//!
//! ```
//! use domian_dom::{Document, MutationObserverInit};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let doc = Document::new();
//! let seen = Rc::new(Cell::new(0));
//! let counter = Rc::clone(&seen);
//! let observer = doc.create_mutation_observer(move |records, _| {
//!     counter.set(counter.get() + records.len());
//!     Ok(())
//! });
//! observer
//!     .observe(&doc.body(), MutationObserverInit::subtree_changes())
//!     .unwrap();
//!
//! doc.body().set_inner_html("<div class=\"card\"></div>").unwrap();
//! assert_eq!(seen.get(), 0);
//! doc.perform_microtask_checkpoint().unwrap();
//! assert_eq!(seen.get(), 1);
//! ```

mod document;
mod error;
mod markup;
mod node;
mod observer;
mod tree;

pub use document::Document;
pub use error::{CallbackError, DeliveryError, DomError};
pub use node::{Node, NodeType};
pub use observer::{MutationKind, MutationObserver, MutationObserverInit, MutationRecord};
