#![forbid(unsafe_code)]

//! Domian public facade crate.
//!
//! Register components by name; their mount, update, and unmount handlers
//! run as elements whose class matches the name appear in, change in, and
//! leave the document.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use domian::prelude::*;
//!
//! let doc = Document::with_body(r#"<div class="greeting"></div>"#).unwrap();
//! let mounted = Rc::new(Cell::new(0));
//! let seen = Rc::clone(&mounted);
//!
//! let mut lifecycle = Lifecycle::new(
//!     doc.clone(),
//!     Component::new("greeting").on_mount(move |_| seen.set(seen.get() + 1)),
//! )
//! .unwrap();
//! assert_eq!(mounted.get(), 1);
//!
//! doc.body().set_inner_html(r#"<p class="greeting"></p>"#).unwrap();
//! doc.perform_microtask_checkpoint().unwrap();
//! assert_eq!(mounted.get(), 2);
//!
//! lifecycle.destroy();
//! ```

pub use domian_core as core;
#[cfg(feature = "dom")]
pub use domian_dom as dom;
#[cfg(feature = "web")]
pub use domian_web as web;

/// Component descriptor over the in-memory document's nodes.
#[cfg(feature = "dom")]
pub type Component = domian_core::ComponentDescriptor<domian_dom::Node>;

/// Lifecycle bound to the in-memory document.
#[cfg(feature = "dom")]
pub type DomLifecycle = domian_core::Lifecycle<domian_dom::Document>;

pub mod prelude {
    pub use domian_core::{
        ClassMatch, ComponentDescriptor, DispatchPolicy, Host, Lifecycle, LifecycleConfig,
        LifecycleError, LifecycleEvent, SubscriptionState,
    };

    #[cfg(feature = "dom")]
    pub use crate::{Component, DomLifecycle};
    #[cfg(feature = "dom")]
    pub use domian_dom::{Document, Node};

    #[cfg(all(feature = "web", target_arch = "wasm32"))]
    pub use domian_web::WebHost;
}
