#![forbid(unsafe_code)]

//! Core: component registry, initial scan, and mutation-to-lifecycle dispatch.
//!
//! Domian binds [`ComponentDescriptor`]s to elements of a live document and
//! runs their mount, update, and unmount handlers as matching elements
//! appear, change, and disappear. The document itself is abstracted behind
//! the [`Host`] trait; `domian-dom` provides an in-memory host and
//! `domian-web` the browser one.
//!
//! # Control flow
//!
//! ```text
//! Lifecycle::new ─▶ ComponentRegistry ─▶ initial scan (mount) ─▶ Host::observe
//!                                                                   │
//!            host delivers a batch of ChangeRecords ◀───────────────┘
//!                          │
//!                          ▼
//!                MutationDispatcher::dispatch ─▶ mount / update / unmount
//! ```
//!
//! # Invariants
//!
//! 1. The registry is immutable after construction; duplicate names keep the
//!    first position and the last descriptor.
//! 2. Matching compares the element's full class string with the component
//!    name unless [`ClassMatch::Token`] is configured.
//! 3. Dispatch is stateless across batches: classification depends only on
//!    the record kind and its added/removed lists.
//! 4. Records are processed in delivery order; within a child-list record the
//!    parent update runs first, then mounts, then unmounts.
//! 5. Once [`Lifecycle::destroy`] returns, no handler runs again.
//!
//! # Failure Modes
//!
//! - **Handler error** (default [`DispatchPolicy::FailFast`]): the rest of the
//!   batch is skipped and the error is returned to the host, which reports it
//!   like any uncaught callback error.
//! - **Handler panic**: not caught.
//! - **Observation unavailable**: [`Lifecycle::new`] fails with
//!   [`HostError`].

pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod registry;
pub mod scanner;

#[cfg(any(feature = "dom", test))]
mod dom_host;

pub use config::{ClassMatch, DispatchPolicy, LifecycleConfig};
pub use descriptor::{
    ComponentDescriptor, Descriptors, Handler, HandlerError, HandlerResult, LifecycleEvent,
};
pub use dispatcher::{DispatchOutcome, MutationDispatcher};
pub use error::{HostError, LifecycleError};
pub use host::{ChangeCallback, ChangeRecord, Host, ObserverOptions};
pub use lifecycle::{Lifecycle, SubscriptionState};
pub use registry::ComponentRegistry;
pub use scanner::InitialScanner;

#[cfg(feature = "dom")]
pub use dom_host::DomSubscription;
