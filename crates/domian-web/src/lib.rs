#![forbid(unsafe_code)]

//! Browser host for Domian.
//!
//! [`WebHost`] implements [`domian_core::Host`] over `web-sys`: the observed
//! root is `document.body`, and change batches come from a native
//! `MutationObserver`, so delivery follows the browser's microtask cadence.
//!
//! ```ignore
//! use domian_core::{ComponentDescriptor, Lifecycle};
//! use domian_web::WebHost;
//!
//! let host = WebHost::from_window()?;
//! let lifecycle = Lifecycle::new(
//!     host,
//!     ComponentDescriptor::new("clock").on_mount(|node| tracing::info!(?node, "clock mounted")),
//! )?;
//! // Keep `lifecycle` alive for as long as the page should be observed.
//! ```
//!
//! # Failure Modes
//!
//! - No window, document, or body: [`HostError::MissingRoot`](domian_core::HostError::MissingRoot).
//! - `new MutationObserver` or `observe` throws:
//!   [`HostError::ObserverUnavailable`](domian_core::HostError::ObserverUnavailable).
//! - A handler error during dispatch is logged and rethrown into JavaScript
//!   as an uncaught exception, which is how the browser reports any failing
//!   observer callback.
//!
//! On non-wasm targets this crate is empty.

#[cfg(target_arch = "wasm32")]
mod host;

#[cfg(target_arch = "wasm32")]
pub use host::{WebHost, WebSubscription};
