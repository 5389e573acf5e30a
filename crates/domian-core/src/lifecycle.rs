//! The public facade: construct, observe, destroy.
//!
//! # Invariants
//!
//! 1. Construction order is registry, initial scan, then observation. A
//!    mount handler error during the scan aborts construction before
//!    anything is observed.
//! 2. `Active → Destroyed` is one-way. There is no restart.
//! 3. After [`Lifecycle::destroy`] returns no handler of this instance runs,
//!    even for batches the host had already queued or the rest of the record
//!    whose handler called `destroy`.
//! 4. Dropping an active instance destroys it.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::config::LifecycleConfig;
use crate::descriptor::Descriptors;
use crate::dispatcher::MutationDispatcher;
use crate::error::LifecycleError;
use crate::host::{Host, ObserverOptions};
use crate::registry::ComponentRegistry;
use crate::scanner::InitialScanner;

/// Whether an instance is still observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    Active,
    Destroyed,
}

/// Binds registered components to a host document.
///
/// The subscription lives as long as this value. Keep it (or hand it to
/// whatever owns the page) for as long as lifecycle handlers should run.
pub struct Lifecycle<H: Host> {
    host: H,
    registry: Rc<ComponentRegistry<H::Node>>,
    config: LifecycleConfig,
    active: Rc<Cell<bool>>,
    subscription: Option<H::Subscription>,
}

impl<H: Host> Lifecycle<H> {
    /// Construct with [`LifecycleConfig::default`].
    ///
    /// # Errors
    ///
    /// See [`Lifecycle::with_config`].
    pub fn new(
        host: H,
        descriptors: impl Into<Descriptors<H::Node>>,
    ) -> Result<Self, LifecycleError> {
        Self::with_config(host, descriptors, LifecycleConfig::default())
    }

    /// Build the registry, mount pre-existing instances, and start
    /// observing the host's root.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Host`] when the host has no root or cannot observe.
    /// - [`LifecycleError::Handler`] / [`LifecycleError::Dispatch`] when a
    ///   mount handler fails during the initial scan.
    pub fn with_config(
        host: H,
        descriptors: impl Into<Descriptors<H::Node>>,
        config: LifecycleConfig,
    ) -> Result<Self, LifecycleError> {
        let registry = Rc::new(ComponentRegistry::new(descriptors));
        let root = host.observed_root()?;
        tracing::debug!(
            message = "lifecycle.construct",
            components = registry.len(),
            class_match = ?config.class_match,
            dispatch_policy = ?config.dispatch_policy
        );

        let scanned = InitialScanner::new(&host, &registry, config).scan(&root)?;
        tracing::trace!(
            message = "lifecycle.scan",
            visits = scanned.records,
            mounted = scanned.mounted
        );

        let active = Rc::new(Cell::new(true));
        let dispatcher = MutationDispatcher::with_guard(
            host.clone(),
            Rc::clone(&registry),
            config,
            Rc::clone(&active),
        );
        let subscription = host.observe(
            &root,
            ObserverOptions::LIFECYCLE,
            Box::new(move |records| dispatcher.dispatch(&records).map(drop)),
        )?;

        Ok(Self {
            host,
            registry,
            config,
            active,
            subscription: Some(subscription),
        })
    }

    /// Stop observation permanently.
    ///
    /// Calling it again is a logged no-op.
    pub fn destroy(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            tracing::warn!(message = "lifecycle.destroy.repeated");
            return;
        };
        self.active.set(false);
        self.host.disconnect(subscription);
        tracing::debug!(message = "lifecycle.destroy", components = self.registry.len());
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        if self.subscription.is_some() {
            SubscriptionState::Active
        } else {
            SubscriptionState::Destroyed
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry<H::Node> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> LifecycleConfig {
        self.config
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: Host> Drop for Lifecycle<H> {
    fn drop(&mut self) {
        if self.subscription.is_some() {
            self.destroy();
        }
    }
}

impl<H: Host> fmt::Debug for Lifecycle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("state", &self.state())
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
