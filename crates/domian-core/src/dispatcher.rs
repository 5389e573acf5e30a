//! Translate delivered change batches into lifecycle handler calls.
//!
//! # Invariants
//!
//! 1. Records are handled strictly in delivery order.
//! 2. For a child-list record: update on the target, then mount for every
//!    added element, then unmount for every removed element, each list in the
//!    order the host reported it.
//! 3. An attribute record always fires update on its target; values are not
//!    compared.
//! 4. No state survives a batch. Mount versus unmount is decided by which
//!    list a node appears in, never by what was seen before.
//! 5. Non-element nodes (no class string) are skipped without lookup.
//! 6. The shared active flag is checked before every record and before
//!    every handler call. Once cleared, no further handler runs, even when a
//!    handler clears it partway through a record.
//!
//! # Failure Modes
//!
//! | Policy | First handler error |
//! |---|---|
//! | [`DispatchPolicy::FailFast`] | returned immediately; later handlers and records do not run |
//! | [`DispatchPolicy::Isolate`] | recorded; dispatch continues; all errors returned as [`LifecycleError::Dispatch`] |

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::config::{DispatchPolicy, LifecycleConfig};
use crate::descriptor::LifecycleEvent;
use crate::error::LifecycleError;
use crate::host::{ChangeRecord, Host};
use crate::registry::ComponentRegistry;

/// Handler invocation counts for one dispatch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchOutcome {
    /// Records actually examined (fewer than delivered when the guard
    /// tripped mid-batch).
    pub records: usize,
    pub mounted: usize,
    pub updated: usize,
    pub unmounted: usize,
}

impl DispatchOutcome {
    #[must_use]
    pub const fn handlers_run(&self) -> usize {
        self.mounted + self.updated + self.unmounted
    }

    pub(crate) fn bump(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Mount => self.mounted += 1,
            LifecycleEvent::Update => self.updated += 1,
            LifecycleEvent::Unmount => self.unmounted += 1,
        }
    }
}

/// Policy-aware sink for handler errors.
pub(crate) struct Failures {
    policy: DispatchPolicy,
    collected: Vec<LifecycleError>,
}

impl Failures {
    pub(crate) const fn new(policy: DispatchPolicy) -> Self {
        Self {
            policy,
            collected: Vec::new(),
        }
    }

    /// `Err` when the policy says to stop now.
    pub(crate) fn push(&mut self, err: LifecycleError) -> Result<(), LifecycleError> {
        match self.policy {
            DispatchPolicy::FailFast => Err(err),
            DispatchPolicy::Isolate => {
                self.collected.push(err);
                Ok(())
            }
        }
    }

    pub(crate) fn finish(self) -> Result<(), LifecycleError> {
        if self.collected.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::Dispatch {
                failures: self.collected,
            })
        }
    }
}

/// The callback body a [`Lifecycle`](crate::Lifecycle) installs on its host.
pub struct MutationDispatcher<H: Host> {
    host: H,
    registry: Rc<ComponentRegistry<H::Node>>,
    config: LifecycleConfig,
    active: Rc<Cell<bool>>,
}

impl<H: Host> Clone for MutationDispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            registry: Rc::clone(&self.registry),
            config: self.config,
            active: Rc::clone(&self.active),
        }
    }
}

impl<H: Host> fmt::Debug for MutationDispatcher<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationDispatcher")
            .field("components", &self.registry.len())
            .field("config", &self.config)
            .field("active", &self.active.get())
            .finish()
    }
}

impl<H: Host> MutationDispatcher<H> {
    pub fn new(host: H, registry: Rc<ComponentRegistry<H::Node>>, config: LifecycleConfig) -> Self {
        Self::with_guard(host, registry, config, Rc::new(Cell::new(true)))
    }

    pub(crate) fn with_guard(
        host: H,
        registry: Rc<ComponentRegistry<H::Node>>,
        config: LifecycleConfig,
        active: Rc<Cell<bool>>,
    ) -> Self {
        Self {
            host,
            registry,
            config,
            active,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Stop handling records; takes effect before the next handler call.
    pub fn deactivate(&self) {
        self.active.set(false);
    }

    /// Run one dispatch cycle over `records`.
    ///
    /// # Errors
    ///
    /// A handler error, per the configured [`DispatchPolicy`].
    pub fn dispatch(
        &self,
        records: &[ChangeRecord<H::Node>],
    ) -> Result<DispatchOutcome, LifecycleError> {
        let _span = tracing::trace_span!("lifecycle.dispatch", records = records.len()).entered();
        let mut outcome = DispatchOutcome::default();
        let mut failures = Failures::new(self.config.dispatch_policy);

        for record in records {
            if !self.active.get() {
                tracing::trace!(
                    message = "lifecycle.dispatch.dropped",
                    remaining = records.len() - outcome.records
                );
                break;
            }
            outcome.records += 1;
            match record {
                ChangeRecord::Attributes { target, .. } => {
                    self.fire(target, LifecycleEvent::Update, &mut outcome, &mut failures)?;
                }
                ChangeRecord::ChildList {
                    target,
                    added,
                    removed,
                } => {
                    self.fire(target, LifecycleEvent::Update, &mut outcome, &mut failures)?;
                    for node in added {
                        self.fire(node, LifecycleEvent::Mount, &mut outcome, &mut failures)?;
                    }
                    for node in removed {
                        self.fire(node, LifecycleEvent::Unmount, &mut outcome, &mut failures)?;
                    }
                }
            }
        }

        failures.finish()?;
        Ok(outcome)
    }

    fn fire(
        &self,
        node: &H::Node,
        event: LifecycleEvent,
        outcome: &mut DispatchOutcome,
        failures: &mut Failures,
    ) -> Result<(), LifecycleError> {
        if !self.active.get() {
            return Ok(());
        }
        let Some(class) = self.host.class_name(node) else {
            return Ok(());
        };
        for descriptor in self.registry.matching(&class, self.config.class_match) {
            let Some(handler) = descriptor.handler(event) else {
                continue;
            };
            if !self.active.get() {
                tracing::trace!(
                    message = "lifecycle.dispatch.dropped",
                    component = descriptor.name()
                );
                return Ok(());
            }
            tracing::debug!(
                message = event.message(),
                component = descriptor.name(),
                node = ?node
            );
            outcome.bump(event);
            if let Err(source) = handler(node) {
                failures.push(LifecycleError::handler(descriptor.name(), event, source))?;
            }
        }
        Ok(())
    }
}
