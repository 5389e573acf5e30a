//! One-shot mount pass over elements present at construction.

use crate::config::LifecycleConfig;
use crate::descriptor::LifecycleEvent;
use crate::dispatcher::{DispatchOutcome, Failures};
use crate::error::LifecycleError;
use crate::host::Host;
use crate::registry::ComponentRegistry;

/// Fires `on_mount` for every pre-existing instance under a root.
///
/// Components are visited in registry order and, for each, matching
/// elements in document order. The element list is re-read for every
/// component, so elements inserted by an earlier mount handler are seen by
/// later components.
pub struct InitialScanner<'a, H: Host> {
    host: &'a H,
    registry: &'a ComponentRegistry<H::Node>,
    config: LifecycleConfig,
}

impl<'a, H: Host> InitialScanner<'a, H> {
    pub fn new(
        host: &'a H,
        registry: &'a ComponentRegistry<H::Node>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            host,
            registry,
            config,
        }
    }

    /// Mount every match under `root`. Only `mounted` and `records` are
    /// filled in the outcome; `records` counts (component, element) visits,
    /// so an element is counted once per component with a mount handler.
    ///
    /// # Errors
    ///
    /// A mount handler error, per the configured dispatch policy.
    pub fn scan(&self, root: &H::Node) -> Result<DispatchOutcome, LifecycleError> {
        let mut outcome = DispatchOutcome::default();
        let mut failures = Failures::new(self.config.dispatch_policy);

        for descriptor in self.registry.iter() {
            let Some(on_mount) = descriptor.handler(LifecycleEvent::Mount) else {
                continue;
            };
            for element in self.host.elements_in(root) {
                outcome.records += 1;
                let Some(class) = self.host.class_name(&element) else {
                    continue;
                };
                if !self.config.class_match.matches(&class, descriptor.name()) {
                    continue;
                }
                tracing::debug!(
                    message = "lifecycle.mount",
                    component = descriptor.name(),
                    node = ?element,
                    initial = true
                );
                outcome.mounted += 1;
                if let Err(source) = on_mount(&element) {
                    failures.push(LifecycleError::handler(
                        descriptor.name(),
                        LifecycleEvent::Mount,
                        source,
                    ))?;
                }
            }
        }

        failures.finish()?;
        Ok(outcome)
    }
}
