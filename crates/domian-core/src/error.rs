//! Error types for construction and dispatch.

use crate::descriptor::{HandlerError, LifecycleEvent};

/// Failure reported by a [`Host`](crate::Host) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The host cannot observe mutations (no observer facility, or the
    /// observer refused the root).
    #[error("mutation observation unavailable: {reason}")]
    ObserverUnavailable { reason: String },

    /// The host has no root to observe.
    #[error("observed root missing: {reason}")]
    MissingRoot { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Host(#[from] HostError),

    /// A component handler returned an error.
    #[error("{event} handler of component `{component}` failed: {source}")]
    Handler {
        component: String,
        event: LifecycleEvent,
        #[source]
        source: HandlerError,
    },

    /// Several handlers failed under [`DispatchPolicy::Isolate`](crate::DispatchPolicy::Isolate).
    #[error("{} lifecycle handler(s) failed", .failures.len())]
    Dispatch { failures: Vec<LifecycleError> },
}

impl LifecycleError {
    pub(crate) fn handler(component: &str, event: LifecycleEvent, source: HandlerError) -> Self {
        Self::Handler {
            component: component.to_owned(),
            event,
            source,
        }
    }

    /// Handler failures carried by this error, flattened.
    #[must_use]
    pub fn handler_failures(&self) -> Vec<(&str, LifecycleEvent)> {
        match self {
            Self::Host(_) => Vec::new(),
            Self::Handler {
                component, event, ..
            } => vec![(component.as_str(), *event)],
            Self::Dispatch { failures } => failures
                .iter()
                .flat_map(LifecycleError::handler_failures)
                .collect(),
        }
    }
}
