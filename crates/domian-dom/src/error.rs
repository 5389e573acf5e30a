use thiserror::Error;

/// Error returned by an observer callback.
///
/// The document does not interpret it; it is reported and handed back to the
/// caller of [`Document::perform_microtask_checkpoint`](crate::Document::perform_microtask_checkpoint).
pub type CallbackError = Box<dyn std::error::Error + 'static>;

/// Errors raised by tree edits and observer registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    /// The edit would produce an invalid tree shape.
    #[error("hierarchy request: {reason}")]
    HierarchyRequest { reason: &'static str },

    /// A referenced child is not a child of the node being edited.
    #[error("node not found: {reason}")]
    NotFound { reason: &'static str },

    /// The node belongs to a different document.
    #[error("node belongs to a different document")]
    WrongDocument,

    /// The operation is only defined for another kind of node.
    #[error("{operation} is not supported on {node_type} nodes")]
    InvalidNodeType {
        operation: &'static str,
        node_type: &'static str,
    },

    /// Observer options that cannot observe anything.
    #[error("invalid observer options: {reason}")]
    InvalidObserverOptions { reason: &'static str },

    /// Markup could not be parsed.
    #[error("markup error at byte {offset}: {reason}")]
    Markup { offset: usize, reason: &'static str },
}

/// Callback failures collected during one microtask checkpoint.
///
/// Like the platform, a failing callback does not stop other observers from
/// being notified; every failure is kept in delivery order.
#[derive(Debug, Error)]
#[error("{} mutation observer callback(s) failed; first: {}", .errors.len(), first_message(.errors))]
pub struct DeliveryError {
    pub errors: Vec<CallbackError>,
}

fn first_message(errors: &[CallbackError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}
