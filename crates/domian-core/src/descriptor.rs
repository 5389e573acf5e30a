//! Component descriptors: a name plus optional lifecycle handlers.

use std::fmt;
use std::rc::Rc;

/// Error returned by a fallible lifecycle handler.
pub type HandlerError = Box<dyn std::error::Error + 'static>;

/// Result of a lifecycle handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Shared lifecycle handler over host nodes of type `N`.
pub type Handler<N> = Rc<dyn Fn(&N) -> HandlerResult>;

/// The three lifecycle events a component can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// An instance became present in the observed tree.
    Mount,
    /// A present instance's attributes or direct children changed.
    Update,
    /// An instance was removed from the observed tree.
    Unmount,
}

impl LifecycleEvent {
    /// Event name used in tracing output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Mount => "lifecycle.mount",
            Self::Update => "lifecycle.update",
            Self::Unmount => "lifecycle.unmount",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mount => "mount",
            Self::Update => "update",
            Self::Unmount => "unmount",
        })
    }
}

/// A named bundle of optional mount/update/unmount handlers.
///
/// The name doubles as the matching key against an element's class string.
///
/// ```
/// use domian_core::ComponentDescriptor;
///
/// let counter = ComponentDescriptor::<String>::new("counter")
///     .on_mount(|node| println!("mounted {node}"))
///     .try_on_update(|node| {
///         if node.is_empty() {
///             return Err("empty node".into());
///         }
///         Ok(())
///     });
/// assert_eq!(counter.name(), "counter");
/// ```
pub struct ComponentDescriptor<N> {
    name: String,
    on_mount: Option<Handler<N>>,
    on_update: Option<Handler<N>>,
    on_unmount: Option<Handler<N>>,
}

impl<N> Clone for ComponentDescriptor<N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            on_mount: self.on_mount.clone(),
            on_update: self.on_update.clone(),
            on_unmount: self.on_unmount.clone(),
        }
    }
}

impl<N> fmt::Debug for ComponentDescriptor<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("on_mount", &self.on_mount.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_unmount", &self.on_unmount.is_some())
            .finish()
    }
}

impl<N: 'static> ComponentDescriptor<N> {
    /// A descriptor with no handlers.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_mount: None,
            on_update: None,
            on_unmount: None,
        }
    }

    #[must_use]
    pub fn on_mount(self, handler: impl Fn(&N) + 'static) -> Self {
        self.try_on_mount(infallible(handler))
    }

    #[must_use]
    pub fn try_on_mount(mut self, handler: impl Fn(&N) -> HandlerResult + 'static) -> Self {
        self.on_mount = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn on_update(self, handler: impl Fn(&N) + 'static) -> Self {
        self.try_on_update(infallible(handler))
    }

    #[must_use]
    pub fn try_on_update(mut self, handler: impl Fn(&N) -> HandlerResult + 'static) -> Self {
        self.on_update = Some(Rc::new(handler));
        self
    }

    #[must_use]
    pub fn on_unmount(self, handler: impl Fn(&N) + 'static) -> Self {
        self.try_on_unmount(infallible(handler))
    }

    #[must_use]
    pub fn try_on_unmount(mut self, handler: impl Fn(&N) -> HandlerResult + 'static) -> Self {
        self.on_unmount = Some(Rc::new(handler));
        self
    }
}

impl<N> ComponentDescriptor<N> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The handler registered for `event`, if any.
    #[must_use]
    pub fn handler(&self, event: LifecycleEvent) -> Option<&Handler<N>> {
        match event {
            LifecycleEvent::Mount => self.on_mount.as_ref(),
            LifecycleEvent::Update => self.on_update.as_ref(),
            LifecycleEvent::Unmount => self.on_unmount.as_ref(),
        }
    }

    #[must_use]
    pub fn has_handler(&self, event: LifecycleEvent) -> bool {
        self.handler(event).is_some()
    }
}

fn infallible<N: 'static>(
    handler: impl Fn(&N) + 'static,
) -> impl Fn(&N) -> HandlerResult + 'static {
    move |node| {
        handler(node);
        Ok(())
    }
}

/// Ordered descriptors accepted at construction.
///
/// Converts from a single descriptor (the singleton form), a `Vec`, or an
/// array.
pub struct Descriptors<N>(pub Vec<ComponentDescriptor<N>>);

impl<N> fmt::Debug for Descriptors<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.0).finish()
    }
}

impl<N> From<ComponentDescriptor<N>> for Descriptors<N> {
    fn from(descriptor: ComponentDescriptor<N>) -> Self {
        Self(vec![descriptor])
    }
}

impl<N> From<Vec<ComponentDescriptor<N>>> for Descriptors<N> {
    fn from(descriptors: Vec<ComponentDescriptor<N>>) -> Self {
        Self(descriptors)
    }
}

impl<N, const K: usize> From<[ComponentDescriptor<N>; K]> for Descriptors<N> {
    fn from(descriptors: [ComponentDescriptor<N>; K]) -> Self {
        Self(descriptors.into())
    }
}

impl<N> FromIterator<ComponentDescriptor<N>> for Descriptors<N> {
    fn from_iter<I: IntoIterator<Item = ComponentDescriptor<N>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
