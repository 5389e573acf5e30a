//! Name-to-descriptor lookup, built once and read-only afterwards.

use std::fmt;

use ahash::AHashMap;

use crate::config::ClassMatch;
use crate::descriptor::{ComponentDescriptor, Descriptors};

/// Registered components in insertion order.
///
/// A later descriptor with an already-registered name replaces the earlier
/// one in place, so iteration order follows first registration while lookup
/// returns the last descriptor given.
pub struct ComponentRegistry<N> {
    entries: Vec<ComponentDescriptor<N>>,
    index: AHashMap<String, usize>,
}

impl<N> ComponentRegistry<N> {
    pub fn new(descriptors: impl Into<Descriptors<N>>) -> Self {
        let Descriptors(descriptors) = descriptors.into();
        let mut entries: Vec<ComponentDescriptor<N>> = Vec::with_capacity(descriptors.len());
        let mut index = AHashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match index.get(descriptor.name()) {
                Some(&slot) => entries[slot] = descriptor,
                None => {
                    index.insert(descriptor.name().to_owned(), entries.len());
                    entries.push(descriptor);
                }
            }
        }
        Self { entries, index }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ComponentDescriptor<N>> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(ComponentDescriptor::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentDescriptor<N>> {
        self.entries.iter()
    }

    /// Descriptors selected by an element's class string.
    ///
    /// Exact matching yields at most one descriptor. Token matching yields
    /// one per distinct registered token, in token order.
    pub fn matching(&self, class: &str, mode: ClassMatch) -> Vec<&ComponentDescriptor<N>> {
        match mode {
            ClassMatch::Exact => self.get(class).into_iter().collect(),
            ClassMatch::Token => {
                let mut found: Vec<&ComponentDescriptor<N>> = Vec::new();
                for token in class.split_ascii_whitespace() {
                    if let Some(descriptor) = self.get(token)
                        && !found.iter().any(|seen| seen.name() == token)
                    {
                        found.push(descriptor);
                    }
                }
                found
            }
        }
    }
}

impl<N> fmt::Debug for ComponentRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.entries)
            .finish()
    }
}
