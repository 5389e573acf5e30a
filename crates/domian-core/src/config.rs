//! Construction-time knobs for a [`Lifecycle`](crate::Lifecycle).
//!
//! The defaults reproduce the classic behaviour: exact class-string
//! matching and fail-fast dispatch.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How an element's class string is compared with a component name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClassMatch {
    /// The whole class string must equal the name. `"test other"` does not
    /// match `test`.
    #[default]
    Exact,
    /// Any whitespace-separated class token equal to the name matches.
    Token,
}

impl ClassMatch {
    /// Whether `class` selects the component called `name`.
    #[must_use]
    pub fn matches(self, class: &str, name: &str) -> bool {
        match self {
            Self::Exact => class == name,
            Self::Token => class.split_ascii_whitespace().any(|token| token == name),
        }
    }
}

/// What happens when a handler returns an error mid-batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DispatchPolicy {
    /// Stop at the first failure; the remainder of the batch is skipped.
    #[default]
    FailFast,
    /// Run every handler, then report all failures together.
    Isolate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LifecycleConfig {
    pub class_match: ClassMatch,
    pub dispatch_policy: DispatchPolicy,
}

impl LifecycleConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            class_match: ClassMatch::Exact,
            dispatch_policy: DispatchPolicy::FailFast,
        }
    }

    #[must_use]
    pub const fn with_class_match(mut self, class_match: ClassMatch) -> Self {
        self.class_match = class_match;
        self
    }

    #[must_use]
    pub const fn with_dispatch_policy(mut self, dispatch_policy: DispatchPolicy) -> Self {
        self.dispatch_policy = dispatch_policy;
        self
    }
}
