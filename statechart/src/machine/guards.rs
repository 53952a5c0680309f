//! Transition guard descriptors
//!
//! A guard is either an inline predicate or a name resolved against the
//! options registry when the transition is considered.

use crate::machine::events::Event;
use std::fmt;
use std::sync::Arc;

/// Signature of a guard predicate
pub type GuardFn<C> = Arc<dyn Fn(&C, &Event) -> bool + Send + Sync>;

/// A guard attached to a transition
#[derive(Clone)]
pub enum Guard<C> {
    /// Inline predicate over context and event
    Inline(GuardFn<C>),
    /// Name resolved against the guards registry
    Named(String),
}

impl<C> Guard<C> {
    /// Create an inline guard from a predicate.
    pub fn check<F>(predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
    {
        Guard::Inline(Arc::new(predicate))
    }

    /// Reference a guard registered in the machine options.
    pub fn named(name: impl Into<String>) -> Self {
        Guard::Named(name.into())
    }
}

impl<C> fmt::Debug for Guard<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Inline(_) => f.write_str("Guard::Inline"),
            Guard::Named(name) => write!(f, "Guard::Named({name})"),
        }
    }
}
