//! The immutable state object returned by each transition call

use crate::machine::actions::Effect;
use crate::machine::events::Event;
use crate::machine::history::HistoryValue;
use crate::machine::states::{StateValue, DEFAULT_DELIMITER};
use serde_json::Value;
use std::collections::BTreeMap;

/// One observed state of a machine: the value, the context, and the ordered
/// side effects the runtime must execute to honor the transition that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct State<C> {
    /// Hierarchical state value
    pub value: StateValue,
    /// Extended context after all assigns of the call
    pub context: C,
    /// Resolved side effects, in execution order
    pub actions: Vec<Effect>,
    /// Activity and invocation ids mapped to whether they are running
    pub activities: BTreeMap<String, bool>,
    /// Ids of every active node, in document order
    pub configuration: Vec<String>,
    /// History snapshot used to recall exited subtrees
    pub history: HistoryValue,
    /// Meta values of the active nodes, keyed by node id
    pub meta: BTreeMap<String, Value>,
    /// The event that produced this state
    pub event: Event,
    /// The state this one was computed from, truncated to one level
    pub previous: Option<Box<State<C>>>,
    /// Whether the call changed the value or ran any assign
    pub changed: bool,
    /// Whether the machine as a whole has reached a done condition
    pub done: bool,
}

impl<C: Clone> State<C> {
    /// Check the state value against a delimited pattern such as `red` or
    /// `red.walk` (the default delimiter).
    pub fn matches(&self, pattern: &str) -> bool {
        self.value.matches(pattern, DEFAULT_DELIMITER)
    }

    /// Whether the node with the given id is active.
    pub fn is_active(&self, id: &str) -> bool {
        self.configuration.iter().any(|active| active == id)
    }

    /// A copy with the previous-state link dropped, keeping chains one
    /// level deep.
    pub(crate) fn without_previous(&self) -> State<C> {
        let mut copy = self.clone();
        copy.previous = None;
        copy
    }
}
