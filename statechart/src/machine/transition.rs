//! Built transition descriptors
//!
//! Targets are resolved against the state tree while the machine is built;
//! at transition time a descriptor is purely index-based.

use crate::machine::actions::Action;
use crate::machine::events::{NULL_EVENT, WILDCARD_EVENT};
use crate::machine::guards::Guard;
use crate::machine::node::NodeId;
use std::fmt;

/// A transition owned by a state node, with targets resolved to node ids
#[derive(Clone)]
pub struct TransitionDescriptor<C> {
    /// Event name; empty for the null event, `*` for the wildcard
    pub event: String,
    pub source: NodeId,
    /// Resolved targets; empty for an action-only transition
    pub targets: Vec<NodeId>,
    pub guard: Option<Guard<C>>,
    pub in_state: Option<String>,
    /// Fire without exiting the source state
    pub internal: bool,
    pub actions: Vec<Action<C>>,
}

impl<C> TransitionDescriptor<C> {
    pub fn is_targetless(&self) -> bool {
        self.targets.is_empty()
    }

    fn answers(&self, event_name: &str) -> bool {
        self.event == event_name
    }
}

impl<C> fmt::Debug for TransitionDescriptor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionDescriptor")
            .field("event", &self.event)
            .field("source", &self.source)
            .field("targets", &self.targets)
            .field("internal", &self.internal)
            .finish()
    }
}

/// Indices of a node's candidate transitions for an event, in tie-break
/// order: exact matches first (insertion order), wildcard matches last. The
/// null event is matched only by null-event transitions.
pub fn candidate_indices<C>(
    transitions: &[TransitionDescriptor<C>],
    event_name: &str,
) -> Vec<usize> {
    let positions = |wanted: &str| {
        transitions
            .iter()
            .enumerate()
            .filter(move |(_, t)| t.answers(wanted))
            .map(|(i, _)| i)
            .collect::<Vec<_>>()
    };
    if event_name == NULL_EVENT {
        return positions(NULL_EVENT);
    }
    let mut indices = positions(event_name);
    indices.extend(positions(WILDCARD_EVENT));
    indices
}

/// Candidate transitions of one node for an event, in tie-break order.
pub fn candidates<'a, C>(
    transitions: &'a [TransitionDescriptor<C>],
    event_name: &str,
) -> Vec<&'a TransitionDescriptor<C>> {
    candidate_indices(transitions, event_name)
        .into_iter()
        .map(|i| &transitions[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(event: &str) -> TransitionDescriptor<()> {
        TransitionDescriptor {
            event: event.to_string(),
            source: 0,
            targets: vec![1],
            guard: None,
            in_state: None,
            internal: false,
            actions: Vec::new(),
        }
    }

    #[test]
    fn wildcard_candidates_come_last() {
        let transitions = vec![descriptor("*"), descriptor("GO"), descriptor("GO")];
        let picked = candidates(&transitions, "GO");
        let events: Vec<_> = picked.iter().map(|t| t.event.as_str()).collect();
        assert_eq!(events, ["GO", "GO", "*"]);
    }

    #[test]
    fn null_event_matches_only_null_transitions() {
        let transitions = vec![descriptor("*"), descriptor(""), descriptor("GO")];
        let picked = candidates(&transitions, "");
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].event, "");
    }

    #[test]
    fn unrelated_events_have_no_typed_candidates() {
        let transitions = vec![descriptor("GO")];
        assert!(candidates(&transitions, "STOP").is_empty());
    }
}
