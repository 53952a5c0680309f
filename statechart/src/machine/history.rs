//! History snapshots
//!
//! For every exited compound or parallel node that owns a history child, the
//! engine records the descendant value the node held at exit. Shallow recall
//! uses only the top level of the recorded value; deep recall replays it
//! exactly.

use crate::machine::states::StateValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recorded descendant values, keyed by the owning node's id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryValue {
    entries: BTreeMap<String, StateValue>,
}

impl HistoryValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value recorded for a node, if its subtree was ever exited.
    pub fn get(&self, id: &str) -> Option<&StateValue> {
        self.entries.get(id)
    }

    /// Overwrite the recorded value for a node.
    pub fn record(&mut self, id: impl Into<String>, value: StateValue) {
        self.entries.insert(id.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &StateValue)> {
        self.entries.iter()
    }
}

/// The child keys a shallow recall re-enters: the top level of a recorded
/// descendant value.
pub fn shallow_keys(value: &StateValue) -> Vec<String> {
    match value {
        StateValue::Simple(key) => vec![key.clone()],
        StateValue::Compound(map) => map.keys().cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn recording_overwrites_earlier_values() {
        let mut history = HistoryValue::new();
        history.record("m.a", StateValue::simple("x"));
        history.record("m.a", StateValue::simple("y"));
        assert_eq!(history.get("m.a"), Some(&StateValue::simple("y")));
        assert_eq!(history.get("m.b"), None);
    }

    #[test]
    fn shallow_keys_take_the_top_level() {
        assert_eq!(shallow_keys(&StateValue::simple("c")), vec!["c".to_string()]);
        let nested = StateValue::compound("b", StateValue::simple("deep"));
        assert_eq!(shallow_keys(&nested), vec!["b".to_string()]);
        let parallel = StateValue::branch([
            ("left".to_string(), StateValue::simple("x")),
            ("right".to_string(), StateValue::simple("y")),
        ]);
        assert_eq!(
            shallow_keys(&parallel),
            vec!["left".to_string(), "right".to_string()]
        );
    }
}
