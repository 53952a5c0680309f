//! Hierarchical state values
//!
//! A state value is either a leaf name or a branch mapping child keys to
//! nested values. A branch with several entries describes the regions of a
//! parallel state; a branch with no entries marks a leaf that sits directly
//! under a parallel state. Equality is structural.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default delimiter for the dotted text form.
pub const DEFAULT_DELIMITER: &str = ".";

/// Represents the hierarchical value of a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// Leaf state (e.g. "idle")
    Simple(String),
    /// Branch state mapping child keys to nested values
    Compound(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Create a leaf state value
    pub fn simple(name: impl Into<String>) -> Self {
        Self::Simple(name.into())
    }

    /// Create a branch state value with a single child
    pub fn compound(parent: impl Into<String>, child: StateValue) -> Self {
        let mut map = BTreeMap::new();
        map.insert(parent.into(), child);
        Self::Compound(map)
    }

    /// Create a branch state value from key/value pairs
    pub fn branch(entries: impl IntoIterator<Item = (String, StateValue)>) -> Self {
        Self::Compound(entries.into_iter().collect())
    }

    /// An empty branch, the value of a leaf sitting under a parallel state
    pub fn empty() -> Self {
        Self::Compound(BTreeMap::new())
    }

    /// Parse a delimited path such as `red.walk` into a nested value.
    pub fn parse(path: &str, delimiter: &str) -> Self {
        let mut segments = path.rsplit(delimiter);
        let leaf = segments.next().unwrap_or(path);
        let mut value = StateValue::simple(leaf);
        for segment in segments {
            value = StateValue::compound(segment, value);
        }
        value
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, StateValue::Compound(map) if !map.is_empty())
    }

    /// True when `self` is a prefix of `other`: every branch named in `self`
    /// exists in `other` and agrees with it down to the leaves of `self`.
    pub fn is_prefix_of(&self, other: &StateValue) -> bool {
        match (self, other) {
            (StateValue::Simple(a), StateValue::Simple(b)) => a == b,
            (StateValue::Simple(a), StateValue::Compound(map)) => map.contains_key(a),
            (StateValue::Compound(map), StateValue::Simple(b)) => {
                map.len() == 1
                    && map
                        .get(b)
                        .map(|sub| matches!(sub, StateValue::Compound(m) if m.is_empty()))
                        .unwrap_or(false)
            }
            (StateValue::Compound(a), StateValue::Compound(b)) => a.iter().all(|(key, sub)| {
                b.get(key).is_some_and(|nested| sub.is_prefix_of(nested))
                    || (matches!(sub, StateValue::Compound(m) if m.is_empty())
                        && b.contains_key(key))
            }),
        }
    }

    /// Check this value against a delimited pattern such as `red` or
    /// `red.walk`. The pattern matches when it is a prefix of this value.
    pub fn matches(&self, pattern: &str, delimiter: &str) -> bool {
        pattern == "*" || StateValue::parse(pattern, delimiter).is_prefix_of(self)
    }

    /// The nested value reached by walking `path` from the root of this
    /// value; `None` when the path leaves the value.
    pub fn at_path(&self, path: &[String]) -> Option<&StateValue> {
        let mut current = self;
        for segment in path {
            match current {
                StateValue::Compound(map) => current = map.get(segment)?,
                StateValue::Simple(_) => return None,
            }
        }
        Some(current)
    }

    /// All leaf paths of this value, as key sequences from the root.
    pub fn to_paths(&self) -> Vec<Vec<String>> {
        match self {
            StateValue::Simple(name) => vec![vec![name.clone()]],
            StateValue::Compound(map) if map.is_empty() => vec![vec![]],
            StateValue::Compound(map) => {
                let mut paths = Vec::new();
                for (key, sub) in map {
                    for mut tail in sub.to_paths() {
                        let mut path = vec![key.clone()];
                        path.append(&mut tail);
                        paths.push(path);
                    }
                }
                paths
            }
        }
    }

    /// Leaf paths joined by the delimiter (the text form of the value).
    pub fn to_strings(&self, delimiter: &str) -> Vec<String> {
        self.to_paths()
            .into_iter()
            .map(|segments| {
                segments
                    .iter()
                    .filter(|s| !s.is_empty())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(delimiter)
            })
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let paths = self.to_strings(DEFAULT_DELIMITER);
        match paths.as_slice() {
            [single] => write!(f, "{single}"),
            many => write!(f, "[{}]", many.join(", ")),
        }
    }
}

impl From<&str> for StateValue {
    fn from(path: &str) -> Self {
        StateValue::parse(path, DEFAULT_DELIMITER)
    }
}

impl From<String> for StateValue {
    fn from(path: String) -> Self {
        StateValue::parse(&path, DEFAULT_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_builds_nested_values() {
        assert_eq!(StateValue::from("idle"), StateValue::simple("idle"));
        assert_eq!(
            StateValue::from("power.on"),
            StateValue::compound("power", StateValue::simple("on"))
        );
        assert_eq!(
            StateValue::from("a.b.c"),
            StateValue::compound("a", StateValue::compound("b", StateValue::simple("c")))
        );
    }

    #[test]
    fn simple_value_matches_exact_name() {
        let value = StateValue::simple("idle");
        assert!(value.matches("idle", "."));
        assert!(!value.matches("running", "."));
        assert!(value.matches("*", "."));
    }

    #[test]
    fn compound_value_matches_prefixes() {
        let value = StateValue::compound("power", StateValue::simple("on"));
        assert!(value.matches("power", "."));
        assert!(value.matches("power.on", "."));
        assert!(!value.matches("power.off", "."));
        assert!(!value.matches("on", "."));
    }

    #[test]
    fn parallel_value_matches_each_region() {
        let value = StateValue::branch([
            ("heating".to_string(), StateValue::simple("active")),
            ("fan".to_string(), StateValue::simple("low")),
        ]);
        assert!(value.matches("heating", "."));
        assert!(value.matches("heating.active", "."));
        assert!(value.matches("fan.low", "."));
        assert!(!value.matches("fan.high", "."));
    }

    #[test]
    fn leaf_paths_and_text_form() {
        let value = StateValue::branch([
            ("heating".to_string(), StateValue::simple("active")),
            (
                "fan".to_string(),
                StateValue::compound("speed", StateValue::simple("low")),
            ),
        ]);
        assert_eq!(
            value.to_strings("."),
            vec!["fan.speed.low".to_string(), "heating.active".to_string()]
        );
    }

    #[test]
    fn empty_branch_is_a_leaf_path() {
        let value = StateValue::branch([
            ("a".to_string(), StateValue::empty()),
            ("b".to_string(), StateValue::simple("on")),
        ]);
        assert_eq!(value.to_strings("."), vec!["a".to_string(), "b.on".to_string()]);
        assert!(value.matches("a", "."));
    }

    #[test]
    fn display_formats_single_and_parallel_values() {
        assert_eq!(StateValue::from("power.on").to_string(), "power.on");
        let parallel = StateValue::branch([
            ("a".to_string(), StateValue::simple("x")),
            ("b".to_string(), StateValue::simple("y")),
        ]);
        assert_eq!(parallel.to_string(), "[a.x, b.y]");
    }

    #[test]
    fn equality_is_structural() {
        let a = StateValue::from("red.walk");
        let b = StateValue::compound("red", StateValue::simple("walk"));
        assert_eq!(a, b);
    }
}
