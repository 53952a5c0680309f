//! Configuration algebra
//!
//! The configuration is the set of currently active nodes: every ancestor of
//! every active leaf, and every region of every active parallel node. These
//! operations convert between state values and configurations and complete
//! partial configurations through initial descents.

use crate::machine::node::{NodeId, StateKind, StateTree};
use crate::machine::states::StateValue;
use crate::utils::error::{MachineError, MachineResult};
use std::collections::BTreeSet;

impl<C> StateTree<C> {
    /// The active set described by a state value, including every ancestor
    /// named along the way. The value may be partial; run
    /// [`complete_config`](Self::complete_config) afterwards.
    pub fn config_from_value(&self, value: &StateValue) -> MachineResult<BTreeSet<NodeId>> {
        let mut set = BTreeSet::new();
        set.insert(self.root());
        self.config_from_subvalue(self.root(), value, &mut set)?;
        Ok(set)
    }

    /// Insert the nodes a value names, walking down from `from`.
    pub fn config_from_subvalue(
        &self,
        from: NodeId,
        value: &StateValue,
        set: &mut BTreeSet<NodeId>,
    ) -> MachineResult<()> {
        match value {
            StateValue::Simple(key) => {
                let child = self.active_child(from, key)?;
                set.insert(child);
            }
            StateValue::Compound(map) => {
                for (key, nested) in map {
                    let child = self.active_child(from, key)?;
                    set.insert(child);
                    self.config_from_subvalue(child, nested, set)?;
                }
            }
        }
        Ok(())
    }

    fn active_child(&self, parent: NodeId, key: &str) -> MachineResult<NodeId> {
        self.child_by_key(parent, key)
            .ok_or_else(|| MachineError::NoSuchState {
                machine: self.machine_key().to_string(),
                id: {
                    let mut path = self.node(parent).path.clone();
                    path.push(key.to_string());
                    path.join(self.delimiter())
                },
            })
    }

    /// Complete a configuration: descend through initial children of active
    /// compound nodes that have no active child, and activate every region
    /// of every active parallel node.
    pub fn complete_config(&self, set: &mut BTreeSet<NodeId>) -> MachineResult<()> {
        let mut stack = vec![self.root()];
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            match node.kind {
                StateKind::Parallel => {
                    for &region in &node.children {
                        if self.node(region).kind == StateKind::History {
                            continue;
                        }
                        set.insert(region);
                        stack.push(region);
                    }
                }
                StateKind::Compound => {
                    let active: Vec<NodeId> = node
                        .children
                        .iter()
                        .copied()
                        .filter(|&c| {
                            set.contains(&c) && self.node(c).kind != StateKind::History
                        })
                        .collect();
                    if active.is_empty() {
                        let initial_key = node.initial.as_deref().ok_or_else(|| {
                            MachineError::InvalidConfiguration {
                                machine: self.machine_key().to_string(),
                                id: node.id.clone(),
                                reason: "compound state has no initial child".into(),
                            }
                        })?;
                        let child = self.active_child(current, initial_key)?;
                        set.insert(child);
                        stack.push(child);
                    } else {
                        stack.extend(active);
                    }
                }
                StateKind::Atomic | StateKind::Final | StateKind::History => {}
            }
        }
        Ok(())
    }

    /// The value described by a complete configuration.
    pub fn value_from_config(&self, set: &BTreeSet<NodeId>) -> StateValue {
        self.subvalue_of(self.root(), set)
            .unwrap_or_else(StateValue::empty)
    }

    fn subvalue_of(&self, node: NodeId, set: &BTreeSet<NodeId>) -> Option<StateValue> {
        let current = self.node(node);
        if current.kind == StateKind::Parallel {
            let mut map = std::collections::BTreeMap::new();
            for &region in &current.children {
                let region_node = self.node(region);
                if region_node.kind == StateKind::History {
                    continue;
                }
                map.insert(
                    region_node.key.clone(),
                    self.subvalue_of(region, set).unwrap_or_else(StateValue::empty),
                );
            }
            return Some(StateValue::Compound(map));
        }
        let active = current
            .children
            .iter()
            .copied()
            .find(|&c| set.contains(&c) && self.node(c).kind != StateKind::History)?;
        match self.subvalue_of(active, set) {
            None => Some(StateValue::simple(self.node(active).key.clone())),
            Some(nested) => Some(StateValue::compound(self.node(active).key.clone(), nested)),
        }
    }

    /// Resolve a possibly partial value to its full form together with the
    /// matching configuration.
    pub fn resolve_value(&self, value: &StateValue) -> MachineResult<(StateValue, BTreeSet<NodeId>)> {
        let mut set = self.config_from_value(value)?;
        self.complete_config(&mut set)?;
        Ok((self.value_from_config(&set), set))
    }

    /// True when `node` has reached a done condition under `set`: a final
    /// node that is active, a compound with an active final child, or a
    /// parallel whose every region is done.
    pub fn is_done(&self, node: NodeId, set: &BTreeSet<NodeId>) -> bool {
        let current = self.node(node);
        match current.kind {
            StateKind::Final => set.contains(&node),
            StateKind::Compound => current
                .children
                .iter()
                .any(|&c| self.node(c).kind == StateKind::Final && set.contains(&c)),
            StateKind::Parallel => current
                .children
                .iter()
                .filter(|&&c| self.node(c).kind != StateKind::History)
                .all(|&c| self.is_done(c, set)),
            StateKind::Atomic | StateKind::History => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::config::{MachineConfig, StateNodeConfig};
    use pretty_assertions::assert_eq;

    fn tree() -> StateTree<()> {
        let config = MachineConfig::new("light", ())
            .with_initial("green")
            .state(StateNodeConfig::new("green").on("TIMER", "yellow"))
            .state(StateNodeConfig::new("yellow").on("TIMER", "red"))
            .state(
                StateNodeConfig::new("red")
                    .with_initial("walk")
                    .child(StateNodeConfig::new("walk"))
                    .child(StateNodeConfig::new("wait"))
                    .child(StateNodeConfig::new("stop")),
            );
        StateTree::build(&config).unwrap()
    }

    fn parallel_tree() -> StateTree<()> {
        let config = MachineConfig::new("word", ())
            .with_kind(StateKind::Parallel)
            .state(
                StateNodeConfig::new("bold")
                    .with_initial("off")
                    .child(StateNodeConfig::new("on"))
                    .child(StateNodeConfig::new("off")),
            )
            .state(
                StateNodeConfig::new("underline")
                    .with_initial("off")
                    .child(StateNodeConfig::new("on"))
                    .child(StateNodeConfig::new("off")),
            );
        StateTree::build(&config).unwrap()
    }

    #[test]
    fn partial_values_resolve_through_initial_descent() {
        let tree = tree();
        let (value, _) = tree.resolve_value(&StateValue::simple("red")).unwrap();
        assert_eq!(value, StateValue::from("red.walk"));
    }

    #[test]
    fn configuration_contains_every_ancestor() {
        let tree = tree();
        let (_, set) = tree.resolve_value(&StateValue::from("red.wait")).unwrap();
        for reference in ["light", "red", "red.wait"] {
            assert!(set.contains(&tree.lookup(reference).unwrap()));
        }
        assert!(!set.contains(&tree.lookup("red.walk").unwrap()));
    }

    #[test]
    fn parallel_resolution_activates_every_region() {
        let tree = parallel_tree();
        let (value, set) = tree.resolve_value(&StateValue::empty()).unwrap();
        assert_eq!(
            value,
            StateValue::branch([
                ("bold".to_string(), StateValue::simple("off")),
                ("underline".to_string(), StateValue::simple("off")),
            ])
        );
        for reference in ["bold", "bold.off", "underline", "underline.off"] {
            assert!(set.contains(&tree.lookup(reference).unwrap()));
        }
    }

    #[test]
    fn partial_parallel_value_keeps_named_regions() {
        let tree = parallel_tree();
        let (value, _) = tree
            .resolve_value(&StateValue::compound("bold", StateValue::simple("on")))
            .unwrap();
        assert_eq!(
            value,
            StateValue::branch([
                ("bold".to_string(), StateValue::simple("on")),
                ("underline".to_string(), StateValue::simple("off")),
            ])
        );
    }

    #[test]
    fn round_trip_between_value_and_configuration() {
        let tree = tree();
        let (value, set) = tree.resolve_value(&StateValue::from("red.stop")).unwrap();
        assert_eq!(tree.value_from_config(&set), value);
    }

    #[test]
    fn unknown_keys_fail_with_no_such_state() {
        let tree = tree();
        let err = tree
            .resolve_value(&StateValue::from("purple"))
            .unwrap_err();
        assert!(matches!(err, MachineError::NoSuchState { .. }));
    }
}
