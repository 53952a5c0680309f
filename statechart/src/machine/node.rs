//! The built state tree
//!
//! Built once from a machine configuration: a depth-first walk assigns
//! document-order indices, derives global ids, canonicalizes descriptors,
//! lowers delayed transitions and invocations into action pairs, resolves
//! transition targets, and indexes every node by id. Nodes are stored in an
//! arena; a `NodeId` is an index into it, so document-order comparison is
//! integer comparison.

use crate::machine::actions::{Action, ActivityKind, Expr, SendSpec, SendTarget, StartSpec};
use crate::machine::config::{MachineConfig, StateNodeConfig, TransitionConfig};
use crate::machine::events::Event;
use crate::machine::transition::TransitionDescriptor;
use crate::utils::error::{MachineError, MachineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Index of a node in the machine's arena; doubles as its document order.
pub type NodeId = usize;

/// Key under which an implicit history child is synthesized.
pub const HISTORY_KEY: &str = "$history";

/// Kind of a state node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateKind {
    /// Leaf state
    Atomic,
    /// State with children, exactly one active at a time
    Compound,
    /// State whose children are concurrently active regions
    Parallel,
    /// Leaf whose entry raises the parent's done event
    Final,
    /// Pseudo-state recalling the parent's last active descendant
    History,
}

/// Recall depth of a history state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryKind {
    /// Recall the direct child only; descend through initials below it
    Shallow,
    /// Recall the full descendant value
    Deep,
}

/// A node of the built state tree
#[derive(Clone, Debug)]
pub struct StateNode<C> {
    /// Globally unique id, either supplied or derived from the path
    pub id: String,
    /// Local name, unique among siblings
    pub key: String,
    pub parent: Option<NodeId>,
    /// Document-order index; equals the arena index
    pub order: NodeId,
    /// Key sequence from the root (the root itself contributes nothing)
    pub path: Vec<String>,
    pub kind: StateKind,
    /// Initial child key for compound nodes
    pub initial: Option<String>,
    pub history_kind: Option<HistoryKind>,
    /// Resolved default target of a history node
    pub history_default: Vec<NodeId>,
    pub children: Vec<NodeId>,
    /// The history child, when one is declared or synthesized
    pub history_child: Option<NodeId>,
    pub entry: Vec<Action<C>>,
    pub exit: Vec<Action<C>>,
    pub transitions: Vec<TransitionDescriptor<C>>,
    /// Whether any transition answers the null event
    pub transient: bool,
    pub meta: Option<Value>,
    /// Done data of a final node, carried on the raised done event
    pub done_data: Option<Value>,
}

impl<C> StateNode<C> {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The built tree: arena, root, and id index
#[derive(Clone, Debug)]
pub struct StateTree<C> {
    machine_key: String,
    delimiter: String,
    nodes: Vec<StateNode<C>>,
    root: NodeId,
    ids: HashMap<String, NodeId>,
}

impl<C: Clone> StateTree<C> {
    /// Build the tree from a machine configuration, validating as it goes.
    pub fn build(config: &MachineConfig<C>) -> MachineResult<Self> {
        if config.states.is_empty() {
            return Err(MachineError::InvalidConfiguration {
                machine: config.key.clone(),
                id: config.key.clone(),
                reason: "machine must declare at least one state".into(),
            });
        }
        let mut builder = TreeBuilder {
            tree: StateTree {
                machine_key: config.key.clone(),
                delimiter: config.delimiter.clone(),
                nodes: Vec::new(),
                root: 0,
                ids: HashMap::new(),
            },
            pending: Vec::new(),
        };

        let root_config = StateNodeConfig {
            key: config.key.clone(),
            id: None,
            kind: config.kind,
            initial: config.initial.clone(),
            history: None,
            target: None,
            states: config.states.clone(),
            on: config.on.clone(),
            entry: Vec::new(),
            exit: Vec::new(),
            activities: Vec::new(),
            invoke: Vec::new(),
            after: Vec::new(),
            on_done: Vec::new(),
            meta: None,
            data: None,
        };

        let root = builder.alloc(root_config, None, Vec::new())?;
        builder.tree.root = root;

        let pending = std::mem::take(&mut builder.pending);
        for (node, cfg) in pending {
            builder.wire(node, cfg)?;
        }

        Ok(builder.tree)
    }
}

impl<C> StateTree<C> {
    pub fn machine_key(&self) -> &str {
        &self.machine_key
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &StateNode<C> {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StateNode<C>> {
        self.nodes.iter()
    }

    /// Look up a node by global id.
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Look up a node by `#id`, by global id, or by key path from the root.
    pub fn lookup(&self, reference: &str) -> MachineResult<NodeId> {
        let not_found = || MachineError::NoSuchState {
            machine: self.machine_key.clone(),
            id: reference.to_string(),
        };
        if let Some(id) = reference.strip_prefix('#') {
            return self.by_id(id).ok_or_else(not_found);
        }
        if let Some(node) = self.by_id(reference) {
            return Ok(node);
        }
        let segments: Vec<&str> = reference.split(self.delimiter.as_str()).collect();
        let mut current = self.root;
        for segment in segments {
            current = self.child_by_key(current, segment).ok_or_else(not_found)?;
        }
        Ok(current)
    }

    /// Find a direct child by its local key.
    pub fn child_by_key(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].key == key)
    }

    /// Ancestor chain from the node itself up to the root, inclusive.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// True when `ancestor` is `node` or one of its ancestors.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n].parent;
        }
        false
    }

    /// True when `ancestor` is a proper ancestor of `node`.
    pub fn is_proper_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        node != ancestor && self.is_within(node, ancestor)
    }

    /// Least common ancestor of two nodes.
    pub fn lca(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut chain_a = self.ancestors(a);
        let mut chain_b = self.ancestors(b);
        chain_a.reverse();
        chain_b.reverse();
        let mut lca = self.root;
        for (x, y) in chain_a.iter().zip(chain_b.iter()) {
            if x == y {
                lca = *x;
            } else {
                break;
            }
        }
        lca
    }

    /// The child of `parallel` on the ancestor chain of `node`.
    fn region_of(&self, node: NodeId, parallel: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            if parent == parallel {
                return Some(current);
            }
            current = parent;
        }
        None
    }
}

struct TreeBuilder<C> {
    tree: StateTree<C>,
    pending: Vec<(NodeId, StateNodeConfig<C>)>,
}

impl<C: Clone> TreeBuilder<C> {
    fn invalid(&self, id: &str, reason: impl Into<String>) -> MachineError {
        MachineError::InvalidConfiguration {
            machine: self.tree.machine_key.clone(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Allocate nodes depth-first, deriving ids and inferring kinds. The
    /// per-node configuration is parked for the wiring pass, which runs once
    /// every id exists.
    fn alloc(
        &mut self,
        mut config: StateNodeConfig<C>,
        parent: Option<NodeId>,
        path: Vec<String>,
    ) -> MachineResult<NodeId> {
        let id = match (&config.id, parent) {
            (Some(explicit), _) => explicit.clone(),
            (None, None) => self.tree.machine_key.clone(),
            (None, Some(_)) => {
                let mut full = vec![self.tree.machine_key.clone()];
                full.extend(path.iter().cloned());
                full.join(self.tree.delimiter.as_str())
            }
        };

        let kind = match config.kind {
            Some(kind) => kind,
            None if config.history.is_some() => StateKind::History,
            None if !config.states.is_empty() => StateKind::Compound,
            None => StateKind::Atomic,
        };

        match kind {
            StateKind::Compound => {
                if config.states.is_empty() {
                    return Err(self.invalid(&id, "compound state has no children"));
                }
                if config.initial.is_none() {
                    return Err(self.invalid(&id, "compound state must declare an initial child"));
                }
            }
            StateKind::Parallel => {
                if config.initial.is_some() {
                    return Err(self.invalid(&id, "parallel state must not declare an initial child"));
                }
                if config.states.is_empty() {
                    return Err(self.invalid(&id, "parallel state has no regions"));
                }
            }
            StateKind::History => {
                if !config.states.is_empty() {
                    return Err(self.invalid(&id, "history state cannot have children"));
                }
                if !config.on.is_empty() {
                    return Err(self.invalid(&id, "history state cannot declare transitions"));
                }
            }
            StateKind::Atomic | StateKind::Final => {
                if !config.states.is_empty() {
                    return Err(self.invalid(&id, "leaf state cannot have children"));
                }
                if config.initial.is_some() {
                    return Err(self.invalid(&id, "leaf state cannot declare an initial child"));
                }
            }
        }

        let order = self.tree.nodes.len();
        if self.tree.ids.insert(id.clone(), order).is_some() {
            return Err(self.invalid(&id, "duplicate state id"));
        }

        self.tree.nodes.push(StateNode {
            id: id.clone(),
            key: config.key.clone(),
            parent,
            order,
            path: path.clone(),
            kind,
            initial: config.initial.clone(),
            history_kind: config.history.or(match kind {
                StateKind::History => Some(HistoryKind::Shallow),
                _ => None,
            }),
            history_default: Vec::new(),
            children: Vec::new(),
            history_child: None,
            entry: Vec::new(),
            exit: Vec::new(),
            transitions: Vec::new(),
            transient: false,
            meta: config.meta.take(),
            done_data: config.data.take(),
        });

        let children = std::mem::take(&mut config.states);
        let mut seen_keys: Vec<String> = Vec::new();
        for child_config in children {
            if seen_keys.contains(&child_config.key) {
                let key = child_config.key.clone();
                return Err(self.invalid(&id, format!("duplicate child key `{key}`")));
            }
            seen_keys.push(child_config.key.clone());
            let mut child_path = path.clone();
            child_path.push(child_config.key.clone());
            let child = self.alloc(child_config, Some(order), child_path)?;
            self.tree.nodes[order].children.push(child);
        }

        self.pending.push((order, config));
        Ok(order)
    }

    /// Second pass: resolve targets, lower delayed transitions, invocations,
    /// and activities, and install the transition descriptors.
    fn wire(&mut self, node: NodeId, config: StateNodeConfig<C>) -> MachineResult<()> {
        let node_id = self.tree.nodes[node].id.clone();

        // Initial child must exist.
        if let Some(initial_key) = self.tree.nodes[node].initial.clone() {
            if self.tree.child_by_key(node, &initial_key).is_none() {
                return Err(self.invalid(
                    &node_id,
                    format!("initial child `{initial_key}` does not exist"),
                ));
            }
        }

        // At most one history child per state.
        let history_children: Vec<NodeId> = self.tree.nodes[node]
            .children
            .iter()
            .copied()
            .filter(|&c| self.tree.nodes[c].kind == StateKind::History)
            .collect();
        if history_children.len() > 1 {
            return Err(self.invalid(&node_id, "state declares more than one history child"));
        }
        self.tree.nodes[node].history_child = history_children.first().copied();

        // History default target resolves against the owning parent.
        if self.tree.nodes[node].kind == StateKind::History {
            if let Some(raw) = &config.target {
                let target = self.resolve_target(node, raw)?;
                self.tree.nodes[node].history_default = vec![target];
            }
        }

        let mut entry = config.entry;
        let mut exit = config.exit;
        let mut on_list: Vec<TransitionConfig<C>> = config.on;

        // Delayed transitions lower into an entry-scheduled send paired with
        // an exit-scheduled cancel, plus a transition on the synthetic event.
        for after in config.after {
            let name = Event::after_name(&after.delay.label(), &node_id);
            entry.push(Action::Send(SendSpec {
                event: Expr::Value(Event::new(name.clone())),
                to: SendTarget::Internal,
                delay: Some(after.delay.clone()),
                id: Some(name.clone()),
            }));
            exit.push(Action::cancel(name.clone()));
            let mut transition = after.transition;
            transition.event = name;
            on_list.push(transition);
        }

        // Invocations lower into start/stop plus done/error transitions.
        for (index, invoke) in config.invoke.into_iter().enumerate() {
            let id = invoke
                .id
                .unwrap_or_else(|| format!("{node_id}:invocation[{index}]"));
            entry.push(Action::Start(StartSpec {
                id: id.clone(),
                src: invoke.src,
                kind: ActivityKind::Service,
                data: invoke.data,
            }));
            exit.push(Action::Stop(id.clone()));
            if let Some(mut transition) = invoke.on_done {
                transition.event = Event::done_invoke_name(&id);
                on_list.push(transition);
            }
            if let Some(mut transition) = invoke.on_error {
                transition.event = Event::error_invoke_name(&id);
                on_list.push(transition);
            }
        }

        for activity in config.activities {
            let id = activity.id.unwrap_or_else(|| activity.src.clone());
            entry.push(Action::Start(StartSpec {
                id: id.clone(),
                src: activity.src,
                kind: ActivityKind::Activity,
                data: activity.data,
            }));
            exit.push(Action::Stop(id));
        }

        for mut transition in config.on_done {
            transition.event = format!("done.state.{node_id}");
            on_list.push(transition);
        }

        let mut descriptors = Vec::with_capacity(on_list.len());
        let mut transient = false;
        for transition in on_list {
            if transition.event.is_empty() {
                transient = true;
            }
            let mut internal = transition.internal;
            let mut targets = Vec::with_capacity(transition.targets.len());
            for raw in &transition.targets {
                if raw.starts_with(self.tree.delimiter.as_str()) {
                    internal = true;
                }
                let target = self.resolve_target(node, raw)?;
                self.check_regions(node, target, raw)?;
                targets.push(target);
            }
            descriptors.push(TransitionDescriptor {
                event: transition.event,
                source: node,
                targets,
                guard: transition.guard,
                in_state: transition.in_state,
                internal,
                actions: transition.actions,
            });
        }

        let slot = &mut self.tree.nodes[node];
        slot.entry = entry;
        slot.exit = exit;
        slot.transitions = descriptors;
        slot.transient = transient;
        tracing::trace!(state = %node_id, transitions = slot.transitions.len(), "wired state node");
        Ok(())
    }

    /// Resolve a target path from a source node. A `#id` prefix is absolute;
    /// a leading delimiter descends from the source itself; otherwise the
    /// path resolves from the source's parent (siblings first), then from
    /// the source, then as a bare id.
    fn resolve_target(&mut self, source: NodeId, raw: &str) -> MachineResult<NodeId> {
        let source_id = self.tree.nodes[source].id.clone();
        let unresolvable = |builder: &Self| {
            builder.invalid(&source_id, format!("cannot resolve target `{raw}`"))
        };
        if raw.is_empty() {
            return Err(unresolvable(self));
        }
        if let Some(id) = raw.strip_prefix('#') {
            return self.tree.by_id(id).ok_or_else(|| unresolvable(self));
        }
        let delimiter = self.tree.delimiter.clone();
        if let Some(rest) = raw.strip_prefix(delimiter.as_str()) {
            let segments: Vec<String> = rest.split(delimiter.as_str()).map(String::from).collect();
            return self
                .descend(source, &segments)
                .ok_or_else(|| unresolvable(self));
        }
        let segments: Vec<String> = raw.split(delimiter.as_str()).map(String::from).collect();
        let parent = self.tree.nodes[source].parent;
        if let Some(parent) = parent {
            if let Some(found) = self.descend(parent, &segments) {
                return Ok(found);
            }
        }
        if let Some(found) = self.descend(source, &segments) {
            return Ok(found);
        }
        self.tree.by_id(raw).ok_or_else(|| unresolvable(self))
    }

    /// Walk key segments downward. The `$history` segment resolves to the
    /// current node's history child, synthesizing an implicit shallow one
    /// when nothing is declared.
    fn descend(&mut self, from: NodeId, segments: &[String]) -> Option<NodeId> {
        let mut current = from;
        for segment in segments {
            if segment == HISTORY_KEY {
                current = self.ensure_history_child(current);
            } else {
                current = self.tree.child_by_key(current, segment)?;
            }
        }
        Some(current)
    }

    fn ensure_history_child(&mut self, parent: NodeId) -> NodeId {
        if let Some(existing) = self.tree.nodes[parent].history_child {
            return existing;
        }
        // A declared history child may not have been indexed yet when a
        // target referencing `$history` resolves first.
        let declared = self.tree.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&c| self.tree.nodes[c].kind == StateKind::History);
        if let Some(declared) = declared {
            self.tree.nodes[parent].history_child = Some(declared);
            return declared;
        }
        let order = self.tree.nodes.len();
        let parent_node = &self.tree.nodes[parent];
        let id = format!("{}{}{HISTORY_KEY}", parent_node.id, self.tree.delimiter);
        let mut path = parent_node.path.clone();
        path.push(HISTORY_KEY.to_string());
        self.tree.nodes.push(StateNode {
            id: id.clone(),
            key: HISTORY_KEY.to_string(),
            parent: Some(parent),
            order,
            path,
            kind: StateKind::History,
            initial: None,
            history_kind: Some(HistoryKind::Shallow),
            history_default: Vec::new(),
            children: Vec::new(),
            history_child: None,
            entry: Vec::new(),
            exit: Vec::new(),
            transitions: Vec::new(),
            transient: false,
            meta: None,
            done_data: None,
        });
        self.tree.ids.insert(id, order);
        self.tree.nodes[parent].children.push(order);
        self.tree.nodes[parent].history_child = Some(order);
        order
    }

    /// Orthogonal regions may not target each other: a transition sourced
    /// inside one region of a parallel state cannot land in a sibling
    /// region's subtree.
    fn check_regions(&self, source: NodeId, target: NodeId, raw: &str) -> MachineResult<()> {
        for ancestor in self.tree.ancestors(source).into_iter().skip(1) {
            if self.tree.nodes[ancestor].kind != StateKind::Parallel {
                continue;
            }
            if !self.tree.is_proper_descendant(target, ancestor) {
                continue;
            }
            let source_region = self.tree.region_of(source, ancestor);
            let target_region = self.tree.region_of(target, ancestor);
            if source_region != target_region {
                let source_id = &self.tree.nodes[source].id;
                return Err(self.invalid(
                    source_id,
                    format!("target `{raw}` crosses into a sibling orthogonal region"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::config::{MachineConfig, StateNodeConfig};

    type Cfg = MachineConfig<()>;

    fn light() -> Cfg {
        MachineConfig::new("light", ())
            .with_initial("green")
            .state(StateNodeConfig::new("green").on("TIMER", "yellow"))
            .state(StateNodeConfig::new("yellow").on("TIMER", "red"))
            .state(
                StateNodeConfig::new("red")
                    .with_initial("walk")
                    .child(StateNodeConfig::new("walk").on("PED", "wait"))
                    .child(StateNodeConfig::new("wait").on("PED", "stop"))
                    .child(StateNodeConfig::new("stop"))
                    .on("TIMER", "green"),
            )
    }

    #[test]
    fn builds_nodes_in_document_order() {
        let tree = StateTree::build(&light()).unwrap();
        let keys: Vec<_> = tree.nodes().map(|n| n.key.as_str()).collect();
        assert_eq!(
            keys,
            ["light", "green", "yellow", "red", "walk", "wait", "stop"]
        );
    }

    #[test]
    fn derives_ids_from_paths() {
        let tree = StateTree::build(&light()).unwrap();
        assert!(tree.by_id("light.red.walk").is_some());
        assert!(tree.by_id("light.green").is_some());
        assert!(tree.by_id("walk").is_none());
    }

    #[test]
    fn lookup_accepts_hash_ids_and_paths() {
        let tree = StateTree::build(&light()).unwrap();
        let by_path = tree.lookup("red.walk").unwrap();
        let by_id = tree.lookup("#light.red.walk").unwrap();
        assert_eq!(by_path, by_id);
        assert!(matches!(
            tree.lookup("red.run"),
            Err(MachineError::NoSuchState { .. })
        ));
    }

    #[test]
    fn lca_of_siblings_is_the_parent() {
        let tree = StateTree::build(&light()).unwrap();
        let walk = tree.lookup("red.walk").unwrap();
        let wait = tree.lookup("red.wait").unwrap();
        let red = tree.lookup("red").unwrap();
        assert_eq!(tree.lca(walk, wait), red);
        assert_eq!(tree.lca(walk, tree.lookup("green").unwrap()), tree.root());
    }

    #[test]
    fn sibling_targets_resolve_from_the_parent() {
        let tree = StateTree::build(&light()).unwrap();
        let green = tree.lookup("green").unwrap();
        let yellow = tree.lookup("yellow").unwrap();
        assert_eq!(tree.node(green).transitions[0].targets, vec![yellow]);
    }

    #[test]
    fn compound_without_initial_is_rejected() {
        let config: Cfg = MachineConfig::new("m", ())
            .state(StateNodeConfig::new("a").child(StateNodeConfig::new("b")));
        let err = StateTree::build(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn parallel_with_initial_is_rejected() {
        let config: Cfg = MachineConfig::new("m", ()).state(
            StateNodeConfig::parallel("p")
                .with_initial("a")
                .child(StateNodeConfig::new("a"))
                .child(StateNodeConfig::new("b")),
        );
        let err = StateTree::build(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let config: Cfg = MachineConfig::new("m", ())
            .with_initial("a")
            .state(StateNodeConfig::new("a").with_id("same"))
            .state(StateNodeConfig::new("b").with_id("same"));
        let err = StateTree::build(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn unknown_targets_are_rejected_at_construction() {
        let config: Cfg = MachineConfig::new("m", ())
            .with_initial("a")
            .state(StateNodeConfig::new("a").on("GO", "nowhere"));
        let err = StateTree::build(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn cross_region_targets_are_rejected() {
        let config: Cfg = MachineConfig::new("m", ())
            .with_initial("p")
            .state(
                StateNodeConfig::parallel("p")
                    .child(
                        StateNodeConfig::new("a")
                            .with_initial("a1")
                            .child(StateNodeConfig::new("a1").on("X", "#m.p.b.b2"))
                            .child(StateNodeConfig::new("a2")),
                    )
                    .child(
                        StateNodeConfig::new("b")
                            .with_initial("b1")
                            .child(StateNodeConfig::new("b1"))
                            .child(StateNodeConfig::new("b2")),
                    ),
            );
        let err = StateTree::build(&config).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn history_targets_synthesize_an_implicit_child() {
        let config: Cfg = MachineConfig::new("m", ())
            .with_initial("a")
            .state(
                StateNodeConfig::new("a")
                    .with_initial("a1")
                    .child(StateNodeConfig::new("a1"))
                    .on("OUT", "f"),
            )
            .state(StateNodeConfig::new("f").on("BACK", "a.$history"));
        let tree = StateTree::build(&config).unwrap();
        let a = tree.lookup("a").unwrap();
        let history = tree.node(a).history_child.expect("history child");
        assert_eq!(tree.node(history).kind, StateKind::History);
        assert_eq!(tree.node(history).history_kind, Some(HistoryKind::Shallow));
    }

    #[test]
    fn leading_delimiter_targets_descend_from_the_source() {
        let config: Cfg = MachineConfig::new("door", ())
            .with_initial("closed")
            .state(
                StateNodeConfig::new("closed")
                    .with_initial("idle")
                    .child(StateNodeConfig::new("idle"))
                    .child(StateNodeConfig::new("error"))
                    .on("OPEN", ".error"),
            );
        let tree = StateTree::build(&config).unwrap();
        let closed = tree.lookup("closed").unwrap();
        let error = tree.lookup("closed.error").unwrap();
        let descriptor = &tree.node(closed).transitions[0];
        assert_eq!(descriptor.targets, vec![error]);
        assert!(descriptor.internal);
    }
}
