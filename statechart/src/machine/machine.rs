//! The machine object
//!
//! A machine bundles the built state tree with the options registries, the
//! initial context, and per-machine settings. It is immutable after
//! construction; `with_context` and `with_config` return reconfigured
//! clones with fresh caches.

use crate::machine::config::MachineConfig;
use crate::machine::events::{NULL_EVENT, WILDCARD_EVENT};
use crate::machine::node::{NodeId, StateNode, StateTree};
use crate::machine::options::MachineOptions;
use crate::utils::error::MachineResult;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// A built, immutable state machine
pub struct Machine<C> {
    key: String,
    delimiter: String,
    strict: bool,
    max_microsteps: usize,
    context: C,
    tree: StateTree<C>,
    options: MachineOptions<C>,
    alphabet: OnceLock<BTreeSet<String>>,
}

impl<C: Clone + PartialEq + 'static> Machine<C> {
    /// Build a machine from its configuration, validating the state tree.
    pub fn new(config: MachineConfig<C>) -> MachineResult<Self> {
        Self::new_with_options(config, MachineOptions::new())
    }

    /// Build a machine with options registries for named guards, actions,
    /// delays, services, and activities.
    pub fn new_with_options(
        config: MachineConfig<C>,
        options: MachineOptions<C>,
    ) -> MachineResult<Self> {
        let tree = StateTree::build(&config)?;
        Ok(Self {
            key: config.key,
            delimiter: config.delimiter,
            strict: config.strict,
            max_microsteps: config.max_microsteps,
            context: config.context,
            tree,
            options,
            alphabet: OnceLock::new(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The initial extended context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// A clone of this machine starting from a different context. Lazy
    /// caches start cold on the clone.
    pub fn with_context(&self, context: C) -> Self {
        Self {
            key: self.key.clone(),
            delimiter: self.delimiter.clone(),
            strict: self.strict,
            max_microsteps: self.max_microsteps,
            context,
            tree: self.tree.clone(),
            options: self.options.clone(),
            alphabet: OnceLock::new(),
        }
    }

    /// A clone of this machine with `options` overlaid on the existing
    /// registries. Lazy caches start cold on the clone.
    pub fn with_config(&self, options: MachineOptions<C>) -> Self {
        Self {
            key: self.key.clone(),
            delimiter: self.delimiter.clone(),
            strict: self.strict,
            max_microsteps: self.max_microsteps,
            context: self.context.clone(),
            tree: self.tree.clone(),
            options: self.options.clone().merge(options),
            alphabet: OnceLock::new(),
        }
    }

    /// Ids of every state node, in document order.
    pub fn state_ids(&self) -> Vec<&str> {
        self.tree.nodes().map(|n| n.id.as_str()).collect()
    }

    /// The machine's event alphabet: every event name any transition
    /// answers to, including the wildcard. Computed once per machine.
    pub fn events(&self) -> &BTreeSet<String> {
        self.alphabet.get_or_init(|| {
            self.tree
                .nodes()
                .flat_map(|n| n.transitions.iter())
                .map(|t| t.event.clone())
                .filter(|name| name != NULL_EVENT)
                .collect()
        })
    }

    /// Whether a strict machine accepts `event_name`.
    pub(crate) fn accepts(&self, event_name: &str) -> bool {
        let alphabet = self.events();
        alphabet.contains(WILDCARD_EVENT) || alphabet.contains(event_name)
    }

    /// Look up a state node by `#id`, id, or key path.
    pub fn state_node(&self, reference: &str) -> MachineResult<&StateNode<C>> {
        let node = self.tree.lookup(reference)?;
        Ok(self.tree.node(node))
    }

    pub(crate) fn tree(&self) -> &StateTree<C> {
        &self.tree
    }

    pub(crate) fn options(&self) -> &MachineOptions<C> {
        &self.options
    }

    pub(crate) fn max_microsteps(&self) -> usize {
        self.max_microsteps
    }

    pub(crate) fn configuration_ids(&self, set: &BTreeSet<NodeId>) -> Vec<String> {
        set.iter().map(|&n| self.tree.node(n).id.clone()).collect()
    }
}

impl<C: Clone + PartialEq + 'static> Clone for Machine<C> {
    fn clone(&self) -> Self {
        self.with_context(self.context.clone())
    }
}

impl<C> std::fmt::Debug for Machine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("key", &self.key)
            .field("strict", &self.strict)
            .field("states", &self.tree.len())
            .finish()
    }
}
