//! The transition engine
//!
//! One call to `transition` runs a full macrostep: select transitions for
//! the event, compute exit and entry sets, fold actions, apply assigns, and
//! drain raised and null events until the machine is quiescent. The engine
//! is a pure synchronous function; delayed sends and workers are emitted as
//! resolved effects for the runtime to execute.

use crate::machine::actions::{Action, ActivityKind, Delay, Effect, SendTarget};
use crate::machine::events::Event;
use crate::machine::guards::Guard;
use crate::machine::history::{shallow_keys, HistoryValue};
use crate::machine::machine::Machine;
use crate::machine::node::{NodeId, StateKind};
use crate::machine::state::State;
use crate::machine::states::StateValue;
use crate::machine::transition::candidate_indices;
use crate::utils::error::{MachineError, MachineResult};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Mutable bookkeeping for one macrostep
struct Working<C> {
    value: StateValue,
    config: BTreeSet<NodeId>,
    context: C,
    history: HistoryValue,
    activities: BTreeMap<String, bool>,
    effects: Vec<Effect>,
    queue: VecDeque<Event>,
    any_assign: bool,
    done: bool,
}

impl<C: Clone + PartialEq + 'static> Machine<C> {
    /// The machine's starting state: full initial descent from the root,
    /// with entry actions resolved and transient transitions drained.
    pub fn initial_state(&self) -> MachineResult<State<C>> {
        let event = Event::init();
        let mut config = BTreeSet::new();
        config.insert(self.tree().root());
        self.tree().complete_config(&mut config)?;

        let mut working = Working {
            value: self.tree().value_from_config(&config),
            config: config.clone(),
            context: self.context().clone(),
            history: HistoryValue::new(),
            activities: BTreeMap::new(),
            effects: Vec::new(),
            queue: VecDeque::new(),
            any_assign: false,
            done: false,
        };

        let entered: Vec<NodeId> = config.iter().copied().collect();
        for &node in &entered {
            let actions = &self.tree().node(node).entry;
            self.resolve_actions(&mut working, actions, node, &event)?;
        }
        self.raise_done_events(&mut working, &entered, &BTreeSet::new(), &event)?;

        let want_null = self.has_transient(&working.config);
        self.run_to_quiescence(&mut working, &event, want_null)?;

        Ok(self.snapshot(working, event, None, false))
    }

    /// Compute the next state for an event. Pure: the given state is not
    /// touched, and equal inputs produce structurally equal outputs.
    pub fn transition(&self, state: &State<C>, event: impl Into<Event>) -> MachineResult<State<C>> {
        let event: Event = event.into();
        if self.is_strict() && !event.is_null() && !self.accepts(&event.name) {
            return Err(MachineError::UnhandledEvent {
                machine: self.key().to_string(),
                event: event.name,
            });
        }

        let (value, config) = self.tree().resolve_value(&state.value)?;
        let before_value = value.clone();
        let mut working = Working {
            value,
            config,
            context: state.context.clone(),
            history: state.history.clone(),
            activities: state.activities.clone(),
            effects: Vec::new(),
            queue: VecDeque::from([event.clone()]),
            any_assign: false,
            done: state.done,
        };

        let any_fired = self.run_to_quiescence(&mut working, &event, false)?;
        if !any_fired {
            return Ok(self.snapshot(working, event, Some(state), false));
        }

        let changed = working.any_assign
            || working.value != before_value
            || working.context != state.context;
        Ok(self.snapshot(working, event, Some(state), changed))
    }

    /// Complete a partial state value against the tree and wrap it in a
    /// state object carrying no actions.
    pub fn resolve_state(&self, value: impl Into<StateValue>) -> MachineResult<State<C>> {
        let (value, config) = self.tree().resolve_value(&value.into())?;
        let done = self.tree().is_done(self.tree().root(), &config);
        Ok(State {
            value,
            context: self.context().clone(),
            actions: Vec::new(),
            activities: BTreeMap::new(),
            configuration: self.configuration_ids(&config),
            history: HistoryValue::new(),
            meta: self.collect_meta(&config),
            event: Event::init(),
            previous: None,
            changed: false,
            done,
        })
    }

    fn snapshot(
        &self,
        working: Working<C>,
        event: Event,
        previous: Option<&State<C>>,
        changed: bool,
    ) -> State<C> {
        State {
            configuration: self.configuration_ids(&working.config),
            meta: self.collect_meta(&working.config),
            value: working.value,
            context: working.context,
            actions: working.effects,
            activities: working.activities,
            history: working.history,
            event,
            previous: previous.map(|p| Box::new(p.without_previous())),
            changed,
            done: working.done,
        }
    }

    /// Process the queued event plus everything it raises, feeding null
    /// events while any active node is transient, until nothing more fires.
    fn run_to_quiescence(
        &self,
        working: &mut Working<C>,
        external: &Event,
        mut want_null: bool,
    ) -> MachineResult<bool> {
        let mut any_fired = false;
        let mut steps = 0usize;
        loop {
            let event = match working.queue.pop_front() {
                Some(event) => event,
                None if want_null => {
                    want_null = false;
                    Event::null()
                }
                None => break,
            };
            steps += 1;
            if steps > self.max_microsteps() {
                return Err(MachineError::TransientLoop {
                    machine: self.key().to_string(),
                    event: external.name.clone(),
                    limit: self.max_microsteps(),
                });
            }
            let fired = self.microstep(working, &event)?;
            any_fired |= fired;
            if fired && self.has_transient(&working.config) {
                want_null = true;
            }
        }
        Ok(any_fired)
    }

    fn has_transient(&self, config: &BTreeSet<NodeId>) -> bool {
        config.iter().any(|&n| self.tree().node(n).transient)
    }

    /// Apply one selected transition set: compute the new configuration,
    /// run exit, transition, and entry actions, record history, and raise
    /// done events. Returns whether anything fired.
    fn microstep(&self, working: &mut Working<C>, event: &Event) -> MachineResult<bool> {
        let selected = self.select_transitions(working, event)?;
        if selected.is_empty() {
            return Ok(false);
        }
        tracing::debug!(
            machine = self.key(),
            event = %event,
            transitions = selected.len(),
            "microstep"
        );

        let prev_config = working.config.clone();
        let prev_value = working.value.clone();

        // Tentative configuration: clear each transition's domain, then
        // enter the targets with their ancestral closure.
        let mut next_config = working.config.clone();
        let mut targeted: Vec<(NodeId, usize, NodeId)> = Vec::new();
        for &(source, index) in &selected {
            let descriptor = &self.tree().node(source).transitions[index];
            if descriptor.is_targetless() {
                continue;
            }
            let domain = self.domain_of(source, index);
            next_config.retain(|&n| !self.tree().is_proper_descendant(n, domain));
            targeted.push((source, index, domain));
        }
        for &(source, index, _domain) in &targeted {
            let descriptor = &self.tree().node(source).transitions[index];
            for &target in &descriptor.targets {
                self.enter_target(&mut next_config, target, &working.history)?;
            }
        }
        self.tree().complete_config(&mut next_config)?;

        let exit_set: Vec<NodeId> = prev_config.difference(&next_config).copied().collect();
        let entry_set: Vec<NodeId> = next_config.difference(&prev_config).copied().collect();

        // Record exited subtrees into their history slots before anything
        // else observes the new value.
        for &node in &exit_set {
            let exited = self.tree().node(node);
            if exited.history_child.is_none() {
                continue;
            }
            if let Some(sub) = prev_value.at_path(&exited.path) {
                working.history.record(exited.id.clone(), sub.clone());
            }
        }

        // Exit deepest-first, then transition actions in document order,
        // then enter shallowest-first.
        for &node in exit_set.iter().rev() {
            let actions = &self.tree().node(node).exit;
            self.resolve_actions(working, actions, node, event)?;
        }
        for &(source, index) in &selected {
            let actions = &self.tree().node(source).transitions[index].actions;
            self.resolve_actions(working, actions, source, event)?;
        }
        for &node in &entry_set {
            let actions = &self.tree().node(node).entry;
            self.resolve_actions(working, actions, node, event)?;
        }

        working.config = next_config;
        working.value = self.tree().value_from_config(&working.config);
        self.raise_done_events(working, &entry_set, &prev_config, event)?;

        Ok(true)
    }

    /// The node whose descendants a transition replaces. Internal
    /// transitions keep their source active; everything else clears down
    /// from the least common ancestor of source and targets.
    fn domain_of(&self, source: NodeId, index: usize) -> NodeId {
        let descriptor = &self.tree().node(source).transitions[index];
        let all_within_source = descriptor
            .targets
            .iter()
            .all(|&t| self.tree().is_within(t, source));
        if descriptor.internal && all_within_source {
            return source;
        }
        let mut domain = self.tree().lca(source, descriptor.targets[0]);
        for &target in &descriptor.targets[1..] {
            domain = self.tree().lca(domain, target);
        }
        domain
    }

    /// Insert a target and its ancestors into the configuration. History
    /// targets recall the recorded value, fall back to their default
    /// target, and otherwise leave the descent to the initial completion.
    fn enter_target(
        &self,
        config: &mut BTreeSet<NodeId>,
        target: NodeId,
        history: &HistoryValue,
    ) -> MachineResult<()> {
        let node = self.tree().node(target);
        if node.kind != StateKind::History {
            self.insert_with_ancestors(config, target);
            return Ok(());
        }

        let parent = node.parent.expect("history states are never the root");
        self.insert_with_ancestors(config, parent);
        match history.get(&self.tree().node(parent).id) {
            Some(recorded) => match node.history_kind {
                Some(crate::machine::node::HistoryKind::Deep) => {
                    self.tree().config_from_subvalue(parent, recorded, config)?;
                }
                _ => {
                    for key in shallow_keys(recorded) {
                        if let Some(child) = self.tree().child_by_key(parent, &key) {
                            config.insert(child);
                        }
                    }
                }
            },
            None => {
                if let Some(&default) = node.history_default.first() {
                    self.insert_with_ancestors(config, default);
                }
            }
        }
        Ok(())
    }

    fn insert_with_ancestors(&self, config: &mut BTreeSet<NodeId>, node: NodeId) {
        for ancestor in self.tree().ancestors(node) {
            config.insert(ancestor);
        }
    }

    /// Raise `done.state.*` events for parents whose final child was
    /// entered, cascading through parallel ancestors whose every region is
    /// now done, and flag machine completion at the root.
    fn raise_done_events(
        &self,
        working: &mut Working<C>,
        entered: &[NodeId],
        prev_config: &BTreeSet<NodeId>,
        event: &Event,
    ) -> MachineResult<()> {
        let root = self.tree().root();
        let mut already_raised: BTreeSet<String> = BTreeSet::new();
        for &node in entered {
            if self.tree().node(node).kind != StateKind::Final {
                continue;
            }
            let Some(parent) = self.tree().node(node).parent else {
                continue;
            };
            let parent_node = self.tree().node(parent);
            if parent_node.kind == StateKind::Compound
                && parent != root
                && already_raised.insert(parent_node.id.clone())
            {
                let payload = self.tree().node(node).done_data.clone();
                working
                    .queue
                    .push_back(Event::done_state(&parent_node.id, payload).raised_from(event));
            }
            for &ancestor in self.tree().ancestors(parent).iter().skip(1) {
                let ancestor_node = self.tree().node(ancestor);
                if ancestor_node.kind != StateKind::Parallel {
                    continue;
                }
                if self.tree().is_done(ancestor, &working.config)
                    && !self.tree().is_done(ancestor, prev_config)
                    && ancestor != root
                    && already_raised.insert(ancestor_node.id.clone())
                {
                    working
                        .queue
                        .push_back(Event::done_state(&ancestor_node.id, None).raised_from(event));
                }
            }
        }
        if self.tree().is_done(root, &working.config) {
            working.done = true;
        }
        Ok(())
    }

    /// Enumerate the transitions selected for an event, innermost nodes
    /// first. A selection at a descendant stops the event from bubbling to
    /// its ancestors; orthogonal regions select independently.
    fn select_transitions(
        &self,
        working: &Working<C>,
        event: &Event,
    ) -> MachineResult<Vec<(NodeId, usize)>> {
        let mut selected = Vec::new();
        let root = self.tree().root();
        self.select_in(root, &working.value, working, event, &mut selected)?;
        selected.sort_unstable();
        Ok(selected)
    }

    fn select_in(
        &self,
        node: NodeId,
        sub: &StateValue,
        working: &Working<C>,
        event: &Event,
        selected: &mut Vec<(NodeId, usize)>,
    ) -> MachineResult<bool> {
        let picked_below = match sub {
            StateValue::Simple(key) => {
                let child = self.active_child_of(node, key)?;
                self.try_node(child, working, event, selected)?
            }
            StateValue::Compound(map) => {
                let mut any = false;
                for (key, nested) in map {
                    let child = self.active_child_of(node, key)?;
                    let leaf = matches!(nested, StateValue::Compound(m) if m.is_empty());
                    let picked = if leaf {
                        self.try_node(child, working, event, selected)?
                    } else {
                        self.select_in(child, nested, working, event, selected)?
                    };
                    any |= picked;
                }
                any
            }
        };
        if picked_below {
            return Ok(true);
        }
        self.try_node(node, working, event, selected)
    }

    fn active_child_of(&self, node: NodeId, key: &str) -> MachineResult<NodeId> {
        self.tree()
            .child_by_key(node, key)
            .ok_or_else(|| MachineError::NoSuchState {
                machine: self.key().to_string(),
                id: {
                    let mut path = self.tree().node(node).path.clone();
                    path.push(key.to_string());
                    path.join(self.delimiter())
                },
            })
    }

    /// First candidate at this node whose in-state predicate and guard both
    /// pass wins; insertion order breaks ties, wildcards come last.
    fn try_node(
        &self,
        node: NodeId,
        working: &Working<C>,
        event: &Event,
        selected: &mut Vec<(NodeId, usize)>,
    ) -> MachineResult<bool> {
        let transitions = &self.tree().node(node).transitions;
        for index in candidate_indices(transitions, &event.name) {
            let descriptor = &transitions[index];
            if let Some(predicate) = &descriptor.in_state {
                if !self.in_state_holds(working, predicate)? {
                    continue;
                }
            }
            if let Some(guard) = &descriptor.guard {
                if !self.eval_guard(guard, node, working, event)? {
                    continue;
                }
            }
            selected.push((node, index));
            return Ok(true);
        }
        Ok(false)
    }

    fn in_state_holds(&self, working: &Working<C>, predicate: &str) -> MachineResult<bool> {
        if let Some(id) = predicate.strip_prefix('#') {
            let node = self
                .tree()
                .by_id(id)
                .ok_or_else(|| MachineError::NoSuchState {
                    machine: self.key().to_string(),
                    id: predicate.to_string(),
                })?;
            return Ok(working.config.contains(&node));
        }
        Ok(working.value.matches(predicate, self.delimiter()))
    }

    fn eval_guard(
        &self,
        guard: &Guard<C>,
        source: NodeId,
        working: &Working<C>,
        event: &Event,
    ) -> MachineResult<bool> {
        let source_id = || self.tree().node(source).id.clone();
        let predicate = match guard {
            Guard::Inline(f) => f.clone(),
            Guard::Named(name) => self.options().guards.get(name).cloned().ok_or_else(|| {
                MachineError::UnknownGuard {
                    name: name.clone(),
                    state: source_id(),
                    event: event.name.clone(),
                }
            })?,
        };
        trap(|| predicate(&working.context, event)).map_err(|message| {
            MachineError::GuardFailure {
                state: source_id(),
                event: event.name.clone(),
                message,
            }
        })
    }

    /// Fold a descriptor list into the working state: assigns update the
    /// context eagerly, raises and internal sends join the queue, and
    /// everything else resolves to an effect.
    fn resolve_actions(
        &self,
        working: &mut Working<C>,
        actions: &[Action<C>],
        source: NodeId,
        event: &Event,
    ) -> MachineResult<()> {
        for action in actions {
            self.resolve_action(working, action, source, event)?;
        }
        Ok(())
    }

    fn resolve_action(
        &self,
        working: &mut Working<C>,
        action: &Action<C>,
        source: NodeId,
        event: &Event,
    ) -> MachineResult<()> {
        let source_id = || self.tree().node(source).id.clone();
        let action_failure = |message: String| MachineError::ActionFailure {
            state: self.tree().node(source).id.clone(),
            event: event.name.clone(),
            message,
        };
        match action {
            Action::Assign(assign) => {
                let next = trap(|| assign(&working.context, event)).map_err(|message| {
                    MachineError::AssignFailure {
                        state: source_id(),
                        event: event.name.clone(),
                        message,
                    }
                })?;
                working.context = next;
                working.any_assign = true;
            }
            Action::Raise(raised) => {
                working.queue.push_back(raised.clone().raised_from(event));
            }
            Action::Send(spec) => {
                let resolved =
                    trap(|| spec.event.resolve(&working.context, event)).map_err(action_failure)?;
                let delay_ms = match &spec.delay {
                    None => None,
                    Some(Delay::Ms(ms)) => Some(*ms),
                    Some(Delay::Named(name)) => {
                        let delay_fn = self.options().delays.get(name).ok_or_else(|| {
                            MachineError::UnknownDelay {
                                name: name.clone(),
                                state: source_id(),
                                event: event.name.clone(),
                            }
                        })?;
                        Some(
                            trap(|| delay_fn(&working.context, event)).map_err(action_failure)?,
                        )
                    }
                };
                if spec.to == SendTarget::Internal && delay_ms.is_none() {
                    working.queue.push_back(resolved.raised_from(event));
                } else {
                    let id = spec
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("{}:{}", source_id(), resolved.name));
                    working.effects.push(Effect::Send {
                        id,
                        event: resolved,
                        to: spec.to.clone(),
                        delay_ms,
                    });
                }
            }
            Action::Log(spec) => {
                let message =
                    trap(|| spec.message.resolve(&working.context, event)).map_err(action_failure)?;
                match &spec.label {
                    Some(label) => tracing::info!(target: "statechart", label = %label, "{message}"),
                    None => tracing::info!(target: "statechart", "{message}"),
                }
                working.effects.push(Effect::Log {
                    label: spec.label.clone(),
                    message,
                });
            }
            Action::Pure(expand) => {
                let expanded =
                    trap(|| expand(&working.context, event)).map_err(action_failure)?;
                self.resolve_actions(working, &expanded, source, event)?;
            }
            Action::Start(spec) => {
                let definition = match spec.kind {
                    ActivityKind::Service => self.options().services.get(&spec.src).ok_or_else(
                        || MachineError::UnknownService {
                            name: spec.src.clone(),
                            state: source_id(),
                        },
                    )?,
                    ActivityKind::Activity => self.options().activities.get(&spec.src).ok_or_else(
                        || MachineError::UnknownActivity {
                            name: spec.src.clone(),
                            state: source_id(),
                        },
                    )?,
                };
                let data = match &spec.data {
                    Some(expr) => Some(
                        trap(|| expr.resolve(&working.context, event)).map_err(action_failure)?,
                    ),
                    None => None,
                };
                working.activities.insert(spec.id.clone(), true);
                working.effects.push(Effect::Start {
                    id: spec.id.clone(),
                    src: definition.src.clone(),
                    kind: spec.kind,
                    data,
                });
            }
            Action::Stop(id) => {
                working.activities.insert(id.clone(), false);
                working.effects.push(Effect::Stop { id: id.clone() });
            }
            Action::Cancel(id) => {
                working.effects.push(Effect::Cancel { id: id.clone() });
            }
            Action::Named(name) => {
                let resolved = self.options().actions.get(name).cloned().ok_or_else(|| {
                    MachineError::UnknownAction {
                        name: name.clone(),
                        state: source_id(),
                        event: event.name.clone(),
                    }
                })?;
                self.resolve_action(working, &resolved, source, event)?;
            }
            Action::Custom { kind, data } => {
                tracing::warn!(
                    target: "statechart",
                    kind = %kind,
                    state = %source_id(),
                    "forwarding unknown action kind to the host"
                );
                working.effects.push(Effect::Custom {
                    kind: kind.clone(),
                    data: data.clone(),
                });
            }
        }
        Ok(())
    }

    fn collect_meta(&self, config: &BTreeSet<NodeId>) -> BTreeMap<String, Value> {
        let mut meta = BTreeMap::new();
        for &node in config {
            let state = self.tree().node(node);
            if let Some(value) = &state.meta {
                meta.insert(state.id.clone(), value.clone());
            }
        }
        meta
    }
}

/// Run user code, converting a panic into an error message instead of
/// unwinding through the engine.
fn trap<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)).map_err(|panic| {
        if let Some(text) = panic.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = panic.downcast_ref::<String>() {
            text.clone()
        } else {
            "user code panicked".to_string()
        }
    })
}
