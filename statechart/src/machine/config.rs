//! Machine definition values
//!
//! A machine is consumed as an already-parsed configuration value: plain
//! structs with chainable constructors. Child and transition lists are
//! ordered because document order is significant for tie-breaking and for
//! exit/entry ordering.

use crate::machine::actions::{Action, Delay, Expr};
use crate::machine::guards::Guard;
use crate::machine::node::{HistoryKind, StateKind};
use serde_json::Value;

/// Default bound on raised/null event chains within one transition call.
pub const DEFAULT_MAX_MICROSTEPS: usize = 100;

/// A transition entry in a state's `on` list
#[derive(Debug, Clone)]
pub struct TransitionConfig<C> {
    /// Event name this transition answers to; empty for the null event,
    /// `*` for the wildcard
    pub event: String,
    /// Target paths; empty for an action-only transition
    pub targets: Vec<String>,
    pub guard: Option<Guard<C>>,
    /// Extra predicate: fire only while this state value or `#id` is active
    pub in_state: Option<String>,
    /// Fire without exiting the source state
    pub internal: bool,
    pub actions: Vec<Action<C>>,
}

impl<C> TransitionConfig<C> {
    /// Transition on `event` towards a single target.
    pub fn new(event: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            targets: vec![target.into()],
            guard: None,
            in_state: None,
            internal: false,
            actions: Vec::new(),
        }
    }

    /// Action-only transition with no target.
    pub fn targetless(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            targets: Vec::new(),
            guard: None,
            in_state: None,
            internal: false,
            actions: Vec::new(),
        }
    }

    /// Transition towards several targets (regions of a parallel state).
    pub fn to_many(event: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            event: event.into(),
            targets,
            guard: None,
            in_state: None,
            internal: false,
            actions: Vec::new(),
        }
    }

    /// Null-event transition, taken immediately when its guard passes.
    pub fn transient(target: impl Into<String>) -> Self {
        Self::new("", target)
    }

    pub fn guarded(mut self, guard: Guard<C>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Attach an inline guard.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C, &crate::machine::events::Event) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(Guard::check(predicate));
        self
    }

    /// Fire only while `value` (a state value prefix or `#id`) is active.
    pub fn in_state(mut self, value: impl Into<String>) -> Self {
        self.in_state = Some(value.into());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn action(mut self, action: Action<C>) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: Vec<Action<C>>) -> Self {
        self.actions.extend(actions);
        self
    }
}

/// An invocation owned by a state: started on entry, stopped on exit
#[derive(Debug, Clone)]
pub struct InvokeConfig<C> {
    /// Name resolved against the services registry
    pub src: String,
    /// Identifier for the running invocation; derived when omitted
    pub id: Option<String>,
    pub on_done: Option<TransitionConfig<C>>,
    pub on_error: Option<TransitionConfig<C>>,
    /// Input handed to the service when it starts
    pub data: Option<Expr<C, Value>>,
}

impl<C> InvokeConfig<C> {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            id: None,
            on_done: None,
            on_error: None,
            data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn on_done(mut self, transition: TransitionConfig<C>) -> Self {
        self.on_done = Some(transition);
        self
    }

    pub fn on_error(mut self, transition: TransitionConfig<C>) -> Self {
        self.on_error = Some(transition);
        self
    }

    pub fn with_data(mut self, data: Expr<C, Value>) -> Self {
        self.data = Some(data);
        self
    }
}

/// A long-running activity owned by a state
#[derive(Debug, Clone)]
pub struct ActivityConfig<C> {
    /// Name resolved against the activities registry
    pub src: String,
    pub id: Option<String>,
    pub data: Option<Expr<C, Value>>,
}

impl<C> ActivityConfig<C> {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            id: None,
            data: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A delayed transition, lowered into a send/cancel pair by the builder
#[derive(Debug, Clone)]
pub struct AfterConfig<C> {
    pub delay: Delay,
    pub transition: TransitionConfig<C>,
}

/// Declarative definition of one state node
#[derive(Debug, Clone)]
pub struct StateNodeConfig<C> {
    /// Local name, unique among siblings
    pub key: String,
    /// Explicit global id; derived from the path when omitted
    pub id: Option<String>,
    /// Explicit kind; inferred from the other fields when omitted
    pub kind: Option<StateKind>,
    /// Initial child key, required for compound states
    pub initial: Option<String>,
    /// Recall depth for history states
    pub history: Option<HistoryKind>,
    /// Default target for history states with no recorded value
    pub target: Option<String>,
    pub states: Vec<StateNodeConfig<C>>,
    pub on: Vec<TransitionConfig<C>>,
    pub entry: Vec<Action<C>>,
    pub exit: Vec<Action<C>>,
    pub activities: Vec<ActivityConfig<C>>,
    pub invoke: Vec<InvokeConfig<C>>,
    pub after: Vec<AfterConfig<C>>,
    /// Transitions taken when this state's final child is reached
    pub on_done: Vec<TransitionConfig<C>>,
    pub meta: Option<Value>,
    /// Done data for final states, carried on the raised done event
    pub data: Option<Value>,
}

impl<C> StateNodeConfig<C> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: None,
            kind: None,
            initial: None,
            history: None,
            target: None,
            states: Vec::new(),
            on: Vec::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            activities: Vec::new(),
            invoke: Vec::new(),
            after: Vec::new(),
            on_done: Vec::new(),
            meta: None,
            data: None,
        }
    }

    /// A state whose children run as orthogonal regions.
    pub fn parallel(key: impl Into<String>) -> Self {
        Self::new(key).with_kind(StateKind::Parallel)
    }

    /// A final state; entering it raises the parent's done event.
    pub fn final_state(key: impl Into<String>) -> Self {
        Self::new(key).with_kind(StateKind::Final)
    }

    /// A history pseudo-state recalling the parent's last descendant.
    pub fn history(key: impl Into<String>, kind: HistoryKind) -> Self {
        let mut node = Self::new(key).with_kind(StateKind::History);
        node.history = Some(kind);
        node
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: StateKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_initial(mut self, child_key: impl Into<String>) -> Self {
        self.initial = Some(child_key.into());
        self
    }

    /// Default target used when this history state has nothing recorded.
    pub fn with_history_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn child(mut self, child: StateNodeConfig<C>) -> Self {
        self.states.push(child);
        self
    }

    /// Shorthand for a plain event-to-target transition.
    pub fn on(mut self, event: impl Into<String>, target: impl Into<String>) -> Self {
        self.on.push(TransitionConfig::new(event, target));
        self
    }

    pub fn on_transition(mut self, transition: TransitionConfig<C>) -> Self {
        self.on.push(transition);
        self
    }

    pub fn with_entry(mut self, action: Action<C>) -> Self {
        self.entry.push(action);
        self
    }

    pub fn with_exit(mut self, action: Action<C>) -> Self {
        self.exit.push(action);
        self
    }

    pub fn with_activity(mut self, activity: ActivityConfig<C>) -> Self {
        self.activities.push(activity);
        self
    }

    pub fn with_invoke(mut self, invoke: InvokeConfig<C>) -> Self {
        self.invoke.push(invoke);
        self
    }

    /// Transition taken after `delay` spent in this state.
    pub fn after(mut self, delay: Delay, transition: TransitionConfig<C>) -> Self {
        self.after.push(AfterConfig { delay, transition });
        self
    }

    /// Transition taken when this state's final child is reached.
    pub fn on_done(mut self, transition: TransitionConfig<C>) -> Self {
        self.on_done.push(transition);
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Declarative definition of a whole machine
#[derive(Debug, Clone)]
pub struct MachineConfig<C> {
    /// Machine key; prefixes derived state ids
    pub key: String,
    /// Path delimiter for ids, targets, and the text form
    pub delimiter: String,
    /// Reject events outside the machine's alphabet
    pub strict: bool,
    /// Initial extended context
    pub context: C,
    /// Kind of the root; `Parallel` makes the top-level states regions
    pub kind: Option<StateKind>,
    pub initial: Option<String>,
    pub states: Vec<StateNodeConfig<C>>,
    /// Machine-level transitions, consulted after all active states
    pub on: Vec<TransitionConfig<C>>,
    /// Bound on raised/null event chains within one transition call
    pub max_microsteps: usize,
}

impl<C> MachineConfig<C> {
    pub fn new(key: impl Into<String>, context: C) -> Self {
        Self {
            key: key.into(),
            delimiter: crate::machine::states::DEFAULT_DELIMITER.to_string(),
            strict: false,
            context,
            kind: None,
            initial: None,
            states: Vec::new(),
            on: Vec::new(),
            max_microsteps: DEFAULT_MAX_MICROSTEPS,
        }
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_kind(mut self, kind: StateKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_initial(mut self, child_key: impl Into<String>) -> Self {
        self.initial = Some(child_key.into());
        self
    }

    pub fn state(mut self, state: StateNodeConfig<C>) -> Self {
        self.states.push(state);
        self
    }

    pub fn on_transition(mut self, transition: TransitionConfig<C>) -> Self {
        self.on.push(transition);
        self
    }

    pub fn with_max_microsteps(mut self, bound: usize) -> Self {
        self.max_microsteps = bound;
        self
    }
}
