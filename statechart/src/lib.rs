//! # Statechart - a hierarchical state machine interpreter core
//!
//! A pure transition engine for Harel statecharts: compound states,
//! orthogonal (parallel) regions, history pseudo-states, guarded
//! transitions, internal transitions, raised events, and run-to-completion
//! processing. The engine computes, for a `(state, event)` input, the next
//! immutable [`State`] together with the ordered side effects the runtime
//! must execute. It never runs timers or workers itself; delayed sends and
//! invocations are emitted as resolved [`Effect`]s.
//!
//! ## Quick start
//!
//! ```rust
//! use statechart::{Machine, MachineConfig, StateNodeConfig};
//!
//! let machine = Machine::new(
//!     MachineConfig::new("light", ())
//!         .with_initial("green")
//!         .state(StateNodeConfig::new("green").on("TIMER", "yellow"))
//!         .state(StateNodeConfig::new("yellow").on("TIMER", "red"))
//!         .state(StateNodeConfig::new("red").on("TIMER", "green")),
//! )
//! .unwrap();
//!
//! let state = machine.initial_state().unwrap();
//! let state = machine.transition(&state, "TIMER").unwrap();
//! assert!(state.matches("yellow"));
//! ```
//!
//! ## Context and guards
//!
//! The extended context is any `Clone + PartialEq` value threaded through
//! guards, assigns, and expressions. Assigns never mutate: each produces
//! the next context, and observers see the post-microstep result.
//!
//! ```rust
//! use statechart::{Action, Machine, MachineConfig, StateNodeConfig, TransitionConfig};
//!
//! #[derive(Clone, Debug, PartialEq, Default)]
//! struct Ctx { attempts: u32 }
//!
//! let machine = Machine::new(
//!     MachineConfig::new("door", Ctx::default())
//!         .with_initial("closed")
//!         .state(
//!             StateNodeConfig::new("closed").on_transition(
//!                 TransitionConfig::new("OPEN", "open")
//!                     .when(|ctx: &Ctx, _| ctx.attempts < 3)
//!                     .action(Action::assign(|ctx: &Ctx, _| Ctx { attempts: ctx.attempts + 1 })),
//!             ),
//!         )
//!         .state(StateNodeConfig::new("open").on("CLOSE", "closed")),
//! )
//! .unwrap();
//! ```

#![allow(clippy::type_complexity)]

pub mod machine;
pub mod utils;

pub use machine::{
    Action, ActivityConfig, ActivityKind, Delay, Effect, Event, Expr, Guard, GuardFn, HistoryKind,
    HistoryValue, InvokeConfig, LogSpec, Machine, MachineConfig, MachineOptions, SendSpec,
    SendTarget, ServiceDef, StartSpec, State, StateKind, StateNode, StateNodeConfig, StateValue,
    TransitionConfig,
};
pub use utils::{MachineError, MachineResult};
