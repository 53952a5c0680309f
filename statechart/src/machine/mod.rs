//! Statechart machine core
//!
//! Hierarchical state machines with guards, actions, parallel regions, and
//! history, driven by a pure transition engine.

pub mod actions;
pub mod config;
pub mod configuration;
pub mod engine;
pub mod events;
pub mod guards;
pub mod history;
#[allow(clippy::module_inception)]
pub mod machine;
pub mod node;
pub mod options;
pub mod state;
pub mod states;
pub mod transition;

pub use actions::{Action, ActivityKind, Delay, Effect, Expr, LogSpec, SendSpec, SendTarget, StartSpec};
pub use config::{
    ActivityConfig, AfterConfig, InvokeConfig, MachineConfig, StateNodeConfig, TransitionConfig,
};
pub use events::{Event, INIT_EVENT, NULL_EVENT, WILDCARD_EVENT};
pub use guards::{Guard, GuardFn};
pub use history::HistoryValue;
pub use machine::Machine;
pub use node::{HistoryKind, NodeId, StateKind, StateNode};
pub use options::{MachineOptions, ServiceDef};
pub use state::State;
pub use states::StateValue;
pub use transition::TransitionDescriptor;
