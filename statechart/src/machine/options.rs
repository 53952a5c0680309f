//! Machine options: named registries for guards, actions, delays, services,
//! and activities
//!
//! Registries are consulted lazily while transitions are processed; a missing
//! entry fails the microstep with the matching `Unknown*` error.

use crate::machine::actions::Action;
use crate::machine::events::Event;
use crate::machine::guards::GuardFn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Signature of a named delay: milliseconds computed from context and event
pub type DelayFn<C> = Arc<dyn Fn(&C, &Event) -> u64 + Send + Sync>;

/// Registered definition of an invokable service or a long-running activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDef {
    /// Concrete source the runtime uses to create the worker
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ServiceDef {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Named maps resolved while transitions are processed
#[derive(Clone)]
pub struct MachineOptions<C> {
    pub guards: HashMap<String, GuardFn<C>>,
    pub actions: HashMap<String, Action<C>>,
    pub delays: HashMap<String, DelayFn<C>>,
    pub services: HashMap<String, ServiceDef>,
    pub activities: HashMap<String, ServiceDef>,
}

impl<C> Default for MachineOptions<C> {
    fn default() -> Self {
        Self {
            guards: HashMap::new(),
            actions: HashMap::new(),
            delays: HashMap::new(),
            services: HashMap::new(),
            activities: HashMap::new(),
        }
    }
}

impl<C> MachineOptions<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named guard.
    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&C, &Event) -> bool + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Register a named action.
    pub fn action(mut self, name: impl Into<String>, action: Action<C>) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    /// Register a fixed named delay.
    pub fn delay(mut self, name: impl Into<String>, ms: u64) -> Self {
        self.delays.insert(name.into(), Arc::new(move |_, _| ms));
        self
    }

    /// Register a named delay computed from context and event.
    pub fn delay_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&C, &Event) -> u64 + Send + Sync + 'static,
    {
        self.delays.insert(name.into(), Arc::new(f));
        self
    }

    /// Register an invokable service.
    pub fn service(mut self, name: impl Into<String>, def: ServiceDef) -> Self {
        self.services.insert(name.into(), def);
        self
    }

    /// Register an activity.
    pub fn activity(mut self, name: impl Into<String>, def: ServiceDef) -> Self {
        self.activities.insert(name.into(), def);
        self
    }

    /// Overlay `other` on top of these options; entries in `other` win.
    pub fn merge(mut self, other: MachineOptions<C>) -> Self {
        self.guards.extend(other.guards);
        self.actions.extend(other.actions);
        self.delays.extend(other.delays);
        self.services.extend(other.services);
        self.activities.extend(other.activities);
        self
    }
}

impl<C> fmt::Debug for MachineOptions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineOptions")
            .field("guards", &self.guards.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("delays", &self.delays.keys().collect::<Vec<_>>())
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("activities", &self.activities.keys().collect::<Vec<_>>())
            .finish()
    }
}
