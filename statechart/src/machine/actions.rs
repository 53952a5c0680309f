//! Action descriptors and resolved side effects
//!
//! Actions attached to transitions and to state entry/exit are tagged
//! descriptors. The engine consumes assigns and raises itself; everything
//! else resolves to an [`Effect`] carried on the returned state for the
//! runtime to execute.

use crate::machine::events::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Signature of an assign body: produces the next context
pub type AssignFn<C> = Arc<dyn Fn(&C, &Event) -> C + Send + Sync>;

/// Signature of a pure action body: produces more action descriptors
pub type PureFn<C> = Arc<dyn Fn(&C, &Event) -> Vec<Action<C>> + Send + Sync>;

/// A value that is either given literally or computed from context and event.
#[derive(Clone)]
pub enum Expr<C, T> {
    Value(T),
    Fn(Arc<dyn Fn(&C, &Event) -> T + Send + Sync>),
}

impl<C, T: Clone> Expr<C, T> {
    pub fn value(value: T) -> Self {
        Expr::Value(value)
    }

    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> T + Send + Sync + 'static,
    {
        Expr::Fn(Arc::new(f))
    }

    /// Evaluate against the current context and event.
    pub fn resolve(&self, context: &C, event: &Event) -> T {
        match self {
            Expr::Value(value) => value.clone(),
            Expr::Fn(f) => f(context, event),
        }
    }
}

impl<C, T: fmt::Debug> fmt::Debug for Expr<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Value(value) => write!(f, "Expr::Value({value:?})"),
            Expr::Fn(_) => f.write_str("Expr::Fn"),
        }
    }
}

/// Destination of a sent event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendTarget {
    /// Back onto the machine's own raised-event queue
    Internal,
    /// An external target or actor, addressed by id
    Id(String),
}

/// Delay attached to a sent event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delay {
    /// Milliseconds
    Ms(u64),
    /// Name resolved against the delays registry
    Named(String),
}

impl Delay {
    /// Text form used in synthetic event names and send ids.
    pub fn label(&self) -> String {
        match self {
            Delay::Ms(ms) => ms.to_string(),
            Delay::Named(name) => name.clone(),
        }
    }
}

/// A send action before resolution
#[derive(Debug, Clone)]
pub struct SendSpec<C> {
    pub event: Expr<C, Event>,
    pub to: SendTarget,
    pub delay: Option<Delay>,
    /// Identifier used to cancel a pending send; derived when omitted
    pub id: Option<String>,
}

impl<C> SendSpec<C> {
    pub fn new(event: impl Into<Event>) -> Self {
        Self {
            event: Expr::Value(event.into()),
            to: SendTarget::Internal,
            delay: None,
            id: None,
        }
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> Event + Send + Sync + 'static,
    {
        Self {
            event: Expr::func(f),
            to: SendTarget::Internal,
            delay: None,
            id: None,
        }
    }

    pub fn to(mut self, target: SendTarget) -> Self {
        self.to = target;
        self
    }

    pub fn after(mut self, delay: Delay) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// A log action before resolution
#[derive(Debug, Clone)]
pub struct LogSpec<C> {
    pub label: Option<String>,
    pub message: Expr<C, String>,
}

/// Whether a started worker is a declared activity or an invoked service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Activity,
    Service,
}

/// A start action before resolution
#[derive(Debug, Clone)]
pub struct StartSpec<C> {
    /// Identifier the runtime uses to address the worker
    pub id: String,
    /// Name resolved against the activities or services registry
    pub src: String,
    pub kind: ActivityKind,
    /// Input handed to the worker when it starts
    pub data: Option<Expr<C, Value>>,
}

/// An action descriptor attached to a transition or to state entry/exit
#[derive(Clone)]
pub enum Action<C> {
    /// Produce the next context from the current one
    Assign(AssignFn<C>),
    /// Queue an internal event
    Raise(Event),
    /// Emit an event towards a target, optionally delayed
    Send(SendSpec<C>),
    /// Forward a message to the diagnostic sink
    Log(LogSpec<C>),
    /// Expand into further action descriptors
    Pure(PureFn<C>),
    /// Mark a worker as running and ask the runtime to create it
    Start(StartSpec<C>),
    /// Mark a worker as stopped and ask the runtime to dispose it
    Stop(String),
    /// Ask the runtime to cancel a pending delayed send
    Cancel(String),
    /// Name resolved against the actions registry
    Named(String),
    /// Unknown kind, forwarded verbatim for the host to interpret
    Custom { kind: String, data: Option<Value> },
}

impl<C> Action<C> {
    /// Create an assign action.
    pub fn assign<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> C + Send + Sync + 'static,
    {
        Action::Assign(Arc::new(f))
    }

    /// Raise an internal event.
    pub fn raise(event: impl Into<Event>) -> Self {
        Action::Raise(event.into())
    }

    /// Send an event; use [`SendSpec`] builders for target, delay, and id.
    pub fn send(spec: SendSpec<C>) -> Self {
        Action::Send(spec)
    }

    /// Log a fixed message.
    pub fn log(message: impl Into<String>) -> Self {
        Action::Log(LogSpec {
            label: None,
            message: Expr::Value(message.into()),
        })
    }

    /// Log a message computed from context and event.
    pub fn log_expr<F>(label: Option<String>, f: F) -> Self
    where
        F: Fn(&C, &Event) -> String + Send + Sync + 'static,
    {
        Action::Log(LogSpec {
            label,
            message: Expr::func(f),
        })
    }

    /// Expand into a computed list of actions.
    pub fn pure<F>(f: F) -> Self
    where
        F: Fn(&C, &Event) -> Vec<Action<C>> + Send + Sync + 'static,
    {
        Action::Pure(Arc::new(f))
    }

    /// Cancel a pending delayed send by id.
    pub fn cancel(id: impl Into<String>) -> Self {
        Action::Cancel(id.into())
    }

    /// Reference an action registered in the machine options.
    pub fn named(name: impl Into<String>) -> Self {
        Action::Named(name.into())
    }

    /// An action of a kind this engine does not interpret.
    pub fn custom(kind: impl Into<String>, data: Option<Value>) -> Self {
        Action::Custom {
            kind: kind.into(),
            data,
        }
    }

    /// Tag of this descriptor, used in diagnostics.
    pub fn kind(&self) -> &str {
        match self {
            Action::Assign(_) => "assign",
            Action::Raise(_) => "raise",
            Action::Send(_) => "send",
            Action::Log(_) => "log",
            Action::Pure(_) => "pure",
            Action::Start(_) => "start",
            Action::Stop(_) => "stop",
            Action::Cancel(_) => "cancel",
            Action::Named(_) => "named",
            Action::Custom { .. } => "custom",
        }
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Raise(event) => write!(f, "Action::Raise({})", event.name),
            Action::Send(spec) => write!(f, "Action::Send(to: {:?})", spec.to),
            Action::Stop(id) => write!(f, "Action::Stop({id})"),
            Action::Cancel(id) => write!(f, "Action::Cancel({id})"),
            Action::Named(name) => write!(f, "Action::Named({name})"),
            Action::Custom { kind, .. } => write!(f, "Action::Custom({kind})"),
            other => write!(f, "Action::{}", capitalized(other.kind())),
        }
    }
}

fn capitalized(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// A side effect the engine has fully resolved; the runtime executes these
/// in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Deliver `event` to `to`, after `delay_ms` when present
    Send {
        id: String,
        event: Event,
        to: SendTarget,
        delay_ms: Option<u64>,
    },
    /// Cancel the pending send registered under `id`
    Cancel { id: String },
    /// A resolved log message
    Log {
        label: Option<String>,
        message: String,
    },
    /// Create the worker registered under `src`
    Start {
        id: String,
        src: String,
        kind: ActivityKind,
        data: Option<Value>,
    },
    /// Dispose the worker addressed by `id`
    Stop { id: String },
    /// An uninterpreted action, forwarded verbatim
    Custom { kind: String, data: Option<Value> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    struct Ctx {
        count: i64,
    }

    #[test]
    fn assign_produces_a_new_context() {
        let action = Action::assign(|ctx: &Ctx, _event: &Event| Ctx {
            count: ctx.count + 1,
        });
        match action {
            Action::Assign(f) => {
                assert_eq!(f(&Ctx { count: 2 }, &Event::from("INC")), Ctx { count: 3 })
            }
            _ => panic!("expected assign"),
        }
    }

    #[test]
    fn expr_resolves_values_and_functions() {
        let fixed: Expr<Ctx, String> = Expr::value("hello".to_string());
        assert_eq!(fixed.resolve(&Ctx { count: 0 }, &Event::null()), "hello");

        let computed: Expr<Ctx, String> =
            Expr::func(|ctx: &Ctx, event: &Event| format!("{}:{}", event.name, ctx.count));
        assert_eq!(
            computed.resolve(&Ctx { count: 7 }, &Event::from("TICK")),
            "TICK:7"
        );
    }

    #[test]
    fn send_spec_builders() {
        let spec: SendSpec<Ctx> = SendSpec::new("PING")
            .to(SendTarget::Id("sibling".into()))
            .after(Delay::Ms(250))
            .with_id("ping-send");
        assert_eq!(spec.to, SendTarget::Id("sibling".into()));
        assert_eq!(spec.delay, Some(Delay::Ms(250)));
        assert_eq!(spec.id.as_deref(), Some("ping-send"));
    }

    #[test]
    fn action_kinds_are_tagged() {
        let custom: Action<Ctx> = Action::custom("vibrate", Some(json!({ "ms": 20 })));
        assert_eq!(custom.kind(), "custom");
        assert_eq!(Action::<Ctx>::raise("DONE").kind(), "raise");
    }
}
