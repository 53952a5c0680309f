//! Event records processed by the machine
//!
//! Events are tagged records with a name and an optional payload. The engine
//! additionally models the null (eventless) event, the `*` wildcard used in
//! transition configuration, and the internal form of raised events, which
//! carries a link to the event that produced them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Name of the null (eventless) event.
pub const NULL_EVENT: &str = "";

/// Wildcard event name; matches any non-null event when used in a transition.
pub const WILDCARD_EVENT: &str = "*";

/// Name of the synthetic event that performs the initial entry.
pub const INIT_EVENT: &str = "machine.init";

/// An event consumed or produced by the machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name; the empty string is the null event
    pub name: String,
    /// Optional payload carried to guards, assigns, and expressions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// For raised events, the name of the event that raised them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
            origin: None,
        }
    }

    /// Create an event carrying a payload.
    pub fn with_payload(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
            origin: None,
        }
    }

    /// The null event, matched only by null-event transitions.
    pub fn null() -> Self {
        Self::new(NULL_EVENT)
    }

    /// The synthetic event used for the initial entry.
    pub fn init() -> Self {
        Self::new(INIT_EVENT)
    }

    /// Done event raised when a state's final child is entered.
    pub fn done_state(id: &str, payload: Option<Value>) -> Self {
        Self {
            name: format!("done.state.{id}"),
            payload,
            origin: None,
        }
    }

    /// Name of the done event for an invocation.
    pub fn done_invoke_name(id: &str) -> String {
        format!("done.invoke.{id}")
    }

    /// Name of the error event for an invocation.
    pub fn error_invoke_name(id: &str) -> String {
        format!("error.invoke.{id}")
    }

    /// Name of the synthetic event scheduled by a delayed transition.
    pub fn after_name(delay: &str, id: &str) -> String {
        format!("after({delay})#{id}")
    }

    pub fn is_null(&self) -> bool {
        self.name == NULL_EVENT
    }

    /// Internal form of a raised event: stamp the originating event name.
    pub fn raised_from(mut self, origin: &Event) -> Self {
        if self.origin.is_none() {
            self.origin = Some(origin.name.clone());
        }
        self
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Event::new(name)
    }
}

impl From<String> for Event {
    fn from(name: String) -> Self {
        Event::new(name)
    }
}

impl From<(&str, Value)> for Event {
    fn from((name, payload): (&str, Value)) -> Self {
        Event::with_payload(name, payload)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "<null>")
        } else {
            write!(f, "{}", self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_from_str() {
        let event = Event::from("TIMER");
        assert_eq!(event.name, "TIMER");
        assert!(event.payload.is_none());
    }

    #[test]
    fn event_with_payload() {
        let event = Event::with_payload("LOGIN", json!({ "user": "ada" }));
        assert_eq!(event.payload, Some(json!({ "user": "ada" })));
    }

    #[test]
    fn null_event_is_recognized() {
        assert!(Event::null().is_null());
        assert!(!Event::from("TIMER").is_null());
    }

    #[test]
    fn raised_events_record_their_origin() {
        let cause = Event::from("SUBMIT");
        let raised = Event::from("VALIDATE").raised_from(&cause);
        assert_eq!(raised.origin.as_deref(), Some("SUBMIT"));
    }

    #[test]
    fn synthetic_event_names() {
        assert_eq!(
            Event::done_state("form", None).name,
            "done.state.form".to_string()
        );
        assert_eq!(Event::done_invoke_name("fetch"), "done.invoke.fetch");
        assert_eq!(Event::after_name("500", "light.red"), "after(500)#light.red");
    }
}
