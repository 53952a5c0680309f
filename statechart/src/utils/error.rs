//! Error types and result alias for machine operations

/// Result type for machine operations
pub type MachineResult<T> = Result<T, MachineError>;

/// Failures reported by machine construction and transition processing.
///
/// Construction failures surface while the machine is being built; runtime
/// failures propagate out of `transition` and leave the previously observed
/// state valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MachineError {
    /// The machine definition is structurally invalid
    #[error("invalid configuration in machine `{machine}` at `{id}`: {reason}")]
    InvalidConfiguration {
        machine: String,
        id: String,
        reason: String,
    },

    /// A state lookup by id or path found nothing
    #[error("no state `{id}` in machine `{machine}`")]
    NoSuchState { machine: String, id: String },

    /// A named guard is missing from the options registry
    #[error("unknown guard `{name}` in state `{state}` for event `{event}`")]
    UnknownGuard {
        name: String,
        state: String,
        event: String,
    },

    /// A named delay is missing from the options registry
    #[error("unknown delay `{name}` in state `{state}` for event `{event}`")]
    UnknownDelay {
        name: String,
        state: String,
        event: String,
    },

    /// An invoked service is missing from the options registry
    #[error("unknown service `{name}` invoked by state `{state}`")]
    UnknownService { name: String, state: String },

    /// An activity is missing from the options registry
    #[error("unknown activity `{name}` started by state `{state}`")]
    UnknownActivity { name: String, state: String },

    /// A named action is missing from the options registry
    #[error("unknown action `{name}` in state `{state}` for event `{event}`")]
    UnknownAction {
        name: String,
        state: String,
        event: String,
    },

    /// A transition target could not be resolved against the state tree
    #[error("cannot resolve target `{target}` from state `{state}` in machine `{machine}`")]
    UnresolvableTarget {
        machine: String,
        state: String,
        target: String,
    },

    /// A strict machine received an event outside its alphabet
    #[error("machine `{machine}` is strict and has no transition for event `{event}`")]
    UnhandledEvent { machine: String, event: String },

    /// A user-supplied guard body panicked
    #[error("guard in state `{state}` failed on event `{event}`: {message}")]
    GuardFailure {
        state: String,
        event: String,
        message: String,
    },

    /// A user-supplied assign body panicked
    #[error("assign in state `{state}` failed on event `{event}`: {message}")]
    AssignFailure {
        state: String,
        event: String,
        message: String,
    },

    /// A user-supplied action or expression body panicked
    #[error("action in state `{state}` failed on event `{event}`: {message}")]
    ActionFailure {
        state: String,
        event: String,
        message: String,
    },

    /// The raised/null event chain did not settle within the microstep bound
    #[error("machine `{machine}` exceeded {limit} microsteps draining event `{event}`")]
    TransientLoop {
        machine: String,
        event: String,
        limit: usize,
    },
}

impl MachineError {
    /// True for failures that can only be produced while building a machine.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, MachineError::InvalidConfiguration { .. })
    }
}
