//! Utility types shared across the crate

pub mod error;

pub use error::{MachineError, MachineResult};
