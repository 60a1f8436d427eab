//! Worker Module
//!
//! Generation lifecycle, registration and the control channel.

pub mod control;
mod lifecycle;
mod registration;

pub use control::{ControlMessage, MessageOutcome};
pub use lifecycle::{EventKind, Worker, WorkerEvent, WorkerOutcome, WorkerState};
pub use registration::Registration;
