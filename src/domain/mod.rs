//! Domain rules independent of storage.

pub mod flow;

pub use flow::{FlowMachine, FlowState};
