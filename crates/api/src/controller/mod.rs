//! The periodic snapshot controller.

pub mod tick;

pub use tick::{run_tick, DecisionSummary, TickContext, TickReport};
