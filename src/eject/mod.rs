//! Multi-tape eject workflow

pub mod orchestrator;

pub use orchestrator::*;
