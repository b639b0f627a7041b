//! Headless scenario runner for the container and hopper simulation.

pub mod scenario;

pub use scenario::{Action, ActionSpec, Scenario};
