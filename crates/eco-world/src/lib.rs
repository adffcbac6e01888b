//! Ecosystem simulation engine.
//!
//! This crate implements the double-buffered rabbit/fox grid, the striped
//! lock table used for concurrent writes, per-agent move resolution, the
//! order-independent conflict merge, and the generation scheduler.

pub mod conflict;
pub mod generate;
pub mod grid;
pub mod locks;
pub mod movement;
pub mod report;
pub mod simulation;

pub use generate::generate;
pub use grid::{Census, Grid, GridStore};
pub use locks::StripedLockTable;
pub use report::Report;
pub use simulation::{Phase, Simulation, SimulationResult};
