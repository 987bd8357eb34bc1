//! Step definitions for task settlement scenarios.

mod given;
mod then;
mod when;
pub mod world;
