//! Task lifecycle and escrow settlement.
//!
//! A task is posted by a client, applied for by developers, assigned to one
//! of them, worked on in a provisioned repository, reviewed through pull
//! requests, and settled through escrow. The module follows hexagonal
//! architecture:
//!
//! - Domain types and the state machine in [`domain`]
//! - Port contracts for persistence, the code host, and escrow in [`ports`]
//! - In-memory adapter implementations in [`adapters`]
//! - The orchestrator and review gate in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
