//! Adapter implementations for task ports.
//!
//! - [`memory::InMemoryTaskStore`]: versioned task storage with
//!   compare-and-swap saves
//! - [`memory::InMemoryCodeHost`]: workspace provisioning and pull request
//!   listing
//! - [`memory::InMemoryEscrowLedger`]: idempotent per-task escrow accounts

pub mod memory;
