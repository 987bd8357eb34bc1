//! Bountyforge: task lifecycle and settlement orchestration.
//!
//! Clients post paid tasks, developers apply and deliver the work through a
//! per-task repository, and escrow moves the funds once the client accepts
//! the reviewed pull requests or the task is cancelled.
//!
//! # Architecture
//!
//! Bountyforge follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//!
//! # Modules
//!
//! - [`task`]: Task state machine, escrow arithmetic, review gate, and the
//!   orchestrator that ties them to the code host and escrow collaborators

pub mod task;
