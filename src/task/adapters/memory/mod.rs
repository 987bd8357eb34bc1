//! In-memory adapters for tests and local runs.
//!
//! Each adapter keeps its state behind an `Arc<RwLock<_>>`, so clones share
//! state. The code host and escrow adapters can be scripted to fail the next
//! calls of an operation, and they count both attempts and effective changes.

mod code_host;
mod escrow;
mod failures;
mod store;

pub use code_host::{CodeHostOperation, InMemoryCodeHost};
pub use escrow::InMemoryEscrowLedger;
pub use store::InMemoryTaskStore;
