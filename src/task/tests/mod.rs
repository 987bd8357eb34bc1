//! Unit tests for the task lifecycle, escrow arithmetic, review gating, and
//! the orchestrator.

mod retry_tests;
