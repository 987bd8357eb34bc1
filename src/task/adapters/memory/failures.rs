//! Scripted failures and call counters shared by in-memory collaborators.

use crate::task::ports::{ExternalFailureKind, ExternalService, ExternalServiceError};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// Per-operation queue of failures to return before succeeding.
#[derive(Debug)]
pub(crate) struct FailureScript<Op> {
    service: ExternalService,
    pending: HashMap<Op, VecDeque<ExternalFailureKind>>,
    calls: HashMap<Op, usize>,
}

impl<Op> FailureScript<Op>
where
    Op: Copy + Eq + Hash + std::fmt::Debug,
{
    pub(crate) fn new(service: ExternalService) -> Self {
        Self {
            service,
            pending: HashMap::new(),
            calls: HashMap::new(),
        }
    }

    /// Queues `times` failures of `kind` for `operation`.
    pub(crate) fn push(&mut self, operation: Op, kind: ExternalFailureKind, times: usize) {
        let queue = self.pending.entry(operation).or_default();
        queue.extend(std::iter::repeat_n(kind, times));
    }

    /// Counts a call and returns the next scripted failure, if any.
    pub(crate) fn on_call(&mut self, operation: Op) -> Result<(), ExternalServiceError> {
        let count = self.calls.entry(operation).or_default();
        *count = count.saturating_add(1);
        match self.pending.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(kind) => Err(ExternalServiceError::new(
                self.service,
                kind,
                format!("scripted {kind} failure for {operation:?}"),
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn calls(&self, operation: Op) -> usize {
        self.calls.get(&operation).copied().unwrap_or_default()
    }
}

/// Maps a poisoned lock to a permanent collaborator failure.
pub(crate) fn lock_failure(service: ExternalService, err: impl ToString) -> ExternalServiceError {
    ExternalServiceError::new(service, ExternalFailureKind::Rejected, err.to_string())
}
