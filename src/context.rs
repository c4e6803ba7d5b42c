use chrono::{DateTime, Utc};

use crate::entities::UserId;

/// Per-call execution context threaded through every workflow entry point.
///
/// Carries the acting user, the clock instant the call runs at, and the flags that
/// change how the write interceptors behave. Suppression is never ambient: a
/// propagated write receives a context produced by [`ExecutionContext::suppressed`],
/// and that context is dropped when the write returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    actor: UserId,
    now: DateTime<Utc>,
    sync_suppressed: bool,
    completion: bool,
    workorder_filter_disabled: bool,
}

impl ExecutionContext {
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            now: Utc::now(),
            sync_suppressed: false,
            completion: false,
            workorder_filter_disabled: false,
        }
    }

    /// Pins the clock, mostly for jobs and tests.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn disable_workorder_filter(mut self) -> Self {
        self.workorder_filter_disabled = true;
        self
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn is_sync_suppressed(&self) -> bool {
        self.sync_suppressed
    }

    pub fn is_completion(&self) -> bool {
        self.completion
    }

    pub fn workorder_filter_disabled(&self) -> bool {
        self.workorder_filter_disabled
    }

    /// Context for the single propagated write to the counterpart record.
    pub(crate) fn suppressed(&self) -> Self {
        Self {
            sync_suppressed: true,
            ..self.clone()
        }
    }

    /// Context for bulk "mark done" writes.
    pub(crate) fn for_completion(&self) -> Self {
        Self {
            completion: true,
            ..self.clone()
        }
    }
}
