//! Pool lifecycle state and the bookkeeping guarded by the pool lock.

use std::collections::VecDeque;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::PoolStats;
use crate::error::{Error, Result};

/// Lifecycle state of a pool.
///
/// `Open -> Closing -> Closed`; there is no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PoolState {
    /// Accepting checkouts.
    Open,
    /// Shutdown started; instances are closed as they become reachable.
    Closing,
    /// Every instance has been closed.
    Closed,
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closing => f.write_str("closing"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Everything the pool lock protects.
///
/// Each instance is counted in exactly one of `idle`, `checked_out` or
/// `closing` until its close finishes, so
/// `idle.len() + checked_out + closing <= size` always holds.
pub(crate) struct Inventory<T> {
    state: PoolState,
    idle: VecDeque<T>,
    size: usize,
    checked_out: usize,
    closing: usize,
    total_acquisitions: u64,
    total_releases: u64,
    closed: u64,
    close_failures: u64,
    failures: Vec<Error>,
}

impl<T> Inventory<T> {
    /// Open inventory holding freshly created instances.
    pub(crate) fn new(instances: Vec<T>) -> Self {
        Self {
            state: PoolState::Open,
            size: instances.len(),
            idle: instances.into(),
            checked_out: 0,
            closing: 0,
            total_acquisitions: 0,
            total_releases: 0,
            closed: 0,
            close_failures: 0,
            failures: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> PoolState {
        self.state
    }

    pub(crate) fn checked_out(&self) -> usize {
        self.checked_out
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Pop an idle instance. Only valid while open.
    pub(crate) fn check_out(&mut self) -> Option<T> {
        debug_assert_eq!(self.state, PoolState::Open);
        let instance = self.idle.pop_front()?;
        self.checked_out += 1;
        self.total_acquisitions += 1;
        Some(instance)
    }

    /// Take back a checked-out instance.
    ///
    /// While open the instance goes back to the idle queue and `None` is
    /// returned. Otherwise it is handed back to the caller, already counted
    /// as closing, and must be passed to a close followed by
    /// [`finish_close`](Self::finish_close).
    pub(crate) fn check_in(&mut self, instance: T) -> Option<T> {
        debug_assert!(self.checked_out > 0, "check_in without check_out");
        self.checked_out -= 1;
        self.total_releases += 1;
        if self.state == PoolState::Open {
            self.idle.push_back(instance);
            None
        } else {
            self.closing += 1;
            Some(instance)
        }
    }

    /// Flip `Open -> Closing` and hand out every idle instance for closing.
    ///
    /// Returns `None` if shutdown had already begun.
    pub(crate) fn begin_close(&mut self) -> Option<Vec<T>> {
        if self.state != PoolState::Open {
            return None;
        }
        self.state = PoolState::Closing;
        let drained: Vec<T> = self.idle.drain(..).collect();
        self.closing += drained.len();
        Some(drained)
    }

    /// Record the outcome of closing one instance previously handed out by
    /// [`begin_close`](Self::begin_close) or [`check_in`](Self::check_in).
    ///
    /// Returns `true` if this was the last instance and the inventory just
    /// became `Closed`.
    pub(crate) fn finish_close(&mut self, result: Result<()>) -> bool {
        debug_assert!(self.closing > 0, "finish_close without a pending close");
        self.closing -= 1;
        match result {
            Ok(()) => self.closed += 1,
            Err(e) => {
                self.close_failures += 1;
                self.failures.push(e);
            }
        }
        self.try_finish()
    }

    /// Move to `Closed` once nothing is idle, checked out or mid-close.
    pub(crate) fn try_finish(&mut self) -> bool {
        if self.state == PoolState::Closing
            && self.idle.is_empty()
            && self.checked_out == 0
            && self.closing == 0
        {
            self.state = PoolState::Closed;
            return true;
        }
        false
    }

    /// Hand over the close failures collected so far.
    pub(crate) fn take_failures(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.failures)
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.size,
            idle: self.idle.len(),
            active: self.checked_out,
            closing: self.closing,
            total_acquisitions: self.total_acquisitions,
            total_releases: self.total_releases,
            closed: self.closed,
            close_failures: self.close_failures,
        }
    }
}
