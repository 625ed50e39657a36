//! Application running state.
//!
//! # States
//! ```text
//! Initialising → Starting → Ready → Listening
//!       │            │        │         │
//!       └────────────┴────────┴─────────┴──→ ShuttingDown (terminal)
//! ```
//!
//! # Design Decisions
//! - Stored in an `AtomicU8`; every transition is a compare-and-swap from
//!   an expected state, so two transitions can never interleave
//! - `ShuttingDown` is never the `from` side of a transition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Overall process state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RunningState {
    #[serde(rename = "init")]
    Initialising = 0,
    #[serde(rename = "starting")]
    Starting = 1,
    #[serde(rename = "ready")]
    Ready = 2,
    #[serde(rename = "listening")]
    Listening = 3,
    #[serde(rename = "shuttingDown")]
    ShuttingDown = 4,
}

impl RunningState {
    /// Wire name, as reported in the health response body.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunningState::Initialising => "init",
            RunningState::Starting => "starting",
            RunningState::Ready => "ready",
            RunningState::Listening => "listening",
            RunningState::ShuttingDown => "shuttingDown",
        }
    }

    /// True once startup hooks have all succeeded and the process is not shutting down.
    pub fn is_ready(&self) -> bool {
        matches!(self, RunningState::Ready | RunningState::Listening)
    }
}

impl From<u8> for RunningState {
    fn from(val: u8) -> Self {
        match val {
            0 => RunningState::Initialising,
            1 => RunningState::Starting,
            2 => RunningState::Ready,
            3 => RunningState::Listening,
            _ => RunningState::ShuttingDown,
        }
    }
}

impl fmt::Display for RunningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic cell holding a [`RunningState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: RunningState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> RunningState {
        RunningState::from(self.0.load(Ordering::SeqCst))
    }

    /// Move `from → to`. Fails with the observed state if it was not `from`.
    pub(crate) fn transition(&self, from: RunningState, to: RunningState) -> Result<(), RunningState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(RunningState::from)
    }

    /// Enter `ShuttingDown` from any state. Returns the previous state, or
    /// `None` if shutdown was already in progress.
    pub(crate) fn enter_shutdown(&self) -> Option<RunningState> {
        let previous = RunningState::from(self.0.swap(RunningState::ShuttingDown as u8, Ordering::SeqCst));
        if previous == RunningState::ShuttingDown {
            None
        } else {
            Some(previous)
        }
    }
}
