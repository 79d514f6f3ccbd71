//! Developer trace of run state transitions. Every transition goes to the
//! `ingestlite::dev6` log target; a thread can also capture them in memory so
//! tests can assert on the exact sequence without a global logger.

use std::cell::RefCell;
use std::fmt;

use uuid::Uuid;

use super::logger::DEV6_TARGET;
use crate::import::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub run_id: Uuid,
    pub from: RunState,
    pub to: RunState,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import {}: {:?} -> {:?}", self.run_id, self.from, self.to)
    }
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<Transition>>> = const { RefCell::new(None) };
}

/// Stops capturing on the current thread when dropped.
pub struct CaptureGuard;

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        CAPTURED.with(|c| *c.borrow_mut() = None);
    }
}

/// Start capturing transitions made on the current thread.
pub fn capture_transitions() -> CaptureGuard {
    CAPTURED.with(|c| *c.borrow_mut() = Some(Vec::new()));
    CaptureGuard
}

pub fn record(transition: Transition) {
    CAPTURED.with(|c| {
        if let Some(buf) = c.borrow_mut().as_mut() {
            buf.push(transition);
        }
    });
    log::trace!(target: DEV6_TARGET, "{transition}");
}

/// Captured transitions of one run, oldest first. Others stay captured.
pub fn take_for(run_id: Uuid) -> Vec<(RunState, RunState)> {
    CAPTURED.with(|c| match c.borrow_mut().as_mut() {
        Some(buf) => {
            let (mine, rest): (Vec<_>, Vec<_>) = buf.drain(..).partition(|t| t.run_id == run_id);
            *buf = rest;
            mine.into_iter().map(|t| (t.from, t.to)).collect()
        }
        None => Vec::new(),
    })
}

/// `dev6!(run_id, from => to)` records one state transition.
#[macro_export]
macro_rules! dev6 {
    ($run_id:expr, $from:expr => $to:expr) => {
        $crate::utils::devlog::record($crate::utils::devlog::Transition { run_id: $run_id, from: $from, to: $to })
    };
}
