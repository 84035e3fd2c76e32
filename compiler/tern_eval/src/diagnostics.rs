//! Call depth tracking for the function-call boundary.
//!
//! Depth is counted per thread: a spawned task starts from zero on its own
//! thread, and a deferred task continues the count of the host thread that
//! runs it. The depth check is integrated into [`CallDepthGuard::enter`].

use std::cell::Cell;

use crate::errors::{recursion_limit, RuntimeError};

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Current number of active call boundaries on this thread.
pub fn call_depth() -> usize {
    CALL_DEPTH.with(Cell::get)
}

/// One active call boundary. Dropping it leaves the call.
#[must_use = "the call depth is released when the guard is dropped"]
pub struct CallDepthGuard {
    _entered: (),
}

impl CallDepthGuard {
    /// Enter a call, failing with `RecursionLimit` when `max_depth` is reached.
    ///
    /// `None` means unlimited.
    pub fn enter(max_depth: Option<usize>) -> Result<Self, RuntimeError> {
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if let Some(max) = max_depth {
                if current >= max {
                    return Err(recursion_limit(max));
                }
            }
            depth.set(current + 1);
            Ok(CallDepthGuard { _entered: () })
        })
    }
}

impl Drop for CallDepthGuard {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}
