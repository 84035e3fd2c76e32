//! Stack growth for the recursive statement executor.
//!
//! Statement trees nest arbitrarily (a loop inside a try inside a switch inside
//! a function body called from another function body), and the executor walks
//! them by recursion. [`ensure_sufficient_stack`] wraps each nested block so a
//! deep script grows the native stack instead of aborting the host process.
//!
//! On `wasm32` the wrapper is a plain call.

/// Remaining stack below which a new segment is allocated (128KB).
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (2MB).
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Run `f`, first growing the stack if fewer than [`RED_ZONE`] bytes remain.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// Run `f` directly; the wasm runtime owns stack management.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
