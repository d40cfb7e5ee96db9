//! Stack growth for the recursive parser and evaluator.
//!
//! Deeply nested source and deep Lox recursion both turn into deep Rust
//! recursion. Wrapping the recursive entry points keeps the host thread
//! from overflowing; the evaluator's own call-depth limit decides when a
//! program has recursed too far.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 128 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
