//! Continuation combinators over [`Task`].
//!
//! This module provides the core combinators:
//!
//! - [`then`](mod@then): run a continuation after success, adopting returned tasks
//! - [`catch`](mod@catch): recover from a fault
//! - [`finally`](mod@finally): run cleanup regardless of outcome
//! - [`copy`]: copy a terminal state into a [`CompletionSource`]
//! - [`try_get`]: non-blocking result extraction
//! - [`inspect`](mod@inspect): observe the outcome without changing it
//! - [`join`]: wait for every task in a set, aggregating faults
//!
//! # Dispatch
//!
//! Every combinator captures the ambient [`SyncContext`](crate::runtime::SyncContext)
//! when it is called and then takes one of two paths:
//!
//! 1. The antecedent is already terminal: user code runs inline on the calling
//!    thread and nothing is posted.
//! 2. The antecedent is pending: a continuation is queued. When it fires, user
//!    code is posted to the captured context exactly once (or runs on the
//!    completing thread when no context was ambient). Outcomes that skip user
//!    code are forwarded without posting.

pub mod catch;
pub mod copy;
pub mod finally;
pub mod inspect;
pub mod join;
pub mod then;
pub mod try_get;

pub use join::when_all;

use crate::runtime::context::CapturedContext;
use crate::runtime::task::{Attach, Continuation, invoke_guarded};
use crate::runtime::{CompletionSource, Task};
use crate::tracing_compat::trace;
use crate::types::Outcome;

/// What a combinator does with its antecedent's terminal state.
pub(crate) enum Step<U> {
    /// The result is decided without running user code.
    Resolved(Task<U>),
    /// User code must run to produce the result.
    Invoke(Box<dyn FnOnce() -> Task<U> + Send + 'static>),
}

impl<U> Step<U> {
    pub(crate) fn invoke<F>(f: F) -> Self
    where
        F: FnOnce() -> Task<U> + Send + 'static,
    {
        Self::Invoke(Box::new(f))
    }
}

/// Shared driver for every combinator.
///
/// `decide` sees the antecedent's outcome exactly once, either inline (the
/// antecedent was terminal at call time) or from the completing thread.
pub(crate) fn continue_with<T, U, D>(
    antecedent: &Task<T>,
    combinator: &'static str,
    decide: D,
) -> Task<U>
where
    T: Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    D: FnOnce(&Outcome<T>) -> Step<U> + Send + 'static,
{
    let context = CapturedContext::capture();
    let attached = antecedent.attach(decide, move |decide| {
        let source = CompletionSource::new();
        let task = source.task();
        let continuation: Continuation<T> = Box::new(move |outcome: &Outcome<T>| {
            match decide(outcome) {
                Step::Resolved(result) => result.forward_to(source),
                Step::Invoke(body) => context.dispatch(
                    combinator,
                    Box::new(move || invoke_guarded(body).forward_to(source)),
                ),
            }
        });
        (continuation, task)
    });

    match attached {
        Attach::Ready(outcome, decide) => {
            trace!(combinator, "antecedent already complete, continuing inline");
            match decide(&outcome) {
                Step::Resolved(result) => result,
                Step::Invoke(body) => invoke_guarded(body),
            }
        }
        Attach::Queued(task) => {
            trace!(combinator, "antecedent pending, continuation queued");
            task
        }
    }
}
