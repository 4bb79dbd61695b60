//! Join combinator: wait for every task in a set.
//!
//! `when_all` waits for **all** inputs to reach a terminal state, even after
//! one of them faults, and then folds the outcomes:
//!
//! 1. Any faults: the result faults with every child fault aggregated, in
//!    input order. This is where multi-error faults come from.
//! 2. Otherwise any cancellation: the result is cancelled.
//! 3. Otherwise: the values, in input order.
//!
//! No user code runs, so nothing is posted; the fold happens on whichever
//! thread completes the last input.

use crate::error::Fault;
use crate::runtime::task::{Attach, Continuation};
use crate::runtime::{CompletionSource, Task};
use crate::tracing_compat::trace;
use crate::types::Outcome;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct JoinState<T> {
    slots: Mutex<Vec<Option<Outcome<T>>>>,
    remaining: AtomicUsize,
    source: CompletionSource<Vec<T>>,
}

impl<T: Clone + 'static> JoinState<T> {
    fn record(&self, index: usize, outcome: &Outcome<T>) {
        self.slots.lock()[index] = Some(outcome.clone());
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let slots = std::mem::take(&mut *self.slots.lock());
            self.source.try_set_outcome(fold(slots));
        }
    }
}

fn fold<T>(slots: Vec<Option<Outcome<T>>>) -> Outcome<Vec<T>> {
    let mut values = Vec::with_capacity(slots.len());
    let mut faults = Vec::new();
    let mut cancelled = false;
    for outcome in slots.into_iter().flatten() {
        match outcome {
            Outcome::Ok(value) => values.push(value),
            Outcome::Faulted(fault) => faults.push(fault),
            Outcome::Cancelled => cancelled = true,
        }
    }
    trace!(
        faults = faults.len(),
        cancelled,
        values = values.len(),
        "when_all: every input completed"
    );
    if !faults.is_empty() {
        Outcome::Faulted(Fault::aggregate(faults))
    } else if cancelled {
        Outcome::Cancelled
    } else {
        Outcome::Ok(values)
    }
}

/// Returns a task that completes once every input task has completed.
///
/// ```
/// use taskchain::{Task, when_all};
///
/// let all = when_all([Task::from_result(1), Task::from_result(2)]);
/// assert_eq!(all.try_get_result(), Some(vec![1, 2]));
/// ```
pub fn when_all<T, I>(tasks: I) -> Task<Vec<T>>
where
    I: IntoIterator<Item = Task<T>>,
    T: Clone + Send + Sync + 'static,
{
    let tasks: Vec<Task<T>> = tasks.into_iter().collect();
    if tasks.is_empty() {
        return Task::from_result(Vec::new());
    }

    let source = CompletionSource::new();
    let result = source.task();
    let state = Arc::new(JoinState {
        slots: Mutex::new((0..tasks.len()).map(|_| None).collect()),
        remaining: AtomicUsize::new(tasks.len()),
        source,
    });

    for (index, task) in tasks.iter().enumerate() {
        let attached = task.attach(Arc::clone(&state), move |state| {
            let continuation: Continuation<T> =
                Box::new(move |outcome: &Outcome<T>| state.record(index, outcome));
            (continuation, ())
        });
        if let Attach::Ready(outcome, state) = attached {
            state.record(index, &outcome);
        }
    }
    result
}
