//! Copying terminal states into a [`CompletionSource`].
//!
//! These bridge a chain to a producer handed out elsewhere. No user code
//! runs, so nothing is posted to a captured context: on the asynchronous path
//! the copy happens on the thread that completes the antecedent.

use super::{Step, continue_with};
use crate::runtime::{CompletionSource, Task};
use crate::tracing_compat::debug;
use crate::types::Outcome;

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Copies this task's terminal state into `sink`.
    ///
    /// The returned task succeeds once the copy happened, whatever the
    /// antecedent's outcome. A sink that already completed is left as is.
    ///
    /// ```
    /// use taskchain::{CompletionSource, Task};
    ///
    /// let sink = CompletionSource::new();
    /// let copied = Task::from_result(3).copy_result_to(&sink);
    /// assert!(copied.is_ok());
    /// assert_eq!(sink.task().try_get_result(), Some(3));
    /// ```
    pub fn copy_result_to(&self, sink: &CompletionSource<T>) -> Task<()> {
        let sink = sink.clone();
        continue_with(self, "copy_result_to", move |outcome| {
            if !sink.try_set_outcome(outcome.clone()) {
                debug!("copy_result_to: sink already completed");
            }
            Step::Resolved(Task::completed())
        })
    }

    /// Like [`copy_result_to`](Self::copy_result_to), but completes `sink`
    /// with `value` on success instead of this task's own value.
    pub fn copy_completion_to<V>(&self, sink: &CompletionSource<V>, value: V) -> Task<()>
    where
        V: Send + Sync + 'static,
    {
        let sink = sink.clone();
        continue_with(self, "copy_completion_to", move |outcome| {
            let copied = match outcome {
                Outcome::Ok(_) => Outcome::Ok(value),
                Outcome::Faulted(fault) => Outcome::Faulted(fault.clone()),
                Outcome::Cancelled => Outcome::Cancelled,
            };
            if !sink.try_set_outcome(copied) {
                debug!("copy_completion_to: sink already completed");
            }
            Step::Resolved(Task::completed())
        })
    }
}
