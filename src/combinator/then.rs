//! Sequential composition.
//!
//! `then` runs a continuation with the antecedent's value once it succeeds.
//! The continuation's return value goes through [`IntoTask`]: a plain
//! `Result` completes the new task directly, a returned [`Task`] is adopted so
//! the new task takes that inner task's eventual terminal state.
//!
//! # Semantics
//!
//! | antecedent | token signaled | continuation | result |
//! |------------|----------------|--------------|--------|
//! | `Ok(v)`    | no             | runs with `v`| its result |
//! | `Ok(v)`    | yes            | skipped      | `Cancelled` |
//! | `Faulted`  | either         | skipped      | same fault, unwrapped |
//! | `Cancelled`| either         | skipped      | `Cancelled` |
//!
//! The token is sampled once, when the antecedent completes. It wins over a
//! successful antecedent: a chain whose token fires between two stages stops
//! before the next stage even though nothing failed.

use super::{Step, continue_with};
use crate::runtime::{IntoTask, Task};
use crate::tracing_compat::trace;
use crate::types::{CancelToken, Outcome};

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `f` with the value of this task once it succeeds.
    ///
    /// # Example
    ///
    /// ```
    /// use taskchain::{Fault, Task};
    ///
    /// let doubled = Task::from_result(21).then(|v| Ok::<_, Fault>(v * 2));
    /// assert_eq!(doubled.try_get_result(), Some(42));
    ///
    /// // Returning a task adopts its state.
    /// let adopted = Task::completed().then(|()| Task::from_result("inner"));
    /// assert_eq!(adopted.try_get_result(), Some("inner"));
    /// ```
    pub fn then<F, R>(&self, f: F) -> Task<R::Output>
    where
        F: FnOnce(T) -> R + Send + 'static,
        R: IntoTask,
        R::Output: Clone + Send + Sync + 'static,
    {
        self.then_with_token(f, &CancelToken::none())
    }

    /// Like [`then`](Self::then), but skips `f` when `token` is cancelled at
    /// the time this task completes.
    pub fn then_with_token<F, R>(&self, f: F, token: &CancelToken) -> Task<R::Output>
    where
        F: FnOnce(T) -> R + Send + 'static,
        R: IntoTask,
        R::Output: Clone + Send + Sync + 'static,
    {
        let token = token.clone();
        continue_with(self, "then", move |outcome| match outcome {
            Outcome::Ok(value) => {
                if token.is_cancelled() {
                    trace!("then: token cancelled, skipping continuation");
                    return Step::Resolved(Task::cancelled());
                }
                let value = value.clone();
                Step::invoke(move || f(value).into_task())
            }
            Outcome::Faulted(fault) => Step::Resolved(Task::faulted(fault.clone())),
            Outcome::Cancelled => Step::Resolved(Task::cancelled()),
        })
    }
}
