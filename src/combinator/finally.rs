//! Guaranteed cleanup.

use super::{Step, continue_with};
use crate::runtime::{IntoTask, Task};
use crate::types::Outcome;

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `cleanup` once this task reaches any terminal state.
    ///
    /// The result mirrors this task after the cleanup succeeds. A failing
    /// cleanup replaces the outcome with its own fault; a cancelled cleanup
    /// task cancels the result.
    pub fn finally<F, R>(&self, cleanup: F) -> Self
    where
        F: FnOnce() -> R + Send + 'static,
        R: IntoTask<Output = ()>,
    {
        continue_with(self, "finally", move |outcome| {
            let original = outcome.clone();
            Step::invoke(move || {
                let cleanup = cleanup().into_task();
                continue_with(&cleanup, "finally", move |cleaned| {
                    Step::Resolved(match cleaned {
                        Outcome::Ok(()) => Self::from_outcome(original),
                        Outcome::Faulted(fault) => Self::faulted(fault.clone()),
                        Outcome::Cancelled => Self::cancelled(),
                    })
                })
            })
        })
    }
}
