//! Side-effect observation of a terminal state.

use super::{Step, continue_with};
use crate::runtime::Task;
use crate::types::Outcome;

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Calls `f` with this task's outcome and passes the outcome through.
    ///
    /// A panic inside `f` faults the result.
    pub fn inspect<F>(&self, f: F) -> Self
    where
        F: FnOnce(&Outcome<T>) + Send + 'static,
    {
        continue_with(self, "inspect", move |outcome| {
            let outcome = outcome.clone();
            Step::invoke(move || {
                f(&outcome);
                Self::from_outcome(outcome)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::PanicError;
    use crate::runtime::{CompletionSource, Task};
    use crate::types::{Outcome, TaskStatus};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn sees_outcome_and_passes_it_through() {
        crate::test_utils::init_test_logging();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&seen);
        let ok = Task::from_result(2).inspect(move |o| log.lock().push(o.status()));
        let log = Arc::clone(&seen);
        let cancelled = Task::<i32>::cancelled().inspect(move |o| log.lock().push(o.status()));

        assert_eq!(ok.try_get_result(), Some(2));
        assert!(cancelled.is_cancelled());
        assert_eq!(
            *seen.lock(),
            vec![TaskStatus::RanToCompletion, TaskStatus::Cancelled]
        );
    }

    #[test]
    fn panic_replaces_outcome() {
        crate::test_utils::init_test_logging();
        let result = Task::from_result(1).inspect(|_| panic!("inspector"));
        assert!(result.fault().is_some_and(|f| f.is::<PanicError>()));
    }

    #[test]
    fn deferred_until_completion() {
        crate::test_utils::init_test_logging();
        let source = CompletionSource::<&str>::new();
        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        let result = source.task().inspect(move |o| {
            if let Outcome::Ok(v) = o {
                *slot.lock() = Some(*v);
            }
        });
        assert!(seen.lock().is_none());
        source.try_set_result("late");
        assert_eq!(*seen.lock(), Some("late"));
        assert_eq!(result.try_get_result(), Some("late"));
    }
}
