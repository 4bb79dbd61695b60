//! Fault interception.
//!
//! `catch` is the only combinator that looks at a fault. A fault is flattened
//! to its primary error and handed to the handler, whose returned task
//! replaces the result. Success and cancellation pass through untouched,
//! except that a success arriving while the token is cancelled becomes a
//! cancellation, as in `then`.

use super::{Step, continue_with};
use crate::error::{Fault, UsageError};
use crate::runtime::Task;
use crate::tracing_compat::{debug, trace};
use crate::types::{CancelToken, Outcome};

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `handler` if this task faults.
    ///
    /// The handler sees the flattened fault and must produce a replacement
    /// task. Returning `None` faults the result with
    /// [`UsageError::MissingCatchTask`].
    ///
    /// # Example
    ///
    /// ```
    /// use taskchain::Task;
    ///
    /// #[derive(Debug)]
    /// struct Timeout;
    /// impl std::fmt::Display for Timeout {
    ///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    ///         f.write_str("timeout")
    ///     }
    /// }
    /// impl std::error::Error for Timeout {}
    ///
    /// let recovered = Task::<u32>::faulted(Timeout)
    ///     .catch(|fault| {
    ///         assert!(fault.is::<Timeout>());
    ///         Task::from_result(0_u32)
    ///     });
    /// assert_eq!(recovered.try_get_result(), Some(0));
    /// ```
    pub fn catch<H, O>(&self, handler: H) -> Self
    where
        H: FnOnce(Fault) -> O + Send + 'static,
        O: Into<Option<Self>>,
    {
        self.catch_with_token(handler, &CancelToken::none())
    }

    /// Like [`catch`](Self::catch); a success arriving while `token` is
    /// cancelled cancels the result. A fault always reaches the handler.
    pub fn catch_with_token<H, O>(&self, handler: H, token: &CancelToken) -> Self
    where
        H: FnOnce(Fault) -> O + Send + 'static,
        O: Into<Option<Self>>,
    {
        let token = token.clone();
        continue_with(self, "catch", move |outcome| match outcome {
            Outcome::Faulted(fault) => {
                let fault = fault.flatten();
                Step::invoke(move || {
                    let replacement: Option<Self> = handler(fault).into();
                    replacement.unwrap_or_else(|| {
                        debug!("catch handler returned no task");
                        Self::faulted(UsageError::MissingCatchTask)
                    })
                })
            }
            Outcome::Ok(_) if token.is_cancelled() => {
                trace!("catch: token cancelled, dropping successful result");
                Step::Resolved(Self::cancelled())
            }
            Outcome::Ok(_) | Outcome::Cancelled => {
                Step::Resolved(Self::from_outcome(outcome.clone()))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{Fault, PanicError, UsageError};
    use crate::runtime::{CompletionSource, Task};
    use crate::types::CancelToken;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("first")]
    struct First;

    #[derive(Debug, thiserror::Error)]
    #[error("second")]
    struct Second;

    #[test]
    fn success_skips_handler() {
        crate::test_utils::init_test_logging();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let result = Task::<i32>::from_result(5).catch(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Task::<i32>::from_result(0)
        });
        assert_eq!(result.try_get_result(), Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancel_skips_handler() {
        crate::test_utils::init_test_logging();
        let result = Task::<i32>::cancelled().catch(|_| -> Option<Task<i32>> {
            unreachable!("handler must not run for a cancelled task")
        });
        assert!(result.is_cancelled());
    }

    #[test]
    fn handler_sees_fault_and_recovers() {
        crate::test_utils::init_test_logging();
        crate::test_phase!("handler_sees_fault_and_recovers");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let result = Task::<i32>::faulted(First).catch(move |fault| {
            counter.fetch_add(1, Ordering::SeqCst);
            assert!(fault.is::<First>());
            Task::<i32>::from_result(99)
        });
        assert_eq!(result.try_get_result(), Some(99));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_receives_flattened_fault() {
        crate::test_utils::init_test_logging();
        let aggregated = Task::<()>::from_errors([Fault::new(First), Fault::new(Second)]);
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let slot = Arc::clone(&seen);
        let result = aggregated.catch(move |fault| {
            *slot.lock() = Some(fault);
            Task::completed()
        });
        assert!(result.is_ok());
        let fault = seen.lock().take().expect("handler ran");
        assert_eq!(fault.len(), 1);
        assert!(fault.is::<First>());
    }

    #[test]
    fn missing_task_is_usage_error() {
        crate::test_utils::init_test_logging();
        let result = Task::<i32>::faulted(First).catch(|_| None::<Task<i32>>);
        let fault = result.fault().expect("faulted");
        assert!(matches!(
            fault.downcast_ref::<UsageError>(),
            Some(UsageError::MissingCatchTask)
        ));
    }

    #[test]
    fn replacement_fault_supersedes_original() {
        crate::test_utils::init_test_logging();
        let result = Task::<i32>::faulted(First).catch(|_| Task::<i32>::faulted(Second));
        let fault = result.fault().expect("faulted");
        assert_eq!(fault.len(), 1);
        assert!(fault.is::<Second>());
        assert!(!fault.is::<First>());
    }

    #[test]
    fn handler_panic_faults_result() {
        crate::test_utils::init_test_logging();
        let result =
            Task::<i32>::faulted(First).catch(|_| -> Task<i32> { panic!("handler blew up") });
        let fault = result.fault().expect("faulted");
        assert!(fault.is::<PanicError>());
    }

    #[test]
    fn handler_may_cancel() {
        crate::test_utils::init_test_logging();
        let result = Task::<i32>::faulted(First).catch(|_| Task::<i32>::cancelled());
        assert!(result.is_cancelled());
    }

    #[test]
    fn cancelled_token_still_runs_handler_on_fault() {
        crate::test_utils::init_test_logging();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let result = Task::<i32>::faulted(First).catch_with_token(
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Task::<i32>::from_result(1)
            },
            &CancelToken::cancelled(),
        );
        assert_eq!(result.try_get_result(), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_token_cancels_success() {
        crate::test_utils::init_test_logging();
        let token = CancelToken::cancelled();
        let result = Task::<i32>::from_result(3).catch_with_token(|_| None::<Task<i32>>, &token);
        assert!(result.is_cancelled());
    }

    #[test]
    fn token_cancelled_while_pending_cancels_success() {
        crate::test_utils::init_test_logging();
        let cancel = crate::types::CancelSource::new();
        let source = CompletionSource::<i32>::new();
        let result = source
            .task()
            .catch_with_token(|_| None::<Task<i32>>, &cancel.token());
        cancel.cancel();
        source.try_set_result(3);
        assert!(result.is_cancelled());
    }

    #[test]
    fn cancelled_token_leaves_cancellation_alone() {
        crate::test_utils::init_test_logging();
        let token = CancelToken::cancelled();
        let result = Task::<i32>::cancelled().catch_with_token(|_| None::<Task<i32>>, &token);
        assert!(result.is_cancelled());
    }

    #[test]
    fn pending_fault_reaches_handler_later() {
        crate::test_utils::init_test_logging();
        let source = CompletionSource::<String>::new();
        let result = source
            .task()
            .catch(|fault| Task::from_result(format!("recovered from {fault}")));
        assert_eq!(result.try_get_result(), None);
        source.try_set_fault(First);
        assert_eq!(result.try_get_result().as_deref(), Some("recovered from first"));
    }
}
