//! The task handle and its producer side.
//!
//! A [`Task`] is a shared handle to a computation that completes exactly once
//! with an [`Outcome`]. Handles are cheap to clone; every clone observes the
//! same terminal state. A [`CompletionSource`] is the producer side that drives
//! the transition out of `Pending`.
//!
//! Continuation registration and the "already terminal?" check happen under
//! one lock acquisition (see [`Task::attach`]), so a continuation can never be
//! lost between the check and the registration. Continuations run outside the
//! lock, in registration order, on the thread that completes the task.

use crate::error::{Fault, PanicError};
use crate::tracing_compat::{trace, warn};
use crate::types::{CancelToken, Outcome, TaskStatus};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll, Waker};

/// A continuation waiting on a pending task.
pub(crate) type Continuation<T> = Box<dyn FnOnce(&Outcome<T>) + Send + 'static>;

enum State<T> {
    Pending {
        continuations: SmallVec<[Continuation<T>; 2]>,
        wakers: SmallVec<[Waker; 1]>,
    },
    Done(Arc<Outcome<T>>),
}

struct Inner<T> {
    state: Mutex<State<T>>,
    observed: AtomicBool,
}

impl<T> Inner<T> {
    fn pending() -> Self {
        Self {
            state: Mutex::new(State::Pending {
                continuations: SmallVec::new(),
                wakers: SmallVec::new(),
            }),
            observed: AtomicBool::new(false),
        }
    }

    fn done(outcome: Outcome<T>) -> Self {
        Self {
            state: Mutex::new(State::Done(Arc::new(outcome))),
            observed: AtomicBool::new(false),
        }
    }
}

impl<T: 'static> Inner<T> {
    /// Publishes the terminal state; returns `false` if already terminal.
    ///
    /// Wakers fire immediately. Continuations go through [`run_deferred`], so
    /// a chain completing stage after stage never nests on the stack.
    fn complete(&self, outcome: Outcome<T>) -> bool {
        let outcome = Arc::new(outcome);
        let previous = {
            let mut state = self.state.lock();
            if matches!(&*state, State::Done(_)) {
                return false;
            }
            std::mem::replace(&mut *state, State::Done(Arc::clone(&outcome)))
        };
        let State::Pending {
            continuations,
            wakers,
        } = previous
        else {
            return false;
        };

        trace!(
            status = %outcome.status(),
            continuations = continuations.len(),
            "task completed"
        );
        for waker in wakers {
            waker.wake();
        }
        if !continuations.is_empty() {
            run_deferred(Box::new(move || {
                for continuation in continuations {
                    continuation(&outcome);
                }
            }));
        }
        true
    }
}

type Deferred = Box<dyn FnOnce()>;

thread_local! {
    /// Continuation batches waiting behind the batch running on this thread.
    static DEFERRED: RefCell<Option<VecDeque<Deferred>>> = const { RefCell::new(None) };
}

/// Runs `batch` now, or queues it if this thread is already draining.
///
/// The first completion on a thread drains every batch queued by the
/// completions it triggers before returning, in completion order.
fn run_deferred(batch: Deferred) {
    let first = DEFERRED.with(|cell| {
        let mut slot = cell.borrow_mut();
        match slot.as_mut() {
            Some(queue) => {
                queue.push_back(batch);
                None
            }
            None => {
                *slot = Some(VecDeque::new());
                Some(batch)
            }
        }
    });
    let Some(first) = first else {
        return;
    };

    let _drain = DrainGuard;
    first();
    while let Some(next) =
        DEFERRED.with(|cell| cell.borrow_mut().as_mut().and_then(VecDeque::pop_front))
    {
        next();
    }
}

/// Ends the drain on this thread, even when a batch unwinds.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        let leftover = DEFERRED.with(|cell| cell.borrow_mut().take());
        drop(leftover);
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let State::Done(outcome) = self.state.get_mut() {
            if let Outcome::Faulted(fault) = &**outcome {
                if !*self.observed.get_mut() {
                    warn!(fault = %fault, "faulted task dropped without its fault being observed");
                }
            }
        }
    }
}

/// Result of [`Task::attach`].
pub(crate) enum Attach<T, S, R> {
    /// The task was already terminal; the state is handed back unused.
    Ready(Arc<Outcome<T>>, S),
    /// The continuation was queued.
    Queued(R),
}

/// A handle to an asynchronous computation.
///
/// `Task<()>` is the void variant.
///
/// # Example
///
/// ```
/// use taskchain::{Fault, Task};
///
/// let task = Task::from_result(20).then(|v| Ok::<_, Fault>(v + 22));
/// assert_eq!(task.try_get_result(), Some(42));
/// ```
pub struct Task<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Task<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Task<()> {
    /// Returns a task that already ran to completion.
    #[must_use]
    pub fn completed() -> Self {
        Self::from_result(())
    }
}

impl<T> Task<T> {
    fn from_inner(inner: Inner<T>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Returns a task that already succeeded with `value`.
    #[must_use]
    pub fn from_result(value: T) -> Self {
        Self::from_outcome(Outcome::Ok(value))
    }

    /// Returns a task that already faulted.
    #[must_use]
    pub fn faulted(fault: impl Into<Fault>) -> Self {
        Self::from_outcome(Outcome::Faulted(fault.into()))
    }

    /// Returns a faulted task aggregating every given fault.
    #[must_use]
    pub fn from_errors<I>(faults: I) -> Self
    where
        I: IntoIterator<Item = Fault>,
    {
        Self::faulted(Fault::aggregate(faults))
    }

    /// Returns a task that was already cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::from_outcome(Outcome::Cancelled)
    }

    /// Returns a task already in the given terminal state.
    #[must_use]
    pub fn from_outcome(outcome: Outcome<T>) -> Self {
        Self::from_inner(Inner::done(outcome))
    }

    /// Returns the current status without observing any fault.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        match &*self.inner.state.lock() {
            State::Pending { .. } => TaskStatus::Pending,
            State::Done(outcome) => outcome.status(),
        }
    }

    /// Returns true once the task reached any terminal state.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status().is_terminal()
    }

    /// Returns true if the task faulted.
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.status() == TaskStatus::Faulted
    }

    /// Returns true if the task was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status() == TaskStatus::Cancelled
    }

    /// Returns true if the task succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status() == TaskStatus::RanToCompletion
    }

    /// Returns true once some consumer has observed the terminal state.
    #[must_use]
    pub fn is_fault_observed(&self) -> bool {
        self.inner.observed.load(Ordering::Acquire)
    }

    /// Returns the fault, if the task faulted, marking it observed.
    #[must_use]
    pub fn fault(&self) -> Option<Fault> {
        match &*self.inner.state.lock() {
            State::Done(outcome) => outcome.fault().map(|fault| {
                self.mark_observed();
                fault.clone()
            }),
            State::Pending { .. } => None,
        }
    }

    /// Returns true if both handles refer to the same task.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn mark_observed(&self) {
        self.inner.observed.store(true, Ordering::Release);
    }

    pub(crate) fn peek(&self) -> Option<Arc<Outcome<T>>> {
        match &*self.inner.state.lock() {
            State::Done(outcome) => Some(Arc::clone(outcome)),
            State::Pending { .. } => None,
        }
    }

    /// Atomically checks for completion and registers a continuation.
    ///
    /// If the task is already terminal, `state` is handed back together with
    /// the outcome and `build` is never called. Otherwise `build` turns
    /// `state` into the continuation to queue plus a value returned to the
    /// caller. `build` runs under the state lock and must not block.
    pub(crate) fn attach<S, R, B>(&self, state: S, build: B) -> Attach<T, S, R>
    where
        B: FnOnce(S) -> (Continuation<T>, R),
    {
        self.mark_observed();
        let mut guard = self.inner.state.lock();
        match &mut *guard {
            State::Done(outcome) => Attach::Ready(Arc::clone(outcome), state),
            State::Pending { continuations, .. } => {
                let (continuation, ret) = build(state);
                continuations.push(continuation);
                Attach::Queued(ret)
            }
        }
    }
}

impl<T> Task<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Runs `f` inline and wraps its result in a task.
    ///
    /// If `token` is already cancelled, `f` never runs and the task is
    /// cancelled. A panic inside `f` becomes a fault.
    pub fn run_synchronously<F, R>(f: F, token: &CancelToken) -> Self
    where
        F: FnOnce() -> R,
        R: IntoTask<Output = T>,
    {
        if token.is_cancelled() {
            return Self::cancelled();
        }
        invoke_guarded(|| f().into_task())
    }

    /// Returns a clone of the terminal state, marking it observed.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome<T>> {
        self.peek().map(|outcome| {
            self.mark_observed();
            (*outcome).clone()
        })
    }

    /// Blocks the current thread until the task completes.
    ///
    /// Do not call this from a context that must run the task's own
    /// continuations (for example the draining thread of a `QueueContext`),
    /// or from inside a continuation.
    pub fn wait(&self) -> Outcome<T> {
        futures_lite::future::block_on(self.clone())
    }

    /// Copies this task's eventual outcome into `source`.
    pub(crate) fn forward_to(&self, source: CompletionSource<T>) {
        let attached = self.attach(source, |source| {
            let continuation: Continuation<T> = Box::new(move |outcome: &Outcome<T>| {
                source.try_set_outcome(outcome.clone());
            });
            (continuation, ())
        });
        if let Attach::Ready(outcome, source) = attached {
            source.try_set_outcome((*outcome).clone());
        }
    }
}

impl<T> Future for Task<T>
where
    T: Clone,
{
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock();
        match &mut *state {
            State::Done(outcome) => {
                let outcome = (**outcome).clone();
                drop(state);
                self.mark_observed();
                Poll::Ready(outcome)
            }
            State::Pending { wakers, .. } => {
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Runs user code, converting a panic into a faulted task.
pub(crate) fn invoke_guarded<U, F>(f: F) -> Task<U>
where
    F: FnOnce() -> Task<U>,
{
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let error = PanicError::from_payload(payload.as_ref());
        trace!(message = error.message(), "continuation panicked");
        Task::faulted(error)
    })
}

/// Conversion of a continuation's return value into a task.
///
/// - `()` becomes a completed `Task<()>`
/// - `Result<U, E>` becomes a succeeded or faulted task
/// - `Outcome<U>` becomes a task in that state
/// - `Task<U>` is adopted as is
pub trait IntoTask {
    /// Value type of the resulting task.
    type Output;

    /// Performs the conversion.
    fn into_task(self) -> Task<Self::Output>;
}

impl IntoTask for () {
    type Output = ();

    fn into_task(self) -> Task<()> {
        Task::completed()
    }
}

impl<U, E> IntoTask for Result<U, E>
where
    E: Into<Fault>,
{
    type Output = U;

    fn into_task(self) -> Task<U> {
        Task::from_outcome(self.into())
    }
}

impl<U> IntoTask for Outcome<U> {
    type Output = U;

    fn into_task(self) -> Task<U> {
        Task::from_outcome(self)
    }
}

impl<U> IntoTask for Task<U> {
    type Output = U;

    fn into_task(self) -> Self {
        self
    }
}

/// Producer side of a [`Task`].
///
/// Exactly one terminal state is ever published; later attempts are
/// rejected. Dropping an unset source leaves its task pending.
///
/// # Example
///
/// ```
/// use taskchain::CompletionSource;
///
/// let source = CompletionSource::new();
/// let task = source.task();
/// assert!(source.try_set_result(42));
/// assert!(!source.try_set_cancelled());
/// assert_eq!(task.try_get_result(), Some(42));
/// ```
pub struct CompletionSource<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for CompletionSource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> Default for CompletionSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> CompletionSource<T> {
    /// Creates a source with a pending task.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::pending()),
        }
    }

    /// Returns the task driven by this source.
    #[must_use]
    pub fn task(&self) -> Task<T> {
        Task {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Attempts to publish `outcome`; returns `false` if already completed.
    pub fn try_set_outcome(&self, outcome: Outcome<T>) -> bool {
        self.inner.complete(outcome)
    }

    /// Attempts to complete with a value.
    pub fn try_set_result(&self, value: T) -> bool {
        self.try_set_outcome(Outcome::Ok(value))
    }

    /// Attempts to complete with a fault.
    pub fn try_set_fault(&self, fault: impl Into<Fault>) -> bool {
        self.try_set_outcome(Outcome::Faulted(fault.into()))
    }

    /// Attempts to complete as cancelled.
    pub fn try_set_cancelled(&self) -> bool {
        self.try_set_outcome(Outcome::Cancelled)
    }

    /// Completes with a value.
    pub fn set_result(&self, value: T) -> Result<(), crate::error::AlreadyCompleted> {
        self.try_set_result(value)
            .then_some(())
            .ok_or(crate::error::AlreadyCompleted)
    }

    /// Completes with a fault.
    pub fn set_fault(&self, fault: impl Into<Fault>) -> Result<(), crate::error::AlreadyCompleted> {
        self.try_set_fault(fault)
            .then_some(())
            .ok_or(crate::error::AlreadyCompleted)
    }

    /// Completes as cancelled.
    pub fn set_cancelled(&self) -> Result<(), crate::error::AlreadyCompleted> {
        self.try_set_cancelled()
            .then_some(())
            .ok_or(crate::error::AlreadyCompleted)
    }

    /// Returns true once the task reached a terminal state.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(&*self.inner.state.lock(), State::Done(_))
    }
}

impl<T: 'static> fmt::Debug for CompletionSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSource")
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}
