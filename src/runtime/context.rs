//! Ambient execution contexts for continuation dispatch.
//!
//! A [`SyncContext`] is a "where should callbacks run" target, such as a UI
//! thread's message loop. Code installs one on the current thread with
//! [`enter`]; every combinator captures the innermost installed context at the
//! moment it is called. When the antecedent is still pending at that moment,
//! the continuation that runs user code is later submitted to the captured
//! context with exactly one [`SyncContext::post`].
//!
//! Contexts are a thread-local stack, never a process global: a guard pops its
//! own entry on drop, even when guards are dropped out of order.

use crate::tracing_compat::trace;
use crossbeam_queue::SegQueue;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A unit of work submitted to a context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A callback-dispatch target.
pub trait SyncContext: Send + Sync + 'static {
    /// Submits a job to run on this context.
    ///
    /// Implementations must run every posted job exactly once.
    fn post(&self, job: Job);

    /// Short name used in logs.
    fn name(&self) -> &'static str {
        "sync-context"
    }
}

#[derive(Clone)]
struct ContextStackEntry {
    id: u64,
    context: Arc<dyn SyncContext>,
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextStackEntry>> = const { RefCell::new(Vec::new()) };
}

static NEXT_CONTEXT_GUARD_ID: AtomicU64 = AtomicU64::new(1);

/// Installs `context` as the ambient context of the current thread.
///
/// The context stays ambient until the returned guard is dropped.
#[must_use = "the context is uninstalled when the guard is dropped"]
pub fn enter(context: Arc<dyn SyncContext>) -> ContextGuard {
    let id = NEXT_CONTEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed);
    CONTEXT_STACK.with(|stack| {
        stack.borrow_mut().push(ContextStackEntry { id, context });
    });
    ContextGuard {
        id,
        _not_send: PhantomData,
    }
}

/// Returns the innermost ambient context of the current thread, if any.
#[must_use]
pub fn current() -> Option<Arc<dyn SyncContext>> {
    CONTEXT_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|entry| Arc::clone(&entry.context))
    })
}

/// Guard for an installed ambient context.
pub struct ContextGuard {
    id: u64,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|entry| entry.id == self.id) {
                stack.remove(pos);
            }
        });
    }
}

impl fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextGuard").field("id", &self.id).finish()
    }
}

/// A context snapshot taken when a combinator is invoked.
#[derive(Clone, Default)]
pub(crate) struct CapturedContext {
    context: Option<Arc<dyn SyncContext>>,
}

impl CapturedContext {
    pub(crate) fn capture() -> Self {
        Self { context: current() }
    }

    /// Runs `job` through the captured context, or inline when none was ambient.
    pub(crate) fn dispatch(&self, combinator: &'static str, job: Job) {
        match &self.context {
            Some(context) => {
                trace!(
                    combinator,
                    context = context.name(),
                    "posting continuation to captured context"
                );
                context.post(job);
            }
            None => job(),
        }
    }
}

/// A single-consumer context that queues posted jobs.
///
/// This is the analogue of a UI thread: jobs posted from any thread wait in
/// the queue until the owning thread calls [`QueueContext::run_until_idle`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskchain::runtime::{QueueContext, SyncContext};
///
/// let ctx = Arc::new(QueueContext::new());
/// ctx.post(Box::new(|| {}));
/// assert_eq!(ctx.pending(), 1);
/// assert_eq!(ctx.run_until_idle(), 1);
/// assert_eq!(ctx.posted(), 1);
/// ```
#[derive(Default)]
pub struct QueueContext {
    queue: SegQueue<Job>,
    posted: AtomicUsize,
}

impl QueueContext {
    /// Creates an empty queue context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of jobs ever posted.
    #[must_use]
    pub fn posted(&self) -> usize {
        self.posted.load(Ordering::Acquire)
    }

    /// Number of jobs waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Runs queued jobs on the calling thread until the queue is empty.
    ///
    /// The context is ambient while jobs run, so continuations chained from
    /// inside a job are marshaled back to this queue. Returns the number of
    /// jobs run.
    pub fn run_until_idle(self: &Arc<Self>) -> usize {
        let _guard = enter(Arc::clone(self) as Arc<dyn SyncContext>);
        let mut ran = 0;
        while let Some(job) = self.queue.pop() {
            job();
            ran += 1;
        }
        ran
    }
}

impl SyncContext for QueueContext {
    fn post(&self, job: Job) {
        self.posted.fetch_add(1, Ordering::AcqRel);
        self.queue.push(job);
    }

    fn name(&self) -> &'static str {
        "queue"
    }
}

impl fmt::Debug for QueueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueContext")
            .field("posted", &self.posted())
            .field("pending", &self.pending())
            .finish()
    }
}
