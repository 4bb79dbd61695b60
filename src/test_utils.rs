//! Test utilities for taskchain.
//!
//! This module provides shared helpers for unit and integration tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - Outcome assertion macros
//! - A counting [`SyncContext`] that runs each posted job on its own thread
//!
//! # Example
//! ```
//! use taskchain::test_utils::{CountingContext, init_test_logging};
//! use taskchain::{CompletionSource, Fault, runtime::enter};
//!
//! init_test_logging();
//! let ctx = CountingContext::new();
//! let source = CompletionSource::new();
//! let chained = {
//!     let _guard = enter(ctx.clone());
//!     source.task().then(|v: u32| Ok::<_, Fault>(v + 1))
//! };
//! source.try_set_result(1);
//! ctx.join();
//! assert_eq!(ctx.posted(), 1);
//! assert_eq!(chained.try_get_result(), Some(2));
//! ```

use crate::runtime::{Job, SyncContext, enter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once, Weak};
use std::thread::{JoinHandle, ThreadId};

static INIT_LOGGING: Once = Once::new();

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Assert that an outcome is Ok with a specific value.
#[macro_export]
macro_rules! assert_outcome_ok {
    ($outcome:expr, $expected:expr) => {
        match $outcome {
            $crate::types::Outcome::Ok(v) => assert_eq!(v, $expected),
            other => unreachable!("expected Outcome::Ok({:?}), got {:?}", $expected, other),
        }
    };
}

/// Assert that an outcome is Cancelled.
#[macro_export]
macro_rules! assert_outcome_cancelled {
    ($outcome:expr) => {
        match $outcome {
            $crate::types::Outcome::Cancelled => {}
            other => unreachable!("expected Outcome::Cancelled, got {:?}", other),
        }
    };
}

/// Assert that an outcome is Faulted with a primary error of the given type.
#[macro_export]
macro_rules! assert_outcome_faulted {
    ($outcome:expr, $error:ty) => {
        match $outcome {
            $crate::types::Outcome::Faulted(fault) => assert!(
                fault.is::<$error>(),
                "expected fault of type {}, got {}",
                stringify!($error),
                fault
            ),
            other => unreachable!("expected Outcome::Faulted, got {:?}", other),
        }
    };
}

/// Error type for tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("TestError: {0}")]
pub struct TestError(pub String);

impl TestError {
    /// Creates a test error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A [`SyncContext`] that counts posts and runs each job on a fresh thread.
///
/// The context is ambient on the worker thread while the job runs, so
/// continuations chained from inside a job are marshaled back through it.
#[derive(Debug)]
pub struct CountingContext {
    me: Weak<Self>,
    posted: AtomicUsize,
    workers: Mutex<Vec<JoinHandle<()>>>,
    threads: Mutex<Vec<ThreadId>>,
}

impl CountingContext {
    /// Creates a new context.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            posted: AtomicUsize::new(0),
            workers: Mutex::new(Vec::new()),
            threads: Mutex::new(Vec::new()),
        })
    }

    /// Number of jobs posted so far.
    #[must_use]
    pub fn posted(&self) -> usize {
        self.posted.load(Ordering::SeqCst)
    }

    /// Thread ids that ran posted jobs, in start order.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().clone()
    }

    /// Waits for every posted job, including jobs posted by other jobs.
    pub fn join(&self) {
        loop {
            let workers = std::mem::take(&mut *self.workers.lock());
            if workers.is_empty() {
                return;
            }
            for worker in workers {
                if let Err(payload) = worker.join() {
                    std::panic::resume_unwind(payload);
                }
            }
        }
    }
}

impl SyncContext for CountingContext {
    fn post(&self, job: Job) {
        let count = self.posted.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(posted = count, "counting context received job");
        let me = self.me.upgrade();
        let worker = std::thread::spawn(move || {
            let _guard = me.map(|ctx| {
                ctx.threads.lock().push(std::thread::current().id());
                enter(ctx)
            });
            job();
        });
        self.workers.lock().push(worker);
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}
