//! Taskchain: continuation combinators over completion-source tasks.
//!
//! # Overview
//!
//! A [`Task`] completes exactly once, with a value, a [`Fault`], or a
//! cancellation. Combinators chain work onto a task without blocking:
//!
//! - [`Task::then`]: continue with the value; faults and cancellations pass
//!   through untouched
//! - [`Task::catch`]: replace a fault with a recovery task
//! - [`Task::finally`]: run cleanup whatever the outcome
//! - [`Task::copy_result_to`]: bridge a chain into a [`CompletionSource`]
//! - [`Task::try_get_result`]: read a finished value without blocking
//!
//! # Core Guarantees
//!
//! - **No lost continuations**: the completion check and registration are one
//!   atomic step, so a continuation added while the task completes still runs
//! - **Context affinity**: user code runs inline when the antecedent is already
//!   complete, and is otherwise posted exactly once to the [`SyncContext`]
//!   captured when the combinator was called
//! - **Opaque propagation**: a fault skips every later `then` stage and
//!   surfaces intact at the first `catch` or at the end of the chain
//! - **Panic containment**: a panic in user code becomes a [`PanicError`] fault
//!
//! # Module Structure
//!
//! - [`types`]: [`Outcome`], [`TaskStatus`], cancellation tokens
//! - [`runtime`]: [`Task`], [`CompletionSource`], execution contexts
//! - [`combinator`]: `then`, `catch`, `finally`, copy, `try_get`, inspect, `when_all`
//! - [`error`](mod@error): [`Fault`] and the crate's error types
//! - [`observability`]: begin/end operation tracing
//! - [`config`]: tracer configuration
//! - [`tracing_compat`]: Optional tracing integration (requires `tracing-integration` feature)
//!
//! # Example
//!
//! ```
//! use taskchain::{CompletionSource, Fault, Task};
//!
//! let request = CompletionSource::new();
//! let response = request
//!     .task()
//!     .then(|body: String| Ok::<_, Fault>(body.len()))
//!     .catch(|_fault| Task::<usize>::from_result(0))
//!     .finally(|| ());
//!
//! assert_eq!(response.try_get_result(), None);
//! request.try_set_result("hello".to_string());
//! assert_eq!(response.try_get_result(), Some(5));
//! ```
//!
//! [`SyncContext`]: runtime::SyncContext
//! [`PanicError`]: error::PanicError

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod config;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod tracing_compat;
pub mod types;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

// Re-exports for convenient access to core types
pub use combinator::when_all;
pub use config::{ConfigError, TracerConfig};
pub use error::{AlreadyCompleted, Fault, PanicError, Result, TaskError, UsageError};
pub use observability::{
    MemoryTraceWriter, TraceKind, TraceLevel, TraceRecord, TraceScope, TraceWriter,
    TracingWriter, trace_begin_end, trace_begin_end_async,
};
pub use runtime::{CompletionSource, IntoTask, Task};
pub use types::{CancelSource, CancelToken, Outcome, TaskStatus};
