//! Task state and continuation dispatch.
//!
//! - [`task`]: the [`Task`] handle, its [`CompletionSource`], and [`IntoTask`]
//! - [`context`]: ambient execution contexts that continuations are marshaled to

pub mod context;
pub mod task;

pub use context::{ContextGuard, Job, QueueContext, SyncContext, current, enter};
pub use task::{CompletionSource, IntoTask, Task};
