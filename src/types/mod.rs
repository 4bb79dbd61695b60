//! Core types shared by every combinator.
//!
//! - [`outcome`]: Three-valued terminal state and task status
//! - [`cancel`]: Cancellation source and token

pub mod cancel;
pub mod outcome;

pub use cancel::{CancelSource, CancelToken};
pub use outcome::{Outcome, TaskStatus};
