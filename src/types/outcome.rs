//! Three-valued terminal state of a task.
//!
//! A completed task ends in exactly one of:
//!
//! - `Ok(T)`: ran to completion with a value
//! - `Faulted(Fault)`: one or more captured errors
//! - `Cancelled`: stopped cooperatively, with no value and no error
//!
//! [`TaskStatus`] adds the `Pending` state for tasks that have not finished.

use crate::error::{Fault, TaskError};
use core::fmt;

/// Terminal state of a task.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Ran to completion with a value.
    Ok(T),
    /// Completed with captured errors.
    Faulted(Fault),
    /// Completed by cooperative cancellation.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Returns the status corresponding to this outcome.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        match self {
            Self::Ok(_) => TaskStatus::RanToCompletion,
            Self::Faulted(_) => TaskStatus::Faulted,
            Self::Cancelled => TaskStatus::Cancelled,
        }
    }

    /// Returns true if this outcome is `Ok`.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Returns true if this outcome is `Faulted`.
    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }

    /// Returns true if this outcome is `Cancelled`.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the success value, discarding any other state.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Faulted(fault) => Some(fault),
            _ => None,
        }
    }

    /// Borrows the success value.
    #[must_use]
    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Self::Ok(v) => Outcome::Ok(v),
            Self::Faulted(fault) => Outcome::Faulted(fault.clone()),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Maps the success value using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Self::Ok(v) => Outcome::Ok(f(v)),
            Self::Faulted(fault) => Outcome::Faulted(fault),
            Self::Cancelled => Outcome::Cancelled,
        }
    }

    /// Converts this outcome into a standard `Result`.
    pub fn into_result(self) -> Result<T, TaskError> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::Faulted(fault) => Err(TaskError::Faulted(fault)),
            Self::Cancelled => Err(TaskError::Cancelled),
        }
    }

    /// Returns the success value or panics.
    ///
    /// # Panics
    ///
    /// Panics if the outcome is not `Ok`.
    #[track_caller]
    pub fn unwrap(self) -> T {
        match self {
            Self::Ok(v) => v,
            Self::Faulted(fault) => {
                panic!("called `Outcome::unwrap()` on a `Faulted` value: {fault}")
            }
            Self::Cancelled => panic!("called `Outcome::unwrap()` on a `Cancelled` value"),
        }
    }

    /// Returns the success value or a default.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Ok(v) => v,
            _ => default,
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: Into<Fault>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Faulted(e.into()),
        }
    }
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// Not yet complete.
    Pending,
    /// Completed with a value.
    RanToCompletion,
    /// Completed with a fault.
    Faulted,
    /// Completed by cancellation.
    Cancelled,
}

impl TaskStatus {
    /// Returns true for every state except `Pending`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns the status name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::RanToCompletion => "ran-to-completion",
            Self::Faulted => "faulted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
