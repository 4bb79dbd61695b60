//! Error types and fault model for task chains.
//!
//! Error handling follows these principles:
//!
//! - A faulted task carries a [`Fault`]: one or more shared errors, kept flat
//! - Faults pass through `then` untouched; only `catch` intercepts them
//! - Panics in user continuations are caught and converted to faults
//! - Misuse of the combinator contract is a [`UsageError`], reported as a fault
//!   on the returned task rather than a panic at the call site
//!
//! [`Fault`] deliberately does not implement [`std::error::Error`], so that any
//! error type converts into it with `?` or `.into()`.

use core::fmt;
use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

/// A captured error shared between every observer of a faulted task.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Result alias whose error side defaults to [`Fault`].
pub type Result<T, E = Fault> = std::result::Result<T, E>;

/// The error payload of a faulted task.
///
/// A fault holds at least one error. Faults from several children (see
/// [`when_all`](crate::combinator::when_all)) are aggregated into one flat
/// list; the first entry is the primary error.
///
/// # Example
///
/// ```
/// use taskchain::Fault;
///
/// #[derive(Debug)]
/// struct Boom;
/// impl std::fmt::Display for Boom {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "boom")
///     }
/// }
/// impl std::error::Error for Boom {}
///
/// let fault = Fault::new(Boom);
/// assert!(fault.is::<Boom>());
/// assert_eq!(fault.to_string(), "boom");
/// ```
#[derive(Clone)]
pub struct Fault {
    errors: Arc<[SharedError]>,
}

impl Fault {
    /// Creates a fault from a single error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_shared(Arc::new(error))
    }

    /// Creates a fault from an already shared error without re-wrapping it.
    #[must_use]
    pub fn from_shared(error: SharedError) -> Self {
        Self {
            errors: Arc::from(vec![error]),
        }
    }

    /// Aggregates several faults into one, preserving order.
    ///
    /// Nested aggregates are flattened. An empty input yields a
    /// [`UsageError::EmptyAggregate`] fault.
    pub fn aggregate<I>(faults: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let errors: Vec<SharedError> = faults
            .into_iter()
            .flat_map(|fault| fault.errors.to_vec())
            .collect();
        if errors.is_empty() {
            return Self::new(UsageError::EmptyAggregate);
        }
        Self {
            errors: Arc::from(errors),
        }
    }

    /// Returns the primary (first) error.
    #[must_use]
    pub fn primary(&self) -> &SharedError {
        &self.errors[0]
    }

    /// Returns every captured error.
    #[must_use]
    pub fn errors(&self) -> &[SharedError] {
        &self.errors
    }

    /// Returns the number of captured errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; a fault carries at least one error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if this fault aggregates more than one error.
    #[must_use]
    pub fn is_aggregate(&self) -> bool {
        self.errors.len() > 1
    }

    /// Reduces the fault to its single logical error.
    ///
    /// This is what `catch` handlers receive.
    #[must_use]
    pub fn flatten(&self) -> Self {
        if self.is_aggregate() {
            Self::from_shared(Arc::clone(self.primary()))
        } else {
            self.clone()
        }
    }

    /// Returns true if the primary error is of type `E`.
    #[must_use]
    pub fn is<E>(&self) -> bool
    where
        E: StdError + 'static,
    {
        self.downcast_ref::<E>().is_some()
    }

    /// Downcasts the primary error to a concrete type.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        let primary: &(dyn StdError + 'static) = self.primary().as_ref();
        primary.downcast_ref::<E>()
    }

    /// Returns true if both faults share the same primary error instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self.primary(), other.primary())
    }
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.errors.iter().map(|e| format!("{e:?}")))
            .finish()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.primary())?;
        if self.is_aggregate() {
            write!(f, " (+{} more)", self.errors.len() - 1)?;
        }
        Ok(())
    }
}

/// Misuse of the combinator contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// A `catch` handler returned no task.
    #[error(
        "a catch handler must not return None; return a valid task or a faulted task instead"
    )]
    MissingCatchTask,
    /// A fault was built from zero errors.
    #[error("cannot build a fault from an empty set of errors")]
    EmptyAggregate,
}

/// A panic raised by user code inside a continuation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("continuation panicked: {message}")]
pub struct PanicError {
    message: String,
}

impl PanicError {
    /// Creates a panic error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts a message from a payload returned by `catch_unwind`.
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Returned when a completion source has already reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("completion source already completed")]
pub struct AlreadyCompleted;

/// A non-successful terminal state, as an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    /// The task faulted.
    #[error("task faulted: {0}")]
    Faulted(Fault),
    /// The task was cancelled.
    #[error("task cancelled")]
    Cancelled,
}

impl TaskError {
    /// Returns the fault, if this is a fault.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Faulted(fault) => Some(fault),
            Self::Cancelled => None,
        }
    }

    /// Returns true if the task was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
