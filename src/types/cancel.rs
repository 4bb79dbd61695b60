//! Cancellation signal types.
//!
//! Cancellation is cooperative. A [`CancelSource`] owns the signal; the
//! [`CancelToken`]s it hands out only let the holder ask "has cancellation been
//! requested?". Combinators sample a token once, when their antecedent
//! completes, and never cancel or retain ownership of it.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Read side of a cancellation signal.
///
/// The default token can never be cancelled.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    /// Returns a token that is never cancelled.
    #[must_use]
    pub const fn none() -> Self {
        Self { flag: None }
    }

    /// Returns a token that is already cancelled.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(true))),
        }
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Returns true if this token can ever become cancelled.
    #[must_use]
    pub const fn can_be_cancelled(&self) -> bool {
        self.flag.is_some()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("can_be_cancelled", &self.can_be_cancelled())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Owner of a cancellation signal.
///
/// # Example
///
/// ```
/// use taskchain::types::CancelSource;
///
/// let source = CancelSource::new();
/// let token = source.token();
/// assert!(!token.is_cancelled());
///
/// source.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Default)]
pub struct CancelSource {
    flag: Arc<AtomicBool>,
}

impl CancelSource {
    /// Creates a new, unsignaled source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a token observing this source.
    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            flag: Some(Arc::clone(&self.flag)),
        }
    }

    /// Requests cancellation.
    ///
    /// Returns `true` if this call changed the state.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }

    /// Returns true if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
