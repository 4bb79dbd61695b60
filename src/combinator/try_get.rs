//! Non-blocking result extraction.

use crate::runtime::Task;
use crate::types::Outcome;

impl<T: Clone> Task<T> {
    /// Returns the value if this task already succeeded.
    ///
    /// Pending, faulted and cancelled tasks yield `None`. Never blocks and
    /// never marks a fault as observed.
    #[must_use]
    pub fn try_get_result(&self) -> Option<T> {
        match &*self.peek()? {
            Outcome::Ok(value) => Some(value.clone()),
            Outcome::Faulted(_) | Outcome::Cancelled => None,
        }
    }
}
