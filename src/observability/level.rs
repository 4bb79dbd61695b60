//! Trace severity levels.

use core::fmt;
use serde::Deserialize;

/// Severity level for trace records.
///
/// Levels are ordered from least to most severe, with `Off` above every real
/// level. A writer configured with `min_level = Off` emits nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TraceLevel {
    /// Debugging information for development.
    Debug = 0,
    /// General informational messages.
    #[default]
    Info = 1,
    /// Potentially problematic situations, including cancellations.
    Warn = 2,
    /// Failed operations.
    Error = 3,
    /// Failures the process cannot recover from.
    Fatal = 4,
    /// Disables tracing.
    Off = 5,
}

impl TraceLevel {
    /// Returns the level name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Off => "OFF",
        }
    }

    /// Returns true if a record at this level passes a `min` threshold.
    ///
    /// `Off` records never pass.
    #[must_use]
    pub const fn is_at_least(self, min: Self) -> bool {
        !matches!(self, Self::Off) && self as u8 >= min as u8
    }

    /// Maps to the structured-logging level used when forwarding records.
    #[must_use]
    pub const fn as_tracing_level(self) -> Option<crate::tracing_compat::Level> {
        use crate::tracing_compat::Level;
        match self {
            Self::Debug => Some(Level::DEBUG),
            Self::Info => Some(Level::INFO),
            Self::Warn => Some(Level::WARN),
            Self::Error | Self::Fatal => Some(Level::ERROR),
            Self::Off => None,
        }
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
