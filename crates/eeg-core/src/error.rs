//! Error handling for the EEG metric stream
//!
//! One error type shared by every crate in the workspace. Artifact windows are
//! not errors; they surface as `RawMetrics { valid: false }` in processing.

use core::fmt;

/// Result type alias for EEG stream operations
pub type EegResult<T> = Result<T, EegError>;

/// Error type for all EEG stream operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EegError {
    /// Window shape or metadata is inconsistent
    InvalidWindow {
        /// Description of the window problem
        reason: String,
    },

    /// Configuration value out of range
    InvalidConfig {
        /// Description of the configuration error
        reason: String,
    },

    /// Filter coefficients could not be designed for the sample rate
    FilterDesign {
        /// Filter that failed
        filter: &'static str,
        /// Description of the design problem
        reason: String,
    },

    /// The real data source could not be connected
    SourceUnavailable {
        /// Source that failed
        source_name: String,
        /// Description of the failure
        reason: String,
    },

    /// Fewer samples buffered than one analysis window needs
    InsufficientData {
        /// Samples per channel required
        required: usize,
        /// Samples per channel available
        available: usize,
    },

    /// Unexpected failure while processing one window
    Processing {
        /// Error description
        message: String,
    },

    /// Serialization/deserialization error
    Serialization {
        /// Serialization error description
        reason: String,
    },

    /// The client transport went away
    TransportClosed,

    /// Releasing the data source failed
    Cleanup {
        /// Cleanup error description
        reason: String,
    },
}

impl fmt::Display for EegError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EegError::InvalidWindow { reason } => {
                write!(f, "Invalid window: {}", reason)
            }
            EegError::InvalidConfig { reason } => {
                write!(f, "Invalid configuration: {}", reason)
            }
            EegError::FilterDesign { filter, reason } => {
                write!(f, "Cannot design {} filter: {}", filter, reason)
            }
            EegError::SourceUnavailable { source_name, reason } => {
                write!(f, "Data source '{}' unavailable: {}", source_name, reason)
            }
            EegError::InsufficientData { required, available } => {
                write!(f, "Insufficient data: need {} samples per channel, have {}",
                       required, available)
            }
            EegError::Processing { message } => {
                write!(f, "Processing error: {}", message)
            }
            EegError::Serialization { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            EegError::TransportClosed => {
                write!(f, "Transport closed")
            }
            EegError::Cleanup { reason } => {
                write!(f, "Cleanup failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for EegError {}

impl From<serde_json::Error> for EegError {
    fn from(err: serde_json::Error) -> Self {
        EegError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl EegError {
    /// Whether the streaming loop can simply skip this tick and carry on
    pub fn is_per_tick(&self) -> bool {
        matches!(
            self,
            EegError::InsufficientData { .. }
                | EegError::InvalidWindow { .. }
                | EegError::Processing { .. }
        )
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::EegError::InvalidConfig {
            reason: format!($($arg)*),
        }
    };
}

/// Convenience macro for creating window errors
#[macro_export]
macro_rules! window_error {
    ($($arg:tt)*) => {
        $crate::error::EegError::InvalidWindow {
            reason: format!($($arg)*),
        }
    };
}
