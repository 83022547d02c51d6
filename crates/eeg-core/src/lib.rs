//! EEG-Core: Foundation types for the focus/stress stream
//!
//! Window container, acquisition metadata, wire message and the shared error type.

pub mod window;
pub mod eeg_types;
pub mod message;
pub mod error;

pub use window::*;
pub use eeg_types::*;
pub use message::*;
pub use error::{EegError, EegResult};
