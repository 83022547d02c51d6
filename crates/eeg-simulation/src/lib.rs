//! EEG-Simulation: synthetic EEG and metric generation
//!
//! Stand-ins for the headset when none is connected: a rhythm-based EEG
//! generator, a wall-clock sample buffer, and the direct metric simulator.

pub mod signal_patterns;
pub mod eeg_simulator;
pub mod live_buffer;
pub mod metric_simulator;

pub use eeg_simulator::*;
pub use live_buffer::*;
pub use metric_simulator::*;
pub use signal_patterns::*;
