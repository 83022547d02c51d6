//! Window processor trait and per-window latency timing

use eeg_core::{EegWindow, EegResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A transform from one window to a new window of the same shape
///
/// Implementations keep no sample history: each call starts from zero
/// initial conditions.
pub trait SignalProcessor: Send + Sync {
    fn process(&self, input: &EegWindow) -> EegResult<EegWindow>;

    /// Short label used in logs
    fn name(&self) -> &str;

    /// Rough cost of one call, in microseconds
    fn latency_estimate(&self) -> u64 {
        1000
    }
}

/// Timing and outcome of one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetrics {
    pub processing_time_us: u64,
    /// Samples per channel in the window
    pub samples: usize,
    /// False when the window was rejected
    pub success: bool,
    pub error_message: Option<String>,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self {
            processing_time_us: 0,
            samples: 0,
            success: true,
            error_message: None,
        }
    }

    /// Start the clock for one window
    pub fn start_timing() -> ProcessingTimer {
        ProcessingTimer {
            start_time: Instant::now(),
            metrics: ProcessingMetrics::new(),
        }
    }
}

impl Default for ProcessingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Running clock returned by `ProcessingMetrics::start_timing`
pub struct ProcessingTimer {
    start_time: Instant,
    metrics: ProcessingMetrics,
}

impl ProcessingTimer {
    pub fn finish(mut self) -> ProcessingMetrics {
        self.stop();
        self.metrics
    }

    /// Stop the clock and mark the window rejected
    pub fn finish_with_error(mut self, error: &str) -> ProcessingMetrics {
        self.stop();
        self.metrics.success = false;
        self.metrics.error_message = Some(error.to_string());
        self.metrics
    }

    fn stop(&mut self) {
        self.metrics.processing_time_us = self.start_time.elapsed().as_micros() as u64;
    }

    pub fn set_samples(&mut self, samples: usize) {
        self.metrics.samples = samples;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_processing_metrics() {
        let mut timer = ProcessingMetrics::start_timing();
        timer.set_samples(250);
        std::thread::sleep(Duration::from_millis(1));
        let metrics = timer.finish();

        assert!(metrics.processing_time_us > 0);
        assert_eq!(metrics.samples, 250);
        assert!(metrics.success);
    }

    #[test]
    fn test_finish_with_error() {
        let timer = ProcessingMetrics::start_timing();
        let metrics = timer.finish_with_error("alpha power is zero");

        assert!(!metrics.success);
        assert_eq!(metrics.error_message.as_deref(), Some("alpha power is zero"));
    }
}
