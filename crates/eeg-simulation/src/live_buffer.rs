//! Wall-clock paced sample buffer over the EEG simulator

use crate::eeg_simulator::EegSimulator;
use eeg_core::{EegResult, EegWindow};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

/// Ring buffer that fills at the simulator's sample rate as time passes
///
/// Mirrors a headset board buffer: right after start it holds little data,
/// and it never holds more than `capacity` samples per channel.
pub struct LiveSampleBuffer {
    simulator: EegSimulator,
    channels: Vec<VecDeque<f64>>,
    capacity: usize,
    produced: u64,
}

impl LiveSampleBuffer {
    pub fn new(simulator: EegSimulator, capacity: usize) -> Self {
        let channel_count = simulator.metadata().channel_count();
        LiveSampleBuffer {
            simulator,
            channels: vec![VecDeque::with_capacity(capacity); channel_count],
            capacity,
            produced: 0,
        }
    }

    /// Generate every sample due by `elapsed` since start; returns how many were added
    pub fn advance_to(&mut self, elapsed: Duration) -> usize {
        let due = (elapsed.as_secs_f64() * self.simulator.metadata().sampling_rate).floor() as u64;
        if due <= self.produced {
            return 0;
        }

        let mut pending = due - self.produced;
        // Samples that would be evicted immediately are skipped, not generated
        let overflow = pending.saturating_sub(self.capacity as u64);
        if overflow > 0 {
            self.simulator.skip_samples(overflow);
            self.produced += overflow;
            pending -= overflow;
        }

        let fresh = self.simulator.generate_samples(pending as usize);
        for (buffer, samples) in self.channels.iter_mut().zip(fresh) {
            buffer.extend(samples);
            while buffer.len() > self.capacity {
                buffer.pop_front();
            }
        }
        self.produced += pending;

        trace!(added = pending, buffered = self.buffered(), "Synthetic samples generated");
        pending as usize
    }

    /// Samples per channel currently held
    pub fn buffered(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Window of the most recent `samples` (or fewer, if not yet buffered)
    pub fn latest(&self, samples: usize) -> EegResult<EegWindow> {
        let take = samples.min(self.buffered());
        let channels = self
            .channels
            .iter()
            .map(|buffer| buffer.iter().skip(buffer.len() - take).copied().collect())
            .collect();
        EegWindow::new(channels, self.simulator.metadata().clone())
    }
}
