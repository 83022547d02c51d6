//! EegWindow: fixed-duration multi-channel sample buffer

use crate::eeg_types::EegMetadata;
use crate::error::{EegError, EegResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit of analysis: `channels × samples` at a fixed sample rate
#[derive(Debug, Clone)]
pub struct EegWindow {
    /// Unique identifier for this window
    pub id: Uuid,
    /// Sample data, one vector per channel
    channels: Vec<Vec<f64>>,
    /// Window metadata
    pub metadata: EegMetadata,
}

impl EegWindow {
    /// Create new window from per-channel sample vectors
    pub fn new(channels: Vec<Vec<f64>>, metadata: EegMetadata) -> EegResult<Self> {
        if channels.len() != metadata.channel_count() {
            return Err(EegError::InvalidWindow {
                reason: format!(
                    "{} channels of data for {} electrodes",
                    channels.len(),
                    metadata.channel_count()
                ),
            });
        }

        let samples = channels.first().map(|c| c.len()).unwrap_or(0);
        if let Some((index, channel)) = channels.iter().enumerate().find(|(_, c)| c.len() != samples) {
            return Err(EegError::InvalidWindow {
                reason: format!(
                    "channel {} has {} samples, expected {}",
                    index,
                    channel.len(),
                    samples
                ),
            });
        }

        Ok(EegWindow {
            id: Uuid::new_v4(),
            channels,
            metadata,
        })
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Check if window holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }

    /// Get channel count
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Get sampling rate
    pub fn sampling_rate(&self) -> f64 {
        self.metadata.sampling_rate
    }

    /// Get window duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples_per_channel() as f64 / self.metadata.sampling_rate
    }

    /// Get data for a specific channel
    pub fn channel_data(&self, channel_index: usize) -> EegResult<&[f64]> {
        self.channels
            .get(channel_index)
            .map(|c| c.as_slice())
            .ok_or_else(|| EegError::InvalidWindow {
                reason: format!(
                    "channel index {} out of bounds (0-{})",
                    channel_index,
                    self.channels.len().saturating_sub(1)
                ),
            })
    }

    /// Get all channel data
    pub fn all_channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Build a window sharing this one's metadata with new channel data
    pub fn with_channels(&self, channels: Vec<Vec<f64>>) -> EegResult<Self> {
        EegWindow::new(channels, self.metadata.clone())
    }

    /// Whether the window is long enough for an analysis window
    pub fn has_at_least(&self, samples: usize) -> bool {
        self.samples_per_channel() >= samples
    }

    /// Keep only the most recent `samples` per channel
    pub fn tail(&self, samples: usize) -> EegResult<Self> {
        let available = self.samples_per_channel();
        if available < samples {
            return Err(EegError::InsufficientData {
                required: samples,
                available,
            });
        }

        let start = available - samples;
        let channels = self.channels.iter().map(|c| c[start..].to_vec()).collect();
        self.with_channels(channels)
    }

    /// Pointwise mean across channels
    pub fn channel_mean(&self) -> Vec<f64> {
        let samples = self.samples_per_channel();
        let count = self.channels.len();
        if count == 0 {
            return Vec::new();
        }

        let mut mean = vec![0.0; samples];
        for channel in &self.channels {
            for (acc, &x) in mean.iter_mut().zip(channel) {
                *acc += x;
            }
        }
        for acc in &mut mean {
            *acc /= count as f64;
        }
        mean
    }

    /// Calculate basic statistics for a channel
    pub fn channel_stats(&self, channel_index: usize) -> EegResult<ChannelStats> {
        let data = self.channel_data(channel_index)?;
        Ok(ChannelStats::calculate(data))
    }
}

/// Basic statistics for a single channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub rms: f64,
}

impl ChannelStats {
    /// Calculate statistics for channel data
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return ChannelStats {
                mean: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                rms: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        ChannelStats {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            rms,
        }
    }
}
