//! EEG acquisition metadata and electrode montage

use serde::{Deserialize, Serialize};
use crate::error::{EegError, EegResult};

/// Sample rate used by the headset deployments (Hz)
pub const DEFAULT_SAMPLE_RATE: f64 = 250.0;

/// 10-20 system electrode positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Electrode {
    Fp1,
    Fp2,
    F3,
    F4,
    C3,
    C4,
    O1,
    O2,
    Other(u8), // For extensibility
}

impl Electrode {
    /// Two-channel frontal montage of the reference headset
    pub fn frontal_pair() -> Vec<Electrode> {
        vec![Electrode::Fp1, Electrode::Fp2]
    }

    /// Montage for an arbitrary channel count, frontal pair first
    pub fn montage(channel_count: usize) -> Vec<Electrode> {
        const ORDER: [Electrode; 8] = [
            Electrode::Fp1,
            Electrode::Fp2,
            Electrode::F3,
            Electrode::F4,
            Electrode::C3,
            Electrode::C4,
            Electrode::O1,
            Electrode::O2,
        ];
        (0..channel_count)
            .map(|i| ORDER.get(i).copied().unwrap_or(Electrode::Other(i as u8)))
            .collect()
    }
}

/// EEG window metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EegMetadata {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Electrode for each channel, in channel order
    pub electrodes: Vec<Electrode>,
    /// Device name the samples came from
    pub device: String,
}

impl EegMetadata {
    /// Create new EEG metadata
    pub fn new(sampling_rate: f64, electrodes: Vec<Electrode>, device: impl Into<String>) -> EegResult<Self> {
        Self::validate_sampling_rate(sampling_rate)?;
        Self::validate_channel_count(electrodes.len())?;

        Ok(EegMetadata {
            sampling_rate,
            electrodes,
            device: device.into(),
        })
    }

    /// Validate sampling rate for EEG signals
    pub fn validate_sampling_rate(rate: f64) -> EegResult<()> {
        const MIN_RATE: f64 = 100.0;
        const MAX_RATE: f64 = 2000.0;

        if !(MIN_RATE..=MAX_RATE).contains(&rate) {
            Err(EegError::InvalidConfig {
                reason: format!("sampling rate {}Hz outside {}-{}Hz", rate, MIN_RATE, MAX_RATE),
            })
        } else {
            Ok(())
        }
    }

    /// Validate channel count for EEG headsets
    pub fn validate_channel_count(count: usize) -> EegResult<()> {
        const MAX_CHANNELS: usize = 32;

        if count == 0 || count > MAX_CHANNELS {
            Err(EegError::InvalidConfig {
                reason: format!("channel count {} outside 1-{}", count, MAX_CHANNELS),
            })
        } else {
            Ok(())
        }
    }

    /// Number of channels described by this metadata
    pub fn channel_count(&self) -> usize {
        self.electrodes.len()
    }
}

impl Default for EegMetadata {
    fn default() -> Self {
        EegMetadata {
            sampling_rate: DEFAULT_SAMPLE_RATE,
            electrodes: Electrode::frontal_pair(),
            device: "unknown".to_string(),
        }
    }
}

impl std::fmt::Display for Electrode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Electrode::Fp1 => write!(f, "Fp1"),
            Electrode::Fp2 => write!(f, "Fp2"),
            Electrode::F3 => write!(f, "F3"),
            Electrode::F4 => write!(f, "F4"),
            Electrode::C3 => write!(f, "C3"),
            Electrode::C4 => write!(f, "C4"),
            Electrode::O1 => write!(f, "O1"),
            Electrode::O2 => write!(f, "O2"),
            Electrode::Other(id) => write!(f, "Ch{}", id),
        }
    }
}
