//! Multi-channel EEG simulator built from mental-state rhythms

use crate::signal_patterns::MentalStatePattern;
use eeg_core::{config_error, EegMetadata, EegResult, Electrode, DEFAULT_SAMPLE_RATE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Noise configuration for synthetic EEG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian background noise standard deviation (µV)
    pub gaussian_std: f64,
    /// Slow electrode drift amplitude (µV)
    pub baseline_wander: f64,
    /// Mains interference amplitude (µV)
    pub powerline_amplitude: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 2.0,
            baseline_wander: 15.0,
            powerline_amplitude: 10.0,
        }
    }
}

/// Configuration for EEG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegSimulatorConfig {
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Electrode per simulated channel
    pub electrodes: Vec<Electrode>,
    /// Mental state driving the rhythms
    pub pattern: MentalStatePattern,
    pub noise: NoiseConfig,
    /// Mains frequency (50/60 Hz), `None` for none
    pub powerline_freq: Option<f64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl EegSimulatorConfig {
    /// Default config with `channel_count` channels of the standard montage
    pub fn with_channels(channel_count: usize) -> Self {
        Self {
            electrodes: Electrode::montage(channel_count),
            ..Self::default()
        }
    }
}

impl Default for EegSimulatorConfig {
    fn default() -> Self {
        Self {
            sampling_rate: DEFAULT_SAMPLE_RATE,
            electrodes: Electrode::frontal_pair(),
            pattern: MentalStatePattern::default(),
            noise: NoiseConfig::default(),
            powerline_freq: Some(50.0),
            seed: None,
        }
    }
}

/// EEG signal simulator
pub struct EegSimulator {
    config: EegSimulatorConfig,
    metadata: EegMetadata,
    rng: StdRng,
    normal_dist: Normal<f64>,
    /// Per channel, per rhythm phase offset
    phases: Vec<[f64; 4]>,
    sample_index: u64,
}

impl EegSimulator {
    /// Create new EEG simulator with configuration
    pub fn new(config: EegSimulatorConfig) -> EegResult<Self> {
        let metadata = EegMetadata::new(config.sampling_rate, config.electrodes.clone(), "synthetic")?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let normal_dist = Normal::new(0.0, config.noise.gaussian_std)
            .map_err(|e| config_error!("noise distribution: {}", e))?;

        let phases = (0..metadata.channel_count())
            .map(|_| {
                let mut channel = [0.0; 4];
                for phase in &mut channel {
                    *phase = rng.gen_range(0.0..2.0 * PI);
                }
                channel
            })
            .collect();

        Ok(EegSimulator {
            config,
            metadata,
            rng,
            normal_dist,
            phases,
            sample_index: 0,
        })
    }

    /// Generate the next `samples` samples for every channel
    pub fn generate_samples(&mut self, samples: usize) -> Vec<Vec<f64>> {
        let channel_count = self.metadata.channel_count();
        let mut channels = vec![Vec::with_capacity(samples); channel_count];

        for _ in 0..samples {
            let time = self.sample_index as f64 / self.config.sampling_rate;
            let amplitudes = self.config.pattern.amplitudes_at(time);
            let flat = self.config.pattern.is_flat();

            for (channel_idx, channel) in channels.iter_mut().enumerate() {
                let mut value = 0.0;
                for ((freq, amplitude), phase) in amplitudes
                    .components()
                    .iter()
                    .zip(&self.phases[channel_idx])
                {
                    value += amplitude * (2.0 * PI * freq * time + phase).sin();
                }

                if !flat {
                    value += self.normal_dist.sample(&mut self.rng);
                    value += self.config.noise.baseline_wander * (2.0 * PI * 0.2 * time).sin();
                    if let Some(freq) = self.config.powerline_freq {
                        value += self.config.noise.powerline_amplitude * (2.0 * PI * freq * time).sin();
                    }
                }

                channel.push(value);
            }

            self.sample_index += 1;
        }

        channels
    }

    /// Advance simulated time without producing samples
    pub fn skip_samples(&mut self, samples: u64) {
        self.sample_index += samples;
    }

    /// Metadata attached to generated windows
    pub fn metadata(&self) -> &EegMetadata {
        &self.metadata
    }

    /// Get current configuration
    pub fn config(&self) -> &EegSimulatorConfig {
        &self.config
    }
}
