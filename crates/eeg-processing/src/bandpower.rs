//! Frequency-band power estimation from raw EEG windows

use crate::config::ProcessingConfig;
use crate::filters::FilterBank;
use crate::processor::SignalProcessor;
use crate::spectral::{PowerSpectrum, WelchEstimator};
use eeg_core::{window_error, EegResult, EegWindow};
use serde::{Deserialize, Serialize};

/// Inclusive frequency range in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl FrequencyBand {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        FrequencyBand { low_hz, high_hz }
    }

    pub fn contains(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz <= self.high_hz
    }
}

/// Band table used for the focus and stress ratios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EegBands {
    pub theta: FrequencyBand,
    pub alpha: FrequencyBand,
    pub beta: FrequencyBand,
    pub high_beta: FrequencyBand,
}

impl EegBands {
    /// Bands with their display names, lowest first
    pub fn named(&self) -> [(&'static str, &FrequencyBand); 4] {
        [
            ("theta", &self.theta),
            ("alpha", &self.alpha),
            ("beta", &self.beta),
            ("high_beta", &self.high_beta),
        ]
    }
}

impl Default for EegBands {
    fn default() -> Self {
        EegBands {
            theta: FrequencyBand::new(4.0, 8.0),
            alpha: FrequencyBand::new(8.0, 12.0),
            beta: FrequencyBand::new(13.0, 30.0),
            high_beta: FrequencyBand::new(20.0, 30.0),
        }
    }
}

/// Mean spectral density per band for one window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub high_beta: f64,
}

impl BandPowers {
    /// Extract band means from a spectrum
    pub fn from_spectrum(spectrum: &PowerSpectrum, bands: &EegBands) -> Self {
        let mean = |band: &FrequencyBand| spectrum.band_mean(band.low_hz, band.high_hz);
        BandPowers {
            theta: mean(&bands.theta),
            alpha: mean(&bands.alpha),
            beta: mean(&bands.beta),
            high_beta: mean(&bands.high_beta),
        }
    }
}

/// Notch + band-pass per channel, spatial average, Welch PSD, band means
pub struct BandpowerEstimator {
    filters: FilterBank,
    welch: WelchEstimator,
    bands: EegBands,
}

impl BandpowerEstimator {
    /// Design filters and the Welch estimator for a configuration
    pub fn new(config: &ProcessingConfig) -> EegResult<Self> {
        config.validate()?;

        Ok(BandpowerEstimator {
            filters: FilterBank::eeg_preprocessing(&config.filters, config.sampling_rate)?,
            welch: WelchEstimator::new(config.sampling_rate, config.segment_len())?,
            bands: config.bands.clone(),
        })
    }

    /// Averaged spectrum of the filtered window
    pub fn spectrum(&self, window: &EegWindow) -> EegResult<PowerSpectrum> {
        if window.is_empty() {
            return Err(window_error!("window holds no samples"));
        }
        if (window.sampling_rate() - self.welch.sampling_rate()).abs() > f64::EPSILON {
            return Err(window_error!(
                "window sampled at {}Hz, estimator expects {}Hz",
                window.sampling_rate(),
                self.welch.sampling_rate()
            ));
        }

        let filtered = self.filters.process(window)?;
        let averaged = filtered.channel_mean();
        self.welch.estimate(&averaged)
    }

    /// Band powers for one window
    pub fn estimate(&self, window: &EegWindow) -> EegResult<BandPowers> {
        let spectrum = self.spectrum(window)?;
        Ok(BandPowers::from_spectrum(&spectrum, &self.bands))
    }
}
