//! Configuration management for the metric pipeline

use crate::bandpower::{EegBands, FrequencyBand};
use crate::metrics::RawMetrics;
use eeg_core::{config_error, EegMetadata, EegResult, DEFAULT_SAMPLE_RATE};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Processing profiles matching the two headset deployments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingProfile {
    /// 5 s windows, ×200 focus gain, damped focus ceiling
    Standard,
    /// 1 s windows, ×50 focus gain, beta-power alert; focus stays beta/alpha
    Responsive,
}

/// When a real-mode message carries `alert = 1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "threshold", rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Raw (unscaled) stress ratio above the threshold
    StressRatioAbove(f64),
    /// Raw beta band power above the threshold
    BetaPowerAbove(f64),
    Always,
    Never,
}

impl AlertPolicy {
    /// Evaluate the policy against one window's raw metrics
    pub fn fires(&self, raw: &RawMetrics) -> bool {
        match *self {
            AlertPolicy::StressRatioAbove(threshold) => raw.stress_ratio > threshold,
            AlertPolicy::BetaPowerAbove(threshold) => raw.beta_power > threshold,
            AlertPolicy::Always => true,
            AlertPolicy::Never => false,
        }
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        AlertPolicy::StressRatioAbove(1.0)
    }
}

/// Noise filter parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    /// Mains frequency to notch out (Hz)
    pub notch_freq: f64,
    /// Notch quality factor
    pub notch_q: f64,
    /// Band-pass lower edge (Hz)
    pub bandpass_low: f64,
    /// Band-pass upper edge (Hz)
    pub bandpass_high: f64,
    /// Butterworth prototype order
    pub bandpass_order: usize,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            notch_freq: 50.0,
            notch_q: 30.0,
            bandpass_low: 1.0,
            bandpass_high: 40.0,
            bandpass_order: 4,
        }
    }
}

/// Global processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Sample rate the pipeline is designed for (Hz)
    pub sampling_rate: f64,
    /// Analysis window duration (s)
    pub window_secs: f64,
    pub filters: FilterSettings,
    pub bands: EegBands,
    /// Welch segment length in samples; defaults to one second of data
    pub welch_segment: Option<usize>,
    /// Alpha power at or below this marks an artifact window
    pub alpha_epsilon: f64,
    /// Pre-normalization gain applied to the focus ratio
    pub focus_gain: f64,
    /// Focus ceiling damping factor; `None` raises the ceiling unconditionally
    pub focus_damping: Option<f64>,
    /// Minimum denominator used when mapping to a percentage
    pub span_floor: f64,
    pub alert: AlertPolicy,
}

impl ProcessingConfig {
    /// Five second windows with the ×200 focus gain
    pub fn standard() -> Self {
        ProcessingConfig {
            sampling_rate: DEFAULT_SAMPLE_RATE,
            window_secs: 5.0,
            filters: FilterSettings::default(),
            bands: EegBands::default(),
            welch_segment: None,
            alpha_epsilon: 1e-10,
            focus_gain: 200.0,
            focus_damping: Some(0.03),
            span_floor: 1.0,
            alert: AlertPolicy::default(),
        }
    }

    /// One second windows with the legacy ×50 gain and beta-power alert
    ///
    /// Focus is still beta/alpha here. The legacy one second deployment
    /// computed focus as beta/(theta+alpha), so its focus values ran lower
    /// for the same signal; this preset keeps only its gain and alert.
    pub fn responsive() -> Self {
        ProcessingConfig {
            window_secs: 1.0,
            focus_gain: 50.0,
            focus_damping: None,
            alert: AlertPolicy::BetaPowerAbove(40.0),
            ..Self::standard()
        }
    }

    /// Create configuration suitable for given profile
    pub fn for_profile(profile: ProcessingProfile) -> Self {
        match profile {
            ProcessingProfile::Standard => Self::standard(),
            ProcessingProfile::Responsive => Self::responsive(),
        }
    }

    /// Samples per channel one analysis window needs
    pub fn required_samples(&self) -> usize {
        (self.sampling_rate * self.window_secs).round() as usize
    }

    /// Welch segment length in samples
    pub fn segment_len(&self) -> usize {
        self.welch_segment
            .unwrap_or_else(|| self.sampling_rate.round() as usize)
    }

    /// Validate entire configuration
    pub fn validate(&self) -> EegResult<()> {
        EegMetadata::validate_sampling_rate(self.sampling_rate)?;

        if !(self.window_secs > 0.0) {
            return Err(config_error!("window duration must be positive, got {}s", self.window_secs));
        }

        let nyquist = self.sampling_rate / 2.0;
        let f = &self.filters;
        if f.notch_freq <= 0.0 || f.notch_freq >= nyquist {
            return Err(config_error!("notch {}Hz outside (0, {})Hz", f.notch_freq, nyquist));
        }
        if f.notch_q <= 0.0 {
            return Err(config_error!("notch Q must be positive, got {}", f.notch_q));
        }
        if f.bandpass_low <= 0.0 || f.bandpass_low >= f.bandpass_high || f.bandpass_high >= nyquist {
            return Err(config_error!(
                "band-pass {}-{}Hz invalid for {}Hz sampling",
                f.bandpass_low, f.bandpass_high, self.sampling_rate
            ));
        }
        if f.bandpass_order == 0 || f.bandpass_order > 8 {
            return Err(config_error!("band-pass order {} outside 1-8", f.bandpass_order));
        }

        for (name, band) in self.bands.named() {
            validate_band(name, band, nyquist)?;
        }

        if self.segment_len() < 2 {
            return Err(config_error!("Welch segment of {} samples is too short", self.segment_len()));
        }
        if self.required_samples() < self.segment_len() {
            warn!(
                window = self.required_samples(),
                segment = self.segment_len(),
                "analysis window shorter than one Welch segment; segment will be truncated"
            );
        }

        if !(self.alpha_epsilon >= 0.0) {
            return Err(config_error!("alpha epsilon must be non-negative"));
        }
        if !(self.focus_gain > 0.0) {
            return Err(config_error!("focus gain must be positive, got {}", self.focus_gain));
        }
        if let Some(damping) = self.focus_damping {
            if !(damping >= 0.0) {
                return Err(config_error!("focus damping must be non-negative, got {}", damping));
            }
        }
        if !(self.span_floor > 0.0) {
            return Err(config_error!("span floor must be positive, got {}", self.span_floor));
        }

        Ok(())
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

fn validate_band(name: &str, band: &FrequencyBand, nyquist: f64) -> EegResult<()> {
    if band.low_hz < 0.0 || band.low_hz >= band.high_hz {
        return Err(config_error!(
            "{} band {}-{}Hz is empty", name, band.low_hz, band.high_hz
        ));
    }
    if band.high_hz > nyquist {
        return Err(config_error!(
            "{} band upper edge {}Hz above Nyquist {}Hz", name, band.high_hz, nyquist
        ));
    }
    Ok(())
}
