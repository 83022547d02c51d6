//! Digital filters for EEG preprocessing

use crate::config::FilterSettings;
use crate::processor::SignalProcessor;
use eeg_core::{EegError, EegResult, EegWindow};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Poles closer than this to the real axis are treated as real
const IMAG_TOLERANCE: f64 = 1e-9;

/// Filter types supported by the framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    /// Butterworth lowpass filter
    ButterworthLowpass,
    /// Butterworth highpass filter
    ButterworthHighpass,
    /// Butterworth bandpass filter
    ButterworthBandpass,
    /// Notch filter for powerline interference
    Notch,
}

/// Filter configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Filter type
    pub filter_type: FilterType,
    /// Prototype order (for Butterworth filters)
    pub order: usize,
    /// Cutoff frequency for lowpass/highpass (Hz)
    pub cutoff_freq: Option<f64>,
    /// Low cutoff for bandpass (Hz)
    pub low_cutoff: Option<f64>,
    /// High cutoff for bandpass (Hz)
    pub high_cutoff: Option<f64>,
    /// Notch frequency (Hz) - typically 50 or 60
    pub notch_freq: Option<f64>,
    /// Notch quality factor
    pub notch_q: Option<f64>,
}

impl FilterConfig {
    /// Create lowpass filter configuration
    pub fn lowpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthLowpass,
            order,
            cutoff_freq: Some(cutoff_freq),
            low_cutoff: None,
            high_cutoff: None,
            notch_freq: None,
            notch_q: None,
        }
    }

    /// Create highpass filter configuration
    pub fn highpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthHighpass,
            order,
            cutoff_freq: Some(cutoff_freq),
            low_cutoff: None,
            high_cutoff: None,
            notch_freq: None,
            notch_q: None,
        }
    }

    /// Create bandpass filter configuration
    pub fn bandpass(low_cutoff: f64, high_cutoff: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthBandpass,
            order,
            cutoff_freq: None,
            low_cutoff: Some(low_cutoff),
            high_cutoff: Some(high_cutoff),
            notch_freq: None,
            notch_q: None,
        }
    }

    /// Create notch filter configuration
    pub fn notch(freq: f64, q: f64) -> Self {
        Self {
            filter_type: FilterType::Notch,
            order: 2,
            cutoff_freq: None,
            low_cutoff: None,
            high_cutoff: None,
            notch_freq: Some(freq),
            notch_q: Some(q),
        }
    }
}

/// Single biquad section (2nd order)
///
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadSection {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadSection {
    /// Run the section over a whole buffer starting from rest
    pub fn run(&self, input: &[f64]) -> Vec<f64> {
        // Transposed direct form II
        let (mut s1, mut s2) = (0.0, 0.0);
        input
            .iter()
            .map(|&x| {
                let y = self.b0 * x + s1;
                s1 = self.b1 * x - self.a1 * y + s2;
                s2 = self.b2 * x - self.a2 * y;
                y
            })
            .collect()
    }

    /// Complex response at normalized angular frequency `omega` (rad/sample)
    pub fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let numerator = z1 * self.b1 + z2 * self.b2 + self.b0;
        let denominator = z1 * self.a1 + z2 * self.a2 + 1.0;
        numerator / denominator
    }

    /// Both poles strictly inside the unit circle
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    fn scale(&mut self, gain: f64) {
        self.b0 *= gain;
        self.b1 *= gain;
        self.b2 *= gain;
    }
}

/// Run a cascade of sections over one channel
fn run_cascade(sections: &[BiquadSection], input: &[f64]) -> Vec<f64> {
    let mut output = input.to_vec();
    for section in sections {
        output = section.run(&output);
    }
    output
}

fn cascade_magnitude(sections: &[BiquadSection], freq_hz: f64, fs: f64) -> f64 {
    let omega = 2.0 * PI * freq_hz / fs;
    sections.iter().map(|s| s.response(omega).norm()).product()
}

/// Butterworth filter built from cascaded biquad sections
///
/// Designed through the analog prototype, frequency transformation and the
/// bilinear transform with pre-warped edges.
pub struct ButterworthFilter {
    sections: Vec<BiquadSection>,
    sampling_rate: f64,
}

impl ButterworthFilter {
    /// Design the filter for a given sampling rate
    pub fn design(filter_config: FilterConfig, sampling_rate: f64) -> EegResult<Self> {
        let order = filter_config.order;
        if order == 0 || order > 8 {
            return Err(design_error(format!("order {} outside 1-8", order)));
        }

        let nyquist = sampling_rate / 2.0;
        let check_edge = |freq: f64| -> EegResult<f64> {
            if freq <= 0.0 || freq >= nyquist {
                Err(design_error(format!(
                    "cutoff {}Hz must lie in (0, {})Hz", freq, nyquist
                )))
            } else {
                Ok(prewarp(freq, sampling_rate))
            }
        };

        let prototype = prototype_poles(order);
        let (analog_poles, reference_omega) = match filter_config.filter_type {
            FilterType::ButterworthLowpass => {
                let cutoff = filter_config
                    .cutoff_freq
                    .ok_or_else(|| design_error("lowpass filter requires cutoff frequency".into()))?;
                let wc = check_edge(cutoff)?;
                (prototype.iter().map(|p| p * wc).collect::<Vec<_>>(), 0.0)
            }
            FilterType::ButterworthHighpass => {
                let cutoff = filter_config
                    .cutoff_freq
                    .ok_or_else(|| design_error("highpass filter requires cutoff frequency".into()))?;
                let wc = check_edge(cutoff)?;
                (prototype.iter().map(|p| wc / p).collect::<Vec<_>>(), PI)
            }
            FilterType::ButterworthBandpass => {
                let (low, high) = match (filter_config.low_cutoff, filter_config.high_cutoff) {
                    (Some(low), Some(high)) => (low, high),
                    _ => {
                        return Err(design_error(
                            "bandpass filter requires low and high cutoff frequencies".into(),
                        ))
                    }
                };
                if low >= high {
                    return Err(design_error(format!(
                        "low cutoff {}Hz must be below high cutoff {}Hz", low, high
                    )));
                }
                let wl = check_edge(low)?;
                let wh = check_edge(high)?;
                let w0 = (wl * wh).sqrt();
                let bw = wh - wl;

                let mut poles = Vec::with_capacity(2 * order);
                for p in &prototype {
                    let a = p * (bw / 2.0);
                    let d = (a * a - w0 * w0).sqrt();
                    poles.push(a + d);
                    poles.push(a - d);
                }
                let center = 2.0 * (w0 / (2.0 * sampling_rate)).atan();
                (poles, center)
            }
            FilterType::Notch => {
                return Err(design_error("use NotchFilter for notch designs".into()));
            }
        };

        let digital_poles: Vec<Complex64> = analog_poles
            .iter()
            .map(|&s| bilinear(s, sampling_rate))
            .collect();

        let mut sections = Vec::new();
        for (a1, a2, pole_count) in pair_poles(&digital_poles) {
            let (b0, b1, b2) = match (filter_config.filter_type, pole_count) {
                (FilterType::ButterworthLowpass, 2) => (1.0, 2.0, 1.0),
                (FilterType::ButterworthLowpass, _) => (1.0, 1.0, 0.0),
                (FilterType::ButterworthHighpass, 2) => (1.0, -2.0, 1.0),
                (FilterType::ButterworthHighpass, _) => (1.0, -1.0, 0.0),
                // one zero at DC and one at Nyquist per section
                _ => (1.0, 0.0, -1.0),
            };

            let mut section = BiquadSection { b0, b1, b2, a1, a2 };
            let magnitude = section.response(reference_omega).norm();
            if !magnitude.is_finite() || magnitude < f64::EPSILON {
                return Err(design_error("degenerate section gain".into()));
            }
            section.scale(1.0 / magnitude);

            if !section.is_stable() {
                return Err(design_error(format!(
                    "unstable section for {}Hz sampling", sampling_rate
                )));
            }
            sections.push(section);
        }

        Ok(ButterworthFilter {
            sections,
            sampling_rate,
        })
    }

    /// Magnitude response at a frequency in Hz
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        cascade_magnitude(&self.sections, freq_hz, self.sampling_rate)
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    /// Filter one channel from rest
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        run_cascade(&self.sections, input)
    }
}

impl SignalProcessor for ButterworthFilter {
    fn process(&self, input: &EegWindow) -> EegResult<EegWindow> {
        check_rate("Butterworth", self.sampling_rate, input)?;
        let channels = input
            .all_channels()
            .iter()
            .map(|channel| self.filter(channel))
            .collect();
        input.with_channels(channels)
    }

    fn name(&self) -> &str {
        "Butterworth Filter"
    }

    fn latency_estimate(&self) -> u64 {
        (self.sections.len() as u64) * 10 // ~10μs per biquad section
    }
}

/// Notch filter for powerline interference removal
pub struct NotchFilter {
    notch_freq: f64,
    q_factor: f64,
    section: BiquadSection,
    sampling_rate: f64,
}

impl NotchFilter {
    /// Design a second-order notch at `notch_freq` with quality `q_factor`
    pub fn design(notch_freq: f64, q_factor: f64, sampling_rate: f64) -> EegResult<Self> {
        if notch_freq <= 0.0 || notch_freq >= sampling_rate / 2.0 {
            return Err(EegError::FilterDesign {
                filter: "notch",
                reason: format!(
                    "notch {}Hz must lie in (0, {})Hz", notch_freq, sampling_rate / 2.0
                ),
            });
        }
        if q_factor <= 0.0 {
            return Err(EegError::FilterDesign {
                filter: "notch",
                reason: format!("quality factor {} must be positive", q_factor),
            });
        }

        let omega = 2.0 * PI * notch_freq / sampling_rate;
        let bandwidth = omega / q_factor;
        let gain = 1.0 / (1.0 + (bandwidth / 2.0).tan());
        let cos_omega = omega.cos();

        let section = BiquadSection {
            b0: gain,
            b1: -2.0 * gain * cos_omega,
            b2: gain,
            a1: -2.0 * gain * cos_omega,
            a2: 2.0 * gain - 1.0,
        };

        Ok(NotchFilter {
            notch_freq,
            q_factor,
            section,
            sampling_rate,
        })
    }

    pub fn notch_freq(&self) -> f64 {
        self.notch_freq
    }

    pub fn q_factor(&self) -> f64 {
        self.q_factor
    }

    /// Magnitude response at a frequency in Hz
    pub fn magnitude_at(&self, freq_hz: f64) -> f64 {
        cascade_magnitude(std::slice::from_ref(&self.section), freq_hz, self.sampling_rate)
    }

    /// Filter one channel from rest
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        self.section.run(input)
    }
}

impl SignalProcessor for NotchFilter {
    fn process(&self, input: &EegWindow) -> EegResult<EegWindow> {
        check_rate("notch", self.sampling_rate, input)?;
        let channels = input
            .all_channels()
            .iter()
            .map(|channel| self.filter(channel))
            .collect();
        input.with_channels(channels)
    }

    fn name(&self) -> &str {
        "Notch Filter"
    }

    fn latency_estimate(&self) -> u64 {
        10
    }
}

/// Filter bank for combining multiple filters
pub struct FilterBank {
    filters: Vec<Box<dyn SignalProcessor>>,
}

impl FilterBank {
    /// Create new filter bank
    pub fn new() -> Self {
        FilterBank {
            filters: Vec::new(),
        }
    }

    /// Add a filter to the bank
    pub fn add_filter(&mut self, filter: Box<dyn SignalProcessor>) {
        self.filters.push(filter);
    }

    /// Mains notch followed by the physiological band-pass
    pub fn eeg_preprocessing(settings: &FilterSettings, sampling_rate: f64) -> EegResult<Self> {
        let mut bank = FilterBank::new();

        let notch = NotchFilter::design(settings.notch_freq, settings.notch_q, sampling_rate)?;
        let bandpass = ButterworthFilter::design(
            FilterConfig::bandpass(settings.bandpass_low, settings.bandpass_high, settings.bandpass_order),
            sampling_rate,
        )?;

        let centre = (settings.bandpass_low * settings.bandpass_high).sqrt();
        debug!(
            notch_hz = notch.notch_freq(),
            notch_q = notch.q_factor(),
            notch_gain = notch.magnitude_at(notch.notch_freq()),
            passband_gain = bandpass.magnitude_at(centre),
            "Preprocessing filters designed"
        );

        bank.add_filter(Box::new(notch));
        bank.add_filter(Box::new(bandpass));

        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProcessor for FilterBank {
    fn process(&self, input: &EegWindow) -> EegResult<EegWindow> {
        let mut current = input.clone();

        // Apply filters sequentially
        for filter in &self.filters {
            current = filter.process(&current)?;
        }

        Ok(current)
    }

    fn name(&self) -> &str {
        "Filter Bank"
    }

    fn latency_estimate(&self) -> u64 {
        self.filters.iter().map(|f| f.latency_estimate()).sum()
    }
}

fn design_error(reason: String) -> EegError {
    EegError::FilterDesign {
        filter: "butterworth",
        reason,
    }
}

fn check_rate(filter: &str, designed: f64, input: &EegWindow) -> EegResult<()> {
    if (input.sampling_rate() - designed).abs() > f64::EPSILON {
        return Err(EegError::InvalidWindow {
            reason: format!(
                "{} filter designed for {}Hz, window sampled at {}Hz",
                filter,
                designed,
                input.sampling_rate()
            ),
        });
    }
    Ok(())
}

/// Left-half-plane poles of the normalized analog Butterworth prototype
fn prototype_poles(order: usize) -> Vec<Complex64> {
    (0..order)
        .map(|k| {
            let theta = PI * (2 * k + 1 + order) as f64 / (2 * order) as f64;
            Complex64::from_polar(1.0, theta)
        })
        .collect()
}

fn prewarp(freq: f64, fs: f64) -> f64 {
    2.0 * fs * (PI * freq / fs).tan()
}

fn bilinear(s: Complex64, fs: f64) -> Complex64 {
    let k = Complex64::new(2.0 * fs, 0.0);
    (k + s) / (k - s)
}

/// Group digital poles into (a1, a2, pole count) denominators
fn pair_poles(poles: &[Complex64]) -> Vec<(f64, f64, usize)> {
    let mut denominators = Vec::new();
    let mut reals = Vec::new();

    for pole in poles {
        if pole.im > IMAG_TOLERANCE {
            denominators.push((-2.0 * pole.re, pole.norm_sqr(), 2));
        } else if pole.im.abs() <= IMAG_TOLERANCE {
            reals.push(pole.re);
        }
    }

    for pair in reals.chunks(2) {
        match pair {
            [r1, r2] => denominators.push((-(r1 + r2), r1 * r2, 2)),
            [r] => denominators.push((-r, 0.0, 1)),
            _ => {}
        }
    }

    denominators
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeg_core::{EegMetadata, Electrode};

    const FS: f64 = 250.0;

    fn sine(freq: f64, seconds: f64) -> Vec<f64> {
        let n = (FS * seconds) as usize;
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / FS).sin()).collect()
    }

    fn tail_rms(data: &[f64], samples: usize) -> f64 {
        let tail = &data[data.len() - samples..];
        (tail.iter().map(|x| x * x).sum::<f64>() / samples as f64).sqrt()
    }

    #[test]
    fn test_notch_removes_mains() {
        let notch = NotchFilter::design(50.0, 30.0, FS).unwrap();

        let mains = notch.filter(&sine(50.0, 4.0));
        assert!(tail_rms(&mains, 500) < 0.02);

        let alpha = notch.filter(&sine(10.0, 4.0));
        assert!((tail_rms(&alpha, 500) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.02);
    }

    #[test]
    fn test_notch_rejects_bad_design() {
        assert!(NotchFilter::design(130.0, 30.0, FS).is_err());
        assert!(NotchFilter::design(50.0, 0.0, FS).is_err());
    }

    #[test]
    fn test_bandpass_sections_are_stable() {
        let filter = ButterworthFilter::design(FilterConfig::bandpass(1.0, 40.0, 4), FS).unwrap();
        assert_eq!(filter.sections().len(), 4);
        assert!(filter.sections().iter().all(|s| s.is_stable()));
    }

    #[test]
    fn test_bandpass_response() {
        let filter = ButterworthFilter::design(FilterConfig::bandpass(1.0, 40.0, 4), FS).unwrap();

        assert!((filter.magnitude_at(10.0) - 1.0).abs() < 0.01);
        assert!((filter.magnitude_at(1.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert!((filter.magnitude_at(40.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);
        assert!(filter.magnitude_at(100.0) < 0.01);
        assert!(filter.magnitude_at(0.05) < 0.01);
    }

    #[test]
    fn test_bandpass_time_domain() {
        let filter = ButterworthFilter::design(FilterConfig::bandpass(1.0, 40.0, 4), FS).unwrap();

        let passed = filter.filter(&sine(10.0, 4.0));
        assert!((tail_rms(&passed, 500) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.03);

        let rejected = filter.filter(&sine(80.0, 4.0));
        assert!(tail_rms(&rejected, 500) < 0.05);

        let drift = filter.filter(&vec![1.0; 2500]);
        assert!(drift[2000..].iter().all(|x| x.abs() < 0.05));
    }

    #[test]
    fn test_lowpass_and_highpass() {
        let lowpass = ButterworthFilter::design(FilterConfig::lowpass(30.0, 3), FS).unwrap();
        assert_eq!(lowpass.sections().len(), 2);
        assert!((lowpass.magnitude_at(0.0) - 1.0).abs() < 1e-9);
        assert!((lowpass.magnitude_at(30.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.01);

        let highpass = ButterworthFilter::design(FilterConfig::highpass(1.0, 2), FS).unwrap();
        assert!((highpass.magnitude_at(FS / 2.0) - 1.0).abs() < 1e-9);
        assert!(highpass.magnitude_at(0.0) < 1e-9);
    }

    #[test]
    fn test_invalid_designs() {
        assert!(ButterworthFilter::design(FilterConfig::bandpass(1.0, 130.0, 4), FS).is_err());
        assert!(ButterworthFilter::design(FilterConfig::bandpass(40.0, 1.0, 4), FS).is_err());
        assert!(ButterworthFilter::design(FilterConfig::bandpass(1.0, 40.0, 0), FS).is_err());
        assert!(ButterworthFilter::design(FilterConfig::notch(50.0, 30.0), FS).is_err());
    }

    #[test]
    fn test_filter_bank_keeps_shape() {
        let bank = FilterBank::eeg_preprocessing(&FilterSettings::default(), FS).unwrap();
        assert_eq!(bank.len(), 2);

        let metadata = EegMetadata::new(FS, Electrode::frontal_pair(), "test").unwrap();
        let window = EegWindow::new(vec![sine(10.0, 2.0), sine(20.0, 2.0)], metadata).unwrap();
        let filtered = bank.process(&window).unwrap();

        assert_eq!(filtered.channel_count(), 2);
        assert_eq!(filtered.samples_per_channel(), window.samples_per_channel());
        assert_ne!(filtered.channel_data(0).unwrap(), window.channel_data(0).unwrap());
    }

    #[test]
    fn test_sampling_rate_mismatch() {
        let notch = NotchFilter::design(50.0, 30.0, FS).unwrap();
        let metadata = EegMetadata::new(500.0, vec![Electrode::Fp1], "test").unwrap();
        let window = EegWindow::new(vec![vec![0.0; 100]], metadata).unwrap();
        assert!(notch.process(&window).is_err());
    }
}
