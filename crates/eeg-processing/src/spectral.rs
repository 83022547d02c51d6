//! Welch power spectral density estimation

use eeg_core::{EegError, EegResult};
use realfft::{RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;

/// One-sided power spectral density (units²/Hz)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Bin centre frequencies (Hz)
    pub frequencies: Vec<f64>,
    /// Density per bin
    pub density: Vec<f64>,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.density.len()
    }

    pub fn is_empty(&self) -> bool {
        self.density.is_empty()
    }

    /// Bin spacing in Hz
    pub fn resolution(&self) -> f64 {
        match self.frequencies.as_slice() {
            [first, second, ..] => second - first,
            _ => 0.0,
        }
    }

    /// Mean density over bins with `low_hz <= f <= high_hz`; 0 when no bin falls inside
    pub fn band_mean(&self, low_hz: f64, high_hz: f64) -> f64 {
        let (sum, count) = self
            .frequencies
            .iter()
            .zip(&self.density)
            .filter(|(f, _)| **f >= low_hz && **f <= high_hz)
            .fold((0.0, 0usize), |(sum, count), (_, &p)| (sum + p, count + 1));

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Welch estimator: periodic Hann window, 50% overlap, constant detrend, mean of periodograms
pub struct WelchEstimator {
    sampling_rate: f64,
    segment_len: usize,
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
}

impl WelchEstimator {
    /// Create an estimator for a fixed segment length
    pub fn new(sampling_rate: f64, segment_len: usize) -> EegResult<Self> {
        if segment_len < 2 {
            return Err(EegError::InvalidConfig {
                reason: format!("Welch segment of {} samples is too short", segment_len),
            });
        }
        if !(sampling_rate > 0.0) {
            return Err(EegError::InvalidConfig {
                reason: format!("sampling rate must be positive, got {}", sampling_rate),
            });
        }

        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(segment_len);

        Ok(WelchEstimator {
            sampling_rate,
            segment_len,
            fft,
            window: hann_periodic(segment_len),
        })
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Estimate the PSD of `signal`
    ///
    /// Signals shorter than one segment are analysed as a single segment of
    /// their own length.
    pub fn estimate(&self, signal: &[f64]) -> EegResult<PowerSpectrum> {
        if signal.len() < 2 {
            return Err(EegError::InsufficientData {
                required: 2,
                available: signal.len(),
            });
        }

        if signal.len() < self.segment_len {
            return WelchEstimator::new(self.sampling_rate, signal.len())?.estimate(signal);
        }

        let nperseg = self.segment_len;
        let step = nperseg - nperseg / 2;
        let segments = (signal.len() - nperseg) / step + 1;

        let window_power: f64 = self.window.iter().map(|w| w * w).sum();
        let scale = 1.0 / (self.sampling_rate * window_power);

        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let mut density = vec![0.0; spectrum.len()];

        for index in 0..segments {
            let segment = &signal[index * step..index * step + nperseg];
            let mean = segment.iter().sum::<f64>() / nperseg as f64;
            for ((slot, &x), &w) in input.iter_mut().zip(segment).zip(&self.window) {
                *slot = (x - mean) * w;
            }

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| EegError::Processing {
                    message: format!("FFT failed: {}", e),
                })?;

            for (acc, bin) in density.iter_mut().zip(&spectrum) {
                *acc += bin.norm_sqr() * scale;
            }
        }

        // One-sided: fold negative frequencies except DC and (even length) Nyquist
        let last = density.len() - 1;
        let fold_end = if nperseg % 2 == 0 { last } else { last + 1 };
        for value in &mut density[1..fold_end] {
            *value *= 2.0;
        }
        for value in &mut density {
            *value /= segments as f64;
        }

        let resolution = self.sampling_rate / nperseg as f64;
        let frequencies = (0..density.len()).map(|k| k as f64 * resolution).collect();

        Ok(PowerSpectrum {
            frequencies,
            density,
        })
    }
}

fn hann_periodic(len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / len as f64).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 250.0;

    fn sine(freq: f64, amplitude: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / FS).sin())
            .collect()
    }

    fn peak_frequency(psd: &PowerSpectrum) -> f64 {
        let (index, _) = psd
            .density
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .unwrap();
        psd.frequencies[index]
    }

    #[test]
    fn test_frequency_grid() {
        let welch = WelchEstimator::new(FS, 250).unwrap();
        let psd = welch.estimate(&sine(10.0, 1.0, 1250)).unwrap();

        assert_eq!(psd.len(), 126);
        assert!((psd.resolution() - 1.0).abs() < 1e-12);
        assert_eq!(psd.frequencies[125], 125.0);
    }

    #[test]
    fn test_sine_peak_and_power() {
        let welch = WelchEstimator::new(FS, 250).unwrap();
        let psd = welch.estimate(&sine(10.0, 2.0, 1250)).unwrap();

        assert_eq!(peak_frequency(&psd), 10.0);
        // A²/2 for a pure sine
        assert!((psd.density.iter().sum::<f64>() * psd.resolution() - 2.0).abs() < 0.05);
        assert!(psd.band_mean(8.0, 12.0) > 100.0 * psd.band_mean(20.0, 30.0));
    }

    #[test]
    fn test_constant_signal_is_detrended() {
        let welch = WelchEstimator::new(FS, 250).unwrap();
        let psd = welch.estimate(&vec![5.0; 500]).unwrap();
        assert!(psd.density.iter().all(|&p| p.abs() < 1e-20));
    }

    #[test]
    fn test_short_signal_uses_single_segment() {
        let welch = WelchEstimator::new(FS, 250).unwrap();
        let psd = welch.estimate(&sine(25.0, 1.0, 100)).unwrap();

        assert_eq!(psd.len(), 51);
        assert!((psd.resolution() - 2.5).abs() < 1e-12);
        assert_eq!(peak_frequency(&psd), 25.0);

        assert!(welch.estimate(&[1.0]).is_err());
    }

    #[test]
    fn test_band_mean_edges() {
        let psd = PowerSpectrum {
            frequencies: vec![0.0, 1.0, 2.0, 3.0],
            density: vec![1.0, 2.0, 3.0, 4.0],
        };
        assert_eq!(psd.band_mean(1.0, 2.0), 2.5);
        assert_eq!(psd.band_mean(0.0, 3.0), 2.5);
        assert_eq!(psd.band_mean(10.0, 20.0), 0.0);
    }
}
