//! Raw focus/stress ratios and artifact rejection

use crate::bandpower::BandPowers;
use serde::{Deserialize, Serialize};

/// Unnormalized ratios for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    /// beta / alpha
    pub focus_ratio: f64,
    /// high-beta / alpha
    pub stress_ratio: f64,
    /// Beta band power, carried for power-threshold alerts
    pub beta_power: f64,
    /// false for artifact windows; such windows must not be emitted
    pub valid: bool,
}

/// Derives ratios from band powers
#[derive(Debug, Clone, Copy)]
pub struct MetricComputer {
    epsilon: f64,
}

impl MetricComputer {
    pub fn new(epsilon: f64) -> Self {
        MetricComputer { epsilon }
    }

    pub fn compute(&self, bands: &BandPowers) -> RawMetrics {
        let alpha = bands.alpha;

        let (focus_ratio, stress_ratio) = if alpha > 0.0 {
            (bands.beta / alpha, bands.high_beta / alpha)
        } else {
            (0.0, 0.0)
        };

        let valid = alpha > self.epsilon
            && bands.beta.is_finite()
            && focus_ratio.is_finite()
            && stress_ratio.is_finite();

        RawMetrics {
            focus_ratio,
            stress_ratio,
            beta_power: bands.beta,
            valid,
        }
    }
}

impl Default for MetricComputer {
    fn default() -> Self {
        Self::new(1e-10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powers(alpha: f64, beta: f64, high_beta: f64) -> BandPowers {
        BandPowers {
            theta: 1.0,
            alpha,
            beta,
            high_beta,
        }
    }

    #[test]
    fn test_ratios() {
        let raw = MetricComputer::default().compute(&powers(4.0, 6.0, 2.0));
        assert!(raw.valid);
        assert!((raw.focus_ratio - 1.5).abs() < 1e-12);
        assert!((raw.stress_ratio - 0.5).abs() < 1e-12);
        assert_eq!(raw.beta_power, 6.0);
    }

    #[test]
    fn test_focus_ignores_theta() {
        let computer = MetricComputer::default();
        let mut bands = powers(4.0, 6.0, 2.0);
        let baseline = computer.compute(&bands);

        bands.theta = 40.0;
        let raw = computer.compute(&bands);
        assert_eq!(raw.focus_ratio, baseline.focus_ratio);
        assert!((raw.focus_ratio - 6.0 / 4.0).abs() < 1e-12);
        assert!(raw.focus_ratio > 6.0 / (40.0 + 4.0));
    }

    #[test]
    fn test_zero_alpha_is_artifact() {
        let raw = MetricComputer::default().compute(&powers(0.0, 6.0, 2.0));
        assert!(!raw.valid);
        assert_eq!(raw.focus_ratio, 0.0);
        assert_eq!(raw.stress_ratio, 0.0);
    }

    #[test]
    fn test_near_zero_alpha_is_artifact() {
        let computer = MetricComputer::new(1e-6);
        let raw = computer.compute(&powers(1e-9, 6.0, 2.0));
        assert!(!raw.valid);
    }

    #[test]
    fn test_non_finite_beta_is_artifact() {
        let raw = MetricComputer::default().compute(&powers(1.0, f64::INFINITY, 2.0));
        assert!(!raw.valid);

        let raw = MetricComputer::default().compute(&powers(1e-300, 1e300, 1e300));
        assert!(!raw.valid);
    }
}
