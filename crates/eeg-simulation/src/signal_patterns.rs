//! Mental-state rhythm patterns for synthetic EEG

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Centre frequencies used for each synthesized rhythm (Hz)
pub const THETA_HZ: f64 = 6.0;
pub const ALPHA_HZ: f64 = 10.0;
pub const BETA_HZ: f64 = 16.0;
pub const HIGH_BETA_HZ: f64 = 24.0;

/// Rhythm amplitudes in µV
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RhythmAmplitudes {
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub high_beta: f64,
}

impl RhythmAmplitudes {
    /// Linear blend, `weight = 0` gives `self`
    pub fn blend(&self, other: &RhythmAmplitudes, weight: f64) -> RhythmAmplitudes {
        let mix = |a: f64, b: f64| a + (b - a) * weight;
        RhythmAmplitudes {
            theta: mix(self.theta, other.theta),
            alpha: mix(self.alpha, other.alpha),
            beta: mix(self.beta, other.beta),
            high_beta: mix(self.high_beta, other.high_beta),
        }
    }

    /// (frequency, amplitude) pairs
    pub fn components(&self) -> [(f64, f64); 4] {
        [
            (THETA_HZ, self.theta),
            (ALPHA_HZ, self.alpha),
            (BETA_HZ, self.beta),
            (HIGH_BETA_HZ, self.high_beta),
        ]
    }
}

/// Predefined mental-state patterns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MentalStatePattern {
    /// Eyes-closed rest, alpha dominant
    Relaxed,
    /// Task engagement, beta above alpha
    Focused,
    /// High-beta dominant
    Stressed,
    /// Slow cycle from relaxed to stressed and back
    Drifting { period_secs: f64 },
    /// Electrode off the skin: flat line
    Disconnected,
}

impl MentalStatePattern {
    /// Rhythm amplitudes at a given time
    pub fn amplitudes_at(&self, time: f64) -> RhythmAmplitudes {
        match self {
            MentalStatePattern::Relaxed => RhythmAmplitudes {
                theta: 4.0,
                alpha: 20.0,
                beta: 4.0,
                high_beta: 2.0,
            },
            MentalStatePattern::Focused => RhythmAmplitudes {
                theta: 3.0,
                alpha: 10.0,
                beta: 15.0,
                high_beta: 4.0,
            },
            MentalStatePattern::Stressed => RhythmAmplitudes {
                theta: 3.0,
                alpha: 6.0,
                beta: 12.0,
                high_beta: 14.0,
            },
            MentalStatePattern::Drifting { period_secs } => {
                let period = period_secs.max(f64::EPSILON);
                let weight = 0.5 - 0.5 * (2.0 * PI * time / period).cos();
                MentalStatePattern::Relaxed
                    .amplitudes_at(time)
                    .blend(&MentalStatePattern::Stressed.amplitudes_at(time), weight)
            }
            MentalStatePattern::Disconnected => RhythmAmplitudes::default(),
        }
    }

    /// Whether the pattern models a missing signal (no noise either)
    pub fn is_flat(&self) -> bool {
        matches!(self, MentalStatePattern::Disconnected)
    }

    /// Get pattern description
    pub fn description(&self) -> &'static str {
        match self {
            MentalStatePattern::Relaxed => "Relaxed, alpha dominant",
            MentalStatePattern::Focused => "Focused, beta dominant",
            MentalStatePattern::Stressed => "Stressed, high-beta dominant",
            MentalStatePattern::Drifting { .. } => "Drifting between rest and stress",
            MentalStatePattern::Disconnected => "Electrode disconnected",
        }
    }

    /// Named presets for the CLI
    pub fn from_name(name: &str) -> Option<MentalStatePattern> {
        match name {
            "relaxed" => Some(MentalStatePattern::Relaxed),
            "focused" => Some(MentalStatePattern::Focused),
            "stressed" => Some(MentalStatePattern::Stressed),
            "drifting" => Some(MentalStatePattern::Drifting { period_secs: 60.0 }),
            "disconnected" => Some(MentalStatePattern::Disconnected),
            _ => None,
        }
    }
}

impl Default for MentalStatePattern {
    fn default() -> Self {
        MentalStatePattern::Drifting { period_secs: 60.0 }
    }
}
