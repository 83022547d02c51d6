//! Adaptive min/max normalisation of raw ratios into percentages

use crate::config::ProcessingConfig;
use serde::{Deserialize, Serialize};

/// Which metric a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Focus,
    Stress,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Focus => write!(f, "focus"),
            MetricKind::Stress => write!(f, "stress"),
        }
    }
}

/// Running bounds for one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricBounds {
    pub running_min: f64,
    pub running_max: f64,
    /// Set by the first observation
    pub seeded: bool,
}

impl MetricBounds {
    pub fn span(&self) -> f64 {
        self.running_max - self.running_min
    }
}

/// Normalization state for one streaming session
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationState {
    pub focus: MetricBounds,
    pub stress: MetricBounds,
}

impl NormalizationState {
    pub fn bounds(&self, kind: MetricKind) -> &MetricBounds {
        match kind {
            MetricKind::Focus => &self.focus,
            MetricKind::Stress => &self.stress,
        }
    }

    fn bounds_mut(&mut self, kind: MetricKind) -> &mut MetricBounds {
        match kind {
            MetricKind::Focus => &mut self.focus,
            MetricKind::Stress => &mut self.stress,
        }
    }

    /// Forget all observations
    pub fn reset(&mut self) {
        *self = NormalizationState::default();
    }
}

/// Maps raw ratios to [0, 100] against running min/max bounds
///
/// Bounds only widen: the minimum never increases and the maximum never
/// decreases. The focus maximum is only raised when the new value lies
/// within `max + min * damping`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveNormalizer {
    focus_gain: f64,
    focus_damping: Option<f64>,
    span_floor: f64,
}

impl AdaptiveNormalizer {
    pub fn new(focus_gain: f64, focus_damping: Option<f64>, span_floor: f64) -> Self {
        AdaptiveNormalizer {
            focus_gain,
            focus_damping,
            span_floor,
        }
    }

    pub fn from_config(config: &ProcessingConfig) -> Self {
        Self::new(config.focus_gain, config.focus_damping, config.span_floor)
    }

    /// Bring a raw ratio onto the pre-normalization scale
    ///
    /// Focus is multiplied by the gain and clipped to [0, 100]; stress is unscaled.
    pub fn prescale(&self, kind: MetricKind, raw: f64) -> f64 {
        match kind {
            MetricKind::Focus => {
                let scaled = raw * self.focus_gain;
                if scaled.is_nan() {
                    0.0
                } else {
                    scaled.clamp(0.0, 100.0)
                }
            }
            MetricKind::Stress => raw,
        }
    }

    /// Update `bounds` with a pre-scaled value and map it to a percentage
    pub fn normalize(&self, kind: MetricKind, value: f64, bounds: MetricBounds) -> (f64, MetricBounds) {
        let mut updated = bounds;

        if !updated.seeded {
            updated = MetricBounds {
                running_min: value,
                running_max: value,
                seeded: true,
            };
        } else {
            updated.running_min = updated.running_min.min(value);

            let raise = match (kind, self.focus_damping) {
                (MetricKind::Focus, Some(damping)) => {
                    value <= updated.running_max + updated.running_min * damping
                }
                _ => true,
            };
            if raise {
                updated.running_max = updated.running_max.max(value);
            }
        }

        let span = updated.span().max(self.span_floor);
        let percentage = ((value - updated.running_min) / span * 100.0).clamp(0.0, 100.0);

        (percentage, updated)
    }

    /// Pre-scale a raw ratio and normalize it against the session state
    pub fn normalize_into(&self, state: &mut NormalizationState, kind: MetricKind, raw: f64) -> f64 {
        let value = self.prescale(kind, raw);
        let bounds = state.bounds_mut(kind);
        let (percentage, updated) = self.normalize(kind, value, *bounds);
        *bounds = updated;
        percentage
    }
}

impl Default for AdaptiveNormalizer {
    fn default() -> Self {
        Self::from_config(&ProcessingConfig::standard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undamped() -> AdaptiveNormalizer {
        AdaptiveNormalizer::new(200.0, None, 1.0)
    }

    #[test]
    fn test_seed_yields_zero() {
        let normalizer = undamped();
        let (pct, bounds) = normalizer.normalize(MetricKind::Stress, 10.0, MetricBounds::default());

        assert_eq!(pct, 0.0);
        assert!(bounds.seeded);
        assert_eq!(bounds.running_min, 10.0);
        assert_eq!(bounds.running_max, 10.0);
    }

    #[test]
    fn test_focus_sequence_with_gain() {
        let normalizer = undamped();
        let mut state = NormalizationState::default();

        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.10);
        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.20);
        assert!((state.focus.running_min - 20.0).abs() < 1e-9);
        assert!((state.focus.running_max - 40.0).abs() < 1e-9);

        let pct = normalizer.normalize_into(&mut state, MetricKind::Focus, 0.15);
        assert!((pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_stress_above_max_raises_ceiling() {
        let normalizer = undamped();
        let mut state = NormalizationState::default();

        normalizer.normalize_into(&mut state, MetricKind::Stress, 1.0);
        let pct = normalizer.normalize_into(&mut state, MetricKind::Stress, 3.0);

        assert_eq!(state.stress.running_max, 3.0);
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn test_repeated_value_keeps_bounds() {
        let normalizer = AdaptiveNormalizer::default();
        let mut state = NormalizationState::default();

        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.1);
        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.3);
        let before = state;
        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.2);
        let after_first = state;
        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.2);

        assert_eq!(after_first, state);
        assert_eq!(before.focus.running_max, state.focus.running_max);
    }

    #[test]
    fn test_damped_focus_ceiling() {
        let normalizer = AdaptiveNormalizer::new(200.0, Some(0.03), 1.0);
        let mut state = NormalizationState::default();

        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.10);
        // 40 > 20 + 20 * 0.03, ceiling held
        let pct = normalizer.normalize_into(&mut state, MetricKind::Focus, 0.20);
        assert_eq!(state.focus.running_max, 20.0);
        assert_eq!(pct, 100.0);

        // 20.5 <= 20.6, ceiling raised
        normalizer.normalize_into(&mut state, MetricKind::Focus, 0.1025);
        assert!((state.focus.running_max - 20.5).abs() < 1e-9);
    }

    #[test]
    fn test_focus_prescale_clipped() {
        let normalizer = AdaptiveNormalizer::default();
        assert_eq!(normalizer.prescale(MetricKind::Focus, 2.0), 100.0);
        assert_eq!(normalizer.prescale(MetricKind::Focus, -1.0), 0.0);
        assert_eq!(normalizer.prescale(MetricKind::Stress, 2.0), 2.0);
    }

    #[test]
    fn test_bounds_monotonic() {
        let normalizer = AdaptiveNormalizer::default();
        let mut state = NormalizationState::default();
        let values = [0.2, 0.05, 0.4, 0.11, 0.9, 0.01, 0.3, 0.25, 0.6, 0.02];

        let mut last: Option<NormalizationState> = None;
        for raw in values {
            let focus = normalizer.normalize_into(&mut state, MetricKind::Focus, raw);
            let stress = normalizer.normalize_into(&mut state, MetricKind::Stress, raw * 3.0);
            assert!((0.0..=100.0).contains(&focus));
            assert!((0.0..=100.0).contains(&stress));

            if let Some(prev) = last {
                assert!(state.focus.running_min <= prev.focus.running_min);
                assert!(state.focus.running_max >= prev.focus.running_max);
                assert!(state.stress.running_min <= prev.stress.running_min);
                assert!(state.stress.running_max >= prev.stress.running_max);
            }
            last = Some(state);
        }
    }

    #[test]
    fn test_reset() {
        let normalizer = AdaptiveNormalizer::default();
        let mut state = NormalizationState::default();
        normalizer.normalize_into(&mut state, MetricKind::Stress, 1.0);
        state.reset();
        assert!(!state.bounds(MetricKind::Stress).seeded);
    }
}
