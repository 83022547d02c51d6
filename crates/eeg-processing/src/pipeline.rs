//! Window-to-message pipeline owning the session normalization state

use crate::bandpower::BandpowerEstimator;
use crate::config::ProcessingConfig;
use crate::metrics::MetricComputer;
use crate::normalizer::{AdaptiveNormalizer, MetricKind, NormalizationState};
use crate::processor::ProcessingMetrics;
use eeg_core::{EegError, EegResult, EegWindow, MetricMessage, StreamMode};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, info};

/// Counters for one pipeline instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Windows that produced a message
    pub processed: u64,
    /// Artifact windows skipped
    pub rejected: u64,
    /// Processing time of the most recent window
    pub last_latency_us: u64,
}

/// estimator → computer → normalizer(focus) → normalizer(stress)
pub struct MetricPipeline {
    config: ProcessingConfig,
    estimator: BandpowerEstimator,
    computer: MetricComputer,
    normalizer: AdaptiveNormalizer,
    state: NormalizationState,
    stats: PipelineStats,
}

impl MetricPipeline {
    /// Build a pipeline with fresh normalization state
    pub fn new(config: ProcessingConfig) -> EegResult<Self> {
        let estimator = BandpowerEstimator::new(&config)?;

        Ok(MetricPipeline {
            computer: MetricComputer::new(config.alpha_epsilon),
            normalizer: AdaptiveNormalizer::from_config(&config),
            estimator,
            config,
            state: NormalizationState::default(),
            stats: PipelineStats::default(),
        })
    }

    /// Process one window
    ///
    /// Returns `Ok(None)` for artifact windows, which leave the normalization
    /// state untouched. Windows longer than the analysis length are cut to
    /// their most recent samples.
    pub fn process(&mut self, window: &EegWindow) -> EegResult<Option<MetricMessage>> {
        let window = window.tail(self.config.required_samples())?;

        let mut timer = ProcessingMetrics::start_timing();
        timer.set_samples(window.samples_per_channel());

        let bands = self.estimator.estimate(&window)?;
        let raw = self.computer.compute(&bands);

        if !raw.valid {
            let metrics = timer.finish_with_error("artifact window");
            self.stats.rejected += 1;
            self.stats.last_latency_us = metrics.processing_time_us;
            let rms = window.channel_stats(0).map(|stats| stats.rms).unwrap_or(0.0);
            info!(
                window = %window.id,
                alpha = bands.alpha,
                beta = bands.beta,
                rms,
                "Artifact window rejected"
            );
            return Ok(None);
        }

        let focus = self
            .normalizer
            .normalize_into(&mut self.state, MetricKind::Focus, raw.focus_ratio);
        let stress = self
            .normalizer
            .normalize_into(&mut self.state, MetricKind::Stress, raw.stress_ratio);
        let alert = self.config.alert.fires(&raw);

        let metrics = timer.finish();
        self.stats.processed += 1;
        self.stats.last_latency_us = metrics.processing_time_us;
        debug!(
            latency_us = metrics.processing_time_us,
            samples = metrics.samples,
            focus_ratio = raw.focus_ratio,
            stress_ratio = raw.stress_ratio,
            "Window processed"
        );

        Ok(Some(MetricMessage::new(focus, stress, alert, StreamMode::Real)))
    }

    /// `process`, with panics converted into `EegError::Processing`
    pub fn process_guarded(&mut self, window: &EegWindow) -> EegResult<Option<MetricMessage>> {
        catch_processing_panic(|| self.process(window))
    }

    /// Start a new session
    pub fn reset(&mut self) {
        self.state.reset();
        self.stats = PipelineStats::default();
    }

    pub fn state(&self) -> &NormalizationState {
        &self.state
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Samples per channel a window must hold
    pub fn required_samples(&self) -> usize {
        self.config.required_samples()
    }
}

/// Run one tick of work, turning a panic into an error
pub fn catch_processing_panic<T, F>(work: F) -> EegResult<T>
where
    F: FnOnce() -> EegResult<T>,
{
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(EegError::Processing {
                message: format!("panicked: {}", message),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlertPolicy;
    use eeg_core::{EegMetadata, Electrode};
    use std::f64::consts::PI;

    fn window_of(freqs: &[(f64, f64)], seconds: f64) -> EegWindow {
        let samples = (250.0 * seconds) as usize;
        let signal: Vec<f64> = (0..samples)
            .map(|i| {
                let t = i as f64 / 250.0;
                freqs.iter().map(|(f, a)| a * (2.0 * PI * f * t).sin()).sum()
            })
            .collect();
        let metadata = EegMetadata::new(250.0, Electrode::frontal_pair(), "test").unwrap();
        EegWindow::new(vec![signal.clone(), signal], metadata).unwrap()
    }

    #[test]
    fn test_first_window_seeds_state() {
        let mut pipeline = MetricPipeline::new(ProcessingConfig::standard()).unwrap();
        let message = pipeline
            .process(&window_of(&[(10.0, 10.0), (22.0, 3.0)], 5.0))
            .unwrap()
            .unwrap();

        assert_eq!(message.mode, StreamMode::Real);
        assert_eq!(message.focus, 0.0);
        assert_eq!(message.stress, 0.0);
        assert!(pipeline.state().focus.seeded);
        assert!(pipeline.state().stress.seeded);
        assert_eq!(pipeline.stats().processed, 1);
    }

    #[test]
    fn test_flat_window_rejected_without_state_change() {
        let mut pipeline = MetricPipeline::new(ProcessingConfig::standard()).unwrap();
        let result = pipeline.process(&window_of(&[], 5.0)).unwrap();

        assert!(result.is_none());
        assert_eq!(*pipeline.state(), NormalizationState::default());
        assert_eq!(pipeline.stats().rejected, 1);
        assert_eq!(pipeline.stats().processed, 0);
    }

    #[test]
    fn test_short_window_is_insufficient() {
        let mut pipeline = MetricPipeline::new(ProcessingConfig::standard()).unwrap();
        let result = pipeline.process(&window_of(&[(10.0, 10.0)], 2.0));

        assert!(matches!(
            result,
            Err(EegError::InsufficientData { required: 1250, available: 500 })
        ));
        assert!(!pipeline.state().focus.seeded);
    }

    #[test]
    fn test_long_window_uses_latest_samples() {
        let mut pipeline = MetricPipeline::new(ProcessingConfig::responsive()).unwrap();
        assert_eq!(pipeline.required_samples(), 250);
        assert!(pipeline.process(&window_of(&[(10.0, 10.0)], 3.0)).unwrap().is_some());
    }

    #[test]
    fn test_stress_spike_reaches_full_scale() {
        let mut pipeline = MetricPipeline::new(ProcessingConfig::standard()).unwrap();
        pipeline
            .process(&window_of(&[(10.0, 10.0), (22.0, 2.0)], 5.0))
            .unwrap();
        let spike = pipeline
            .process(&window_of(&[(10.0, 2.0), (22.0, 10.0)], 5.0))
            .unwrap()
            .unwrap();

        assert_eq!(spike.stress, 100.0);
        assert!(pipeline.state().stress.running_max > pipeline.state().stress.running_min);
    }

    #[test]
    fn test_alert_policy_applied() {
        let mut config = ProcessingConfig::standard();
        config.alert = AlertPolicy::Always;
        let mut pipeline = MetricPipeline::new(config).unwrap();
        let message = pipeline.process(&window_of(&[(10.0, 10.0)], 5.0)).unwrap().unwrap();
        assert_eq!(message.alert, 1);

        let mut config = ProcessingConfig::standard();
        config.alert = AlertPolicy::Never;
        let mut pipeline = MetricPipeline::new(config).unwrap();
        let message = pipeline.process(&window_of(&[(10.0, 10.0)], 5.0)).unwrap().unwrap();
        assert_eq!(message.alert, 0);
    }

    #[test]
    fn test_reset_clears_session() {
        let mut pipeline = MetricPipeline::new(ProcessingConfig::standard()).unwrap();
        pipeline.process(&window_of(&[(10.0, 10.0)], 5.0)).unwrap();
        pipeline.reset();

        assert!(!pipeline.state().focus.seeded);
        assert_eq!(*pipeline.stats(), PipelineStats::default());
    }

    #[test]
    fn test_panics_become_processing_errors() {
        let result: EegResult<()> = catch_processing_panic(|| panic!("bad window"));
        match result {
            Err(EegError::Processing { message }) => assert!(message.contains("bad window")),
            other => panic!("unexpected result: {:?}", other),
        }

        let ok = catch_processing_panic(|| Ok(3));
        assert_eq!(ok, Ok(3));
    }
}
