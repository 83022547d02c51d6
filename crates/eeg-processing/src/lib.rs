//! EEG-Processing: window-to-metric pipeline
//!
//! Noise filtering, Welch band powers, focus/stress ratios, adaptive
//! normalisation and the pipeline that ties them together.

pub mod processor;
pub mod filters;
pub mod spectral;
pub mod bandpower;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod config;

pub use processor::{SignalProcessor, ProcessingMetrics, ProcessingTimer};
pub use filters::{
    FilterType, FilterConfig, BiquadSection, ButterworthFilter, NotchFilter, FilterBank
};
pub use spectral::{PowerSpectrum, WelchEstimator};
pub use bandpower::{BandPowers, BandpowerEstimator, EegBands, FrequencyBand};
pub use metrics::{MetricComputer, RawMetrics};
pub use normalizer::{AdaptiveNormalizer, MetricBounds, MetricKind, NormalizationState};
pub use pipeline::{MetricPipeline, PipelineStats};
pub use config::{AlertPolicy, FilterSettings, ProcessingConfig, ProcessingProfile};
