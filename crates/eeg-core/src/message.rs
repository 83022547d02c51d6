//! Wire message pushed to stream clients

use serde::{Deserialize, Serialize};
use crate::error::EegResult;

/// Where a message's values came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Computed from a real (or device-like) EEG source
    Real,
    /// Generated directly by the metric simulator
    Simulation,
}

impl std::fmt::Display for StreamMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamMode::Real => write!(f, "real"),
            StreamMode::Simulation => write!(f, "simulation"),
        }
    }
}

/// One emitted tick: `{focus, stress, alert, mode}` and nothing else
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricMessage {
    /// Focus percentage in [0, 100]
    pub focus: f64,
    /// Stress percentage in [0, 100]
    pub stress: f64,
    /// 1 when the alert policy fired, else 0
    pub alert: u8,
    pub mode: StreamMode,
}

impl MetricMessage {
    /// Build a message, clamping both percentages into [0, 100]
    pub fn new(focus: f64, stress: f64, alert: bool, mode: StreamMode) -> Self {
        MetricMessage {
            focus: clamp_percent(focus),
            stress: clamp_percent(stress),
            alert: u8::from(alert),
            mode,
        }
    }

    /// Encode as the JSON text frame sent on the wire
    pub fn to_json(&self) -> EegResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
