//! Server configuration: JSON file plus command-line overrides

use clap::ValueEnum;
use eeg_core::{config_error, EegMetadata, EegResult};
use eeg_processing::ProcessingConfig;
use eeg_simulation::MentalStatePattern;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which data source the server tries to open at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Wall-clock synthetic headset feeding the real pipeline
    Synthetic,
    /// Skip acquisition and stream simulated metrics
    Simulation,
    /// A headset that cannot be reached; exercises the fallback
    Unavailable,
}

/// How normalization state is shared between connected clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SessionScope {
    /// One state per server run, shared by every client
    Shared,
    /// Each client normalizes against its own state
    PerClient,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub source: SourceKind,
    /// Cadence of live ticks (ms)
    pub live_tick_ms: u64,
    /// Cadence of simulated ticks (ms)
    pub simulation_tick_ms: u64,
    /// Buffering delay after connecting the source (ms)
    pub pre_roll_ms: u64,
    /// Base seed for simulators; `None` draws from entropy
    pub seed: Option<u64>,
    pub session_scope: SessionScope,
    /// Channels of the synthetic device
    pub channel_count: usize,
    /// Mental state driving the synthetic device
    pub pattern: MentalStatePattern,
    pub processing: ProcessingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8765,
            source: SourceKind::Synthetic,
            live_tick_ms: 1000,
            simulation_tick_ms: 1000,
            pre_roll_ms: 2000,
            seed: None,
            session_scope: SessionScope::Shared,
            channel_count: 2,
            pattern: MentalStatePattern::default(),
            processing: ProcessingConfig::standard(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> EegResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| config_error!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EegResult<()> {
        if self.live_tick_ms == 0 || self.simulation_tick_ms == 0 {
            return Err(config_error!("tick intervals must be positive"));
        }
        EegMetadata::validate_channel_count(self.channel_count)?;
        self.processing.validate()
    }

    pub fn live_tick(&self) -> Duration {
        Duration::from_millis(self.live_tick_ms)
    }

    pub fn simulation_tick(&self) -> Duration {
        Duration::from_millis(self.simulation_tick_ms)
    }

    pub fn pre_roll(&self) -> Duration {
        Duration::from_millis(self.pre_roll_ms)
    }

    /// Address to bind, `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Seed for the n-th client's simulator
    pub fn client_seed(&self, client: u64) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "127.0.0.1:8765");
        assert_eq!(config.session_scope, SessionScope::Shared);
        assert_eq!(config.pre_roll(), Duration::from_secs(2));
    }

    #[test]
    fn test_partial_json() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"port": 9000, "source": "unavailable", "session_scope": "per-client"}"#)
                .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.source, SourceKind::Unavailable);
        assert_eq!(config.session_scope, SessionScope::PerClient);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_validation() {
        let mut config = ServerConfig::default();
        config.live_tick_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.channel_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_seeds() {
        let mut config = ServerConfig::default();
        assert_eq!(config.client_seed(3), None);
        config.seed = Some(10);
        assert_eq!(config.client_seed(0), Some(10));
        assert_eq!(config.client_seed(3), Some(13));
    }
}
