//! Data sources feeding the live pipeline

use crate::config::{ServerConfig, SourceKind};
use eeg_core::{EegError, EegResult, EegWindow};
use eeg_simulation::{EegSimulator, EegSimulatorConfig, LiveSampleBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Acquisition device interface
pub trait DataSource: Send {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Open the device; any error sends the server into simulation
    fn connect(&mut self) -> EegResult<()>;

    /// Release the device
    fn disconnect(&mut self) -> EegResult<()>;

    /// Most recent `samples` per channel, or fewer if not yet buffered
    fn acquire_window(&mut self, samples: usize) -> EegResult<EegWindow>;
}

/// Source handle shared by every client task
pub type SharedSource = Arc<Mutex<Box<dyn DataSource>>>;

/// Build the source named by the configuration
///
/// `None` means no acquisition is attempted and the server simulates.
pub fn open_source(config: &ServerConfig) -> Option<Box<dyn DataSource>> {
    match config.source {
        SourceKind::Synthetic => {
            let simulator_config = EegSimulatorConfig {
                sampling_rate: config.processing.sampling_rate,
                pattern: config.pattern,
                seed: config.seed,
                ..EegSimulatorConfig::with_channels(config.channel_count)
            };
            let capacity = config.processing.required_samples() * 2;
            Some(Box::new(SyntheticDevice::new(simulator_config, capacity)))
        }
        SourceKind::Unavailable => Some(Box::new(UnavailableDevice::new("headset"))),
        SourceKind::Simulation => None,
    }
}

/// Headset stand-in: synthetic EEG buffered against wall-clock time
pub struct SyntheticDevice {
    simulator_config: EegSimulatorConfig,
    capacity: usize,
    buffer: Option<LiveSampleBuffer>,
    started: Option<Instant>,
}

impl SyntheticDevice {
    pub fn new(simulator_config: EegSimulatorConfig, capacity: usize) -> Self {
        SyntheticDevice {
            simulator_config,
            capacity,
            buffer: None,
            started: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.buffer.is_some()
    }
}

impl DataSource for SyntheticDevice {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn connect(&mut self) -> EegResult<()> {
        let simulator = EegSimulator::new(self.simulator_config.clone())?;
        self.buffer = Some(LiveSampleBuffer::new(simulator, self.capacity));
        self.started = Some(Instant::now());
        info!(
            channels = self.simulator_config.electrodes.len(),
            sampling_rate = self.simulator_config.sampling_rate,
            pattern = self.simulator_config.pattern.description(),
            "Synthetic device streaming"
        );
        Ok(())
    }

    fn disconnect(&mut self) -> EegResult<()> {
        if !self.is_connected() {
            return Ok(());
        }
        self.buffer = None;
        self.started = None;
        Ok(())
    }

    fn acquire_window(&mut self, samples: usize) -> EegResult<EegWindow> {
        match (self.buffer.as_mut(), self.started) {
            (Some(buffer), Some(started)) => {
                buffer.advance_to(started.elapsed());
                buffer.latest(samples)
            }
            _ => Err(EegError::SourceUnavailable {
                source_name: "synthetic".to_string(),
                reason: "not connected".to_string(),
            }),
        }
    }
}

/// A device that is never reachable
pub struct UnavailableDevice {
    name: String,
}

impl UnavailableDevice {
    pub fn new(name: impl Into<String>) -> Self {
        UnavailableDevice { name: name.into() }
    }

    fn error(&self) -> EegError {
        EegError::SourceUnavailable {
            source_name: self.name.clone(),
            reason: "no acquisition device found".to_string(),
        }
    }
}

impl DataSource for UnavailableDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn connect(&mut self) -> EegResult<()> {
        Err(self.error())
    }

    fn disconnect(&mut self) -> EegResult<()> {
        Ok(())
    }

    fn acquire_window(&mut self, _samples: usize) -> EegResult<EegWindow> {
        Err(self.error())
    }
}

/// Releases a connected source exactly once
///
/// `release` may be called from any number of shutdown paths; only the first
/// call disconnects. Dropping an unreleased guard disconnects if the source
/// is not locked at that moment.
pub struct SourceGuard {
    source: SharedSource,
    released: AtomicBool,
}

impl SourceGuard {
    pub fn new(source: SharedSource) -> Self {
        SourceGuard {
            source,
            released: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> SharedSource {
        Arc::clone(&self.source)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Disconnect the source; returns whether this call did the release
    pub async fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }

        let mut source = self.source.lock().await;
        let name = source.name().to_string();
        log_release(&name, source.disconnect());
        true
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.source.try_lock() {
            Ok(mut source) => {
                let name = source.name().to_string();
                log_release(&name, source.disconnect());
            }
            Err(_) => warn!("Source busy during drop; release skipped"),
        }
    }
}

fn log_release(name: &str, result: EegResult<()>) {
    match result {
        Ok(()) => info!(source = name, "Data source released"),
        Err(e) => {
            let error = EegError::Cleanup {
                reason: e.to_string(),
            };
            warn!(source = name, error = %error, "Ignoring failure while releasing data source");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use eeg_core::{EegMetadata, Electrode};
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Source replaying prepared windows, for server tests
    pub(crate) struct ScriptedSource {
        pub windows: VecDeque<EegWindow>,
        pub fallback: Option<EegWindow>,
        pub connect_error: bool,
        pub disconnect_error: bool,
        pub disconnects: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        pub(crate) fn new(windows: Vec<EegWindow>, fallback: Option<EegWindow>) -> Self {
            ScriptedSource {
                windows: windows.into(),
                fallback,
                connect_error: false,
                disconnect_error: false,
                disconnects: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DataSource for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        fn connect(&mut self) -> EegResult<()> {
            if self.connect_error {
                Err(EegError::SourceUnavailable {
                    source_name: "scripted".into(),
                    reason: "handshake refused".into(),
                })
            } else {
                Ok(())
            }
        }

        fn disconnect(&mut self) -> EegResult<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.disconnect_error {
                Err(EegError::Cleanup {
                    reason: "board already released".into(),
                })
            } else {
                Ok(())
            }
        }

        fn acquire_window(&mut self, _samples: usize) -> EegResult<EegWindow> {
            self.windows
                .pop_front()
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| EegError::SourceUnavailable {
                    source_name: "scripted".into(),
                    reason: "script exhausted".into(),
                })
        }
    }

    pub(crate) fn flat_window(samples: usize) -> EegWindow {
        let metadata = EegMetadata::new(250.0, Electrode::frontal_pair(), "test").unwrap();
        EegWindow::new(vec![vec![0.0; samples]; 2], metadata).unwrap()
    }

    #[test]
    fn test_unavailable_device_refuses() {
        let mut device = UnavailableDevice::new("headset");
        assert!(matches!(device.connect(), Err(EegError::SourceUnavailable { .. })));
        assert!(device.acquire_window(250).is_err());
    }

    #[test]
    fn test_open_source_by_kind() {
        let mut config = ServerConfig::default();
        config.source = SourceKind::Simulation;
        assert!(open_source(&config).is_none());

        config.source = SourceKind::Unavailable;
        let mut source = open_source(&config).unwrap();
        assert!(source.connect().is_err());

        config.source = SourceKind::Synthetic;
        let source = open_source(&config).unwrap();
        assert_eq!(source.name(), "synthetic");
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthetic_device_buffers_over_time() {
        let mut device = SyntheticDevice::new(
            EegSimulatorConfig {
                seed: Some(5),
                ..EegSimulatorConfig::default()
            },
            2500,
        );
        assert!(device.acquire_window(1250).is_err());

        device.connect().unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;
        let early = device.acquire_window(1250).unwrap();
        assert_eq!(early.samples_per_channel(), 500);

        tokio::time::advance(Duration::from_secs(4)).await;
        let full = device.acquire_window(1250).unwrap();
        assert_eq!(full.samples_per_channel(), 1250);

        device.disconnect().unwrap();
        assert!(!device.is_connected());
    }

    #[tokio::test]
    async fn test_guard_releases_once() {
        let mut scripted = ScriptedSource::new(Vec::new(), None);
        scripted.disconnect_error = true;
        let disconnects = Arc::clone(&scripted.disconnects);

        let boxed: Box<dyn DataSource> = Box::new(scripted);
        let guard = SourceGuard::new(Arc::new(Mutex::new(boxed)));

        assert!(guard.release().await);
        assert!(!guard.release().await);
        drop(guard);

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_guard_drop_releases() {
        let scripted = ScriptedSource::new(Vec::new(), None);
        let disconnects = Arc::clone(&scripted.disconnects);

        let boxed: Box<dyn DataSource> = Box::new(scripted);
        let guard = SourceGuard::new(Arc::new(Mutex::new(boxed)));
        drop(guard);

        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }
}
