//! Stream server lifecycle: source selection, client sessions, shutdown

use crate::config::{ServerConfig, SessionScope};
use crate::session::{run_session, ClientId, ClientSession, LiveSession};
use crate::source::{DataSource, SourceGuard};
use eeg_core::{EegResult, MetricMessage, StreamMode};
use eeg_processing::MetricPipeline;
use eeg_simulation::MetricSimulator;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{error, info, warn};

/// Server lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Init,
    SourceSelect,
    Simulating,
    Live,
    ShuttingDown,
    Closed,
}

impl ServerState {
    /// Whether new clients are served in this state
    pub fn accepts_clients(&self) -> bool {
        matches!(self, ServerState::Simulating | ServerState::Live)
    }

    /// Mode of the messages clients receive in this state
    pub fn stream_mode(&self) -> Option<StreamMode> {
        match self {
            ServerState::Live => Some(StreamMode::Real),
            ServerState::Simulating => Some(StreamMode::Simulation),
            _ => None,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ServerState::Init => "init",
            ServerState::SourceSelect => "source-select",
            ServerState::Simulating => "simulating",
            ServerState::Live => "live",
            ServerState::ShuttingDown => "shutting-down",
            ServerState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Resources held while a real source is connected
struct LiveResources {
    guard: SourceGuard,
}

/// Streaming server shared by every connection handler
pub struct StreamServer {
    config: ServerConfig,
    state_tx: watch::Sender<ServerState>,
    shutdown_tx: watch::Sender<bool>,
    /// Session state shared by every client under `SessionScope::Shared`
    pipeline: Arc<Mutex<MetricPipeline>>,
    live: Option<LiveResources>,
    next_client: AtomicU64,
    active_clients: AtomicUsize,
}

impl StreamServer {
    /// Validate the configuration and build the server in `Init`
    pub fn new(config: ServerConfig) -> EegResult<Self> {
        config.validate()?;
        let pipeline = MetricPipeline::new(config.processing.clone())?;
        let (state_tx, _) = watch::channel(ServerState::Init);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(StreamServer {
            config,
            state_tx,
            shutdown_tx,
            pipeline: Arc::new(Mutex::new(pipeline)),
            live: None,
            next_client: AtomicU64::new(0),
            active_clients: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Receiver observing every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.state_tx.subscribe()
    }

    /// Clients with a running session
    pub fn active_clients(&self) -> usize {
        self.active_clients.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ServerState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: ServerState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            info!(from = %previous, to = %state, "Server state changed");
        }
    }

    /// Try the given source and settle in `Live` or `Simulating`
    ///
    /// A source that fails to connect is dropped and the server simulates for
    /// the rest of its run. A connected source is given the pre-roll delay to
    /// buffer before the server goes live. An interrupt during the pre-roll
    /// leaves the server in `SourceSelect` with the source still guarded, for
    /// `shutdown` to release.
    pub async fn select_source(
        &mut self,
        source: Option<Box<dyn DataSource>>,
        interrupt: watch::Receiver<bool>,
    ) -> ServerState {
        self.set_state(ServerState::SourceSelect);

        let Some(mut source) = source else {
            info!("No acquisition configured; streaming simulated metrics");
            self.set_state(ServerState::Simulating);
            return ServerState::Simulating;
        };

        if let Err(e) = source.connect() {
            warn!(source = source.name(), error = %e, "Data source unavailable; falling back to simulation");
            self.set_state(ServerState::Simulating);
            return ServerState::Simulating;
        }

        info!(
            source = source.name(),
            pre_roll_ms = self.config.pre_roll_ms,
            "Data source connected; buffering before going live"
        );
        let guard = SourceGuard::new(Arc::new(Mutex::new(source)));
        self.live = Some(LiveResources { guard });

        tokio::select! {
            _ = tokio::time::sleep(self.config.pre_roll()) => {}
            _ = interrupted(interrupt) => {
                info!("Interrupted while buffering; not going live");
                return self.state();
            }
        }

        self.set_state(ServerState::Live);
        ServerState::Live
    }

    /// Serve one client until its transport closes or the server shuts down
    pub async fn run_client(&self, tx: mpsc::Sender<MetricMessage>) {
        let client: ClientId = self.next_client.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if !state.accepts_clients() {
            info!(client, state = %state, "Server not serving; refusing client");
            return;
        }

        let (session, tick) = match (state, &self.live) {
            (ServerState::Live, Some(live)) => {
                let pipeline = match self.client_pipeline() {
                    Ok(pipeline) => pipeline,
                    Err(e) => {
                        error!(client, error = %e, "Cannot build pipeline; dropping client");
                        return;
                    }
                };
                let session = LiveSession {
                    source: live.guard.source(),
                    pipeline,
                    required_samples: self.config.processing.required_samples(),
                };
                (ClientSession::Live(session), self.config.live_tick())
            }
            (ServerState::Simulating, _) => {
                let simulator = MetricSimulator::new(self.config.client_seed(client));
                (ClientSession::Simulated(simulator), self.config.simulation_tick())
            }
            _ => {
                error!(client, state = %state, "Live state without a connected source; refusing client");
                return;
            }
        };

        self.active_clients.fetch_add(1, Ordering::SeqCst);
        info!(client, mode = ?state.stream_mode(), active = self.active_clients(), "Client connected");
        run_session(client, session, tick, tx, self.shutdown_tx.subscribe()).await;
        self.active_clients.fetch_sub(1, Ordering::SeqCst);
        info!(client, active = self.active_clients(), "Client session ended");
    }

    fn client_pipeline(&self) -> EegResult<Arc<Mutex<MetricPipeline>>> {
        match self.config.session_scope {
            SessionScope::Shared => Ok(Arc::clone(&self.pipeline)),
            SessionScope::PerClient => {
                let pipeline = MetricPipeline::new(self.config.processing.clone())?;
                Ok(Arc::new(Mutex::new(pipeline)))
            }
        }
    }

    /// Stop accepting clients and signal every session to stop
    pub fn begin_shutdown(&self) {
        if matches!(self.state(), ServerState::ShuttingDown | ServerState::Closed) {
            return;
        }
        self.set_state(ServerState::ShuttingDown);
        self.shutdown_tx.send_replace(true);
    }

    /// Full shutdown: stop sessions, release the source, close
    ///
    /// Safe to call more than once; the source is released on the first call.
    pub async fn shutdown(&self) {
        self.begin_shutdown();
        if let Some(live) = &self.live {
            if !live.guard.is_released() {
                live.guard.release().await;
            }
        }
        self.set_state(ServerState::Closed);
    }
}

/// Resolves once `interrupt` is set
///
/// A sender dropped without setting it never resolves.
pub async fn interrupted(mut interrupt: watch::Receiver<bool>) {
    if interrupt.wait_for(|set| *set).await.is_err() {
        std::future::pending::<()>().await;
    }
}
