//! EEG focus/stress metric streaming server

mod config;
mod server;
mod session;
mod source;
mod transport;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use config::{ServerConfig, SessionScope, SourceKind};
use eeg_processing::{AlertPolicy, ProcessingConfig, ProcessingProfile};
use eeg_simulation::MentalStatePattern;
use server::{interrupted, StreamServer};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Profile {
    /// 5 s windows, ×200 focus gain
    Standard,
    /// 1 s windows, ×50 focus gain, beta-power alert (focus stays beta/alpha)
    Responsive,
}

impl From<Profile> for ProcessingProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Standard => ProcessingProfile::Standard,
            Profile::Responsive => ProcessingProfile::Responsive,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "eeg-stream", about = "Streams EEG focus and stress metrics over WebSocket")]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// WebSocket port
    #[arg(long)]
    port: Option<u16>,

    /// Data source to open at startup
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Seed for simulated data
    #[arg(long)]
    seed: Option<u64>,

    /// Normalization state sharing between clients
    #[arg(long, value_enum)]
    session_scope: Option<SessionScope>,

    /// Processing preset; replaces the processing section of the config file
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Alert when the raw stress ratio exceeds this value
    #[arg(long, value_name = "RATIO")]
    alert_threshold: Option<f64>,

    /// Mental state driving the synthetic device (relaxed, focused, stressed, drifting, disconnected)
    #[arg(long)]
    pattern: Option<String>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(source) = self.source {
            config.source = source;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(scope) = self.session_scope {
            config.session_scope = scope;
        }
        if let Some(profile) = self.profile {
            config.processing = ProcessingConfig::for_profile(profile.into());
        }
        if let Some(threshold) = self.alert_threshold {
            config.processing.alert = AlertPolicy::StressRatioAbove(threshold);
        }
        if let Some(name) = &self.pattern {
            config.pattern = MentalStatePattern::from_name(name)
                .with_context(|| format!("unknown pattern '{}'", name))?;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Watch that turns true on the first ctrl-c
///
/// Installed before any startup work so an early interrupt still takes the
/// normal shutdown path.
fn listen_for_interrupt() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received; shutting down");
                tx.send_replace(true);
            }
            Err(e) => warn!(error = %e, "Cannot listen for interrupt"),
        }
    });
    rx
}

/// Release the source and close, logging instead of failing
async fn close(server: &StreamServer) {
    server.shutdown().await;
    info!("Shutdown complete");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.as_str().into()),
        )
        .init();

    let config = args.server_config()?;
    info!(
        source = ?config.source,
        scope = ?config.session_scope,
        window_secs = config.processing.window_secs,
        "Starting EEG metric stream"
    );

    let interrupt = listen_for_interrupt();

    let mut server = StreamServer::new(config).context("building server")?;
    let source = source::open_source(server.config());
    server.select_source(source, interrupt.clone()).await;
    let server = Arc::new(server);

    if *interrupt.borrow() {
        close(&server).await;
        return Ok(());
    }

    let addr = server.config().bind_addr();
    let bound = tokio::select! {
        bound = tokio::net::TcpListener::bind(&addr) => bound,
        _ = interrupted(interrupt.clone()) => {
            close(&server).await;
            return Ok(());
        }
    };
    let listener = match bound {
        Ok(listener) => listener,
        Err(e) => {
            close(&server).await;
            return Err(e).with_context(|| format!("binding {}", addr));
        }
    };
    info!(addr = %addr, state = %server.state(), "Listening for WebSocket clients");

    tokio::spawn({
        let server = Arc::clone(&server);
        async move {
            interrupted(interrupt).await;
            server.begin_shutdown();
        }
    });

    let mut state_rx = server.subscribe_state();
    let app = transport::router(Arc::clone(&server));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if state_rx.wait_for(|state| !state.accepts_clients()).await.is_err() {
                debug!("State channel closed; stopping listener");
            }
        })
        .await;

    if let Err(e) = served {
        warn!(error = %e, "Server stopped with an error");
    }

    close(&server).await;
    Ok(())
}
